//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/cmswire/cmswire.toml`
//! 3. Local config: `<dir>/cmswire.toml`
//! 4. Environment variables: `CMSWIRE__<SECTION>__<KEY>`

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::TableNames;
use crate::infrastructure::memory::MEMORY_DRIVER;

pub const CONFIG_FILE_NAME: &str = "cmswire.toml";

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Driver name (`memory` is built in)
    pub driver: Option<String>,
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// JSON seed document for the memory driver
    pub seed: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Keys that must be present before a connection is attempted.
    pub fn required_keys(&self) -> Vec<&'static str> {
        let mut keys = vec!["database.driver", "database.name"];
        if self.driver.as_deref() != Some(MEMORY_DRIVER) {
            keys.extend(["database.host", "database.username"]);
        }
        keys
    }
}

/// File storage locations and public URLs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilesystemConfig {
    pub root: PathBuf,
    pub root_url: String,
    pub thumb_root: PathBuf,
    pub root_thumb_url: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage/uploads"),
            root_url: "/storage/uploads".into(),
            thumb_root: PathBuf::from("storage/uploads/thumbs"),
            root_thumb_url: "/storage/uploads/thumbs".into(),
        }
    }
}

/// Mail transport selection. Absent section means no mailer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MailConfig {
    /// `smtp`, `sendmail` or `mail` (default)
    pub transport: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub sendmail_path: Option<PathBuf>,
    pub from: Option<String>,
}

/// Where extensions and UI bundles are discovered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub dir: PathBuf,
    pub uis_dir: PathBuf,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("customs/extensions"),
            uis_dir: PathBuf::from("customs/uis"),
        }
    }
}

/// Unified configuration for cmswire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub filesystem: FilesystemConfig,
    pub mail: Option<MailConfig>,
    pub extensions: ExtensionsConfig,
    pub tables: TableNames,
}

/// Get the XDG config directory for cmswire.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cmswire").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(raw.as_ref()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `dir` - Optional project directory holding a local `cmswire.toml`
    pub fn load(dir: Option<&Path>) -> ApplicationResult<Self> {
        // Missing keys fall back to the serde defaults on deserialize.
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                builder = builder.add_source(File::from(local_path).required(true));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("CMSWIRE")
                .prefix_separator("__")
                .separator("__"),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.expand_paths();
        Ok(settings)
    }

    /// Parse settings from a TOML document on top of the defaults.
    pub fn from_toml(content: &str) -> ApplicationResult<Self> {
        let config = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.expand_paths();
        Ok(settings)
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.filesystem.root = expand_path(&self.filesystem.root);
        self.filesystem.thumb_root = expand_path(&self.filesystem.thumb_root);
        self.extensions.dir = expand_path(&self.extensions.dir);
        self.extensions.uis_dir = expand_path(&self.extensions.uis_dir);
        self.database.seed = self.database.seed.as_deref().map(expand_path);
        if let Some(mail) = self.mail.as_mut() {
            mail.sendmail_path = mail.sendmail_path.as_deref().map(expand_path);
        }
    }

    /// Fail with every absent key (dotted path) from `keys`.
    ///
    /// Empty strings count as absent.
    pub fn require(&self, keys: &[&str]) -> ApplicationResult<()> {
        let doc = serde_json::to_value(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })?;
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !is_present(lookup(&doc, key)))
            .map(|key| key.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApplicationError::MissingConfiguration { keys: missing })
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# cmswire configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/cmswire/cmswire.toml
#   Local:  <project>/cmswire.toml
#   Env:    CMSWIRE__<SECTION>__<KEY>, e.g. CMSWIRE__DATABASE__NAME=cms

[database]
driver = "memory"
name = "cms"
# host = "localhost"
# port = 3306
# username = "cms"
# password = "secret"
# seed = "~/cms/seed.json"   # memory driver only

[filesystem]
# root = "storage/uploads"
# root_url = "/storage/uploads"
# thumb_root = "storage/uploads/thumbs"
# root_thumb_url = "/storage/uploads/thumbs"

# Omit the [mail] section to run without a mailer.
# [mail]
# transport = "smtp"         # smtp | sendmail | mail
# host = "smtp.example.com"
# port = 587
# username = "mailer"
# password = "secret"
# sendmail_path = "/usr/sbin/sendmail"
# from = "cms@example.com"

[extensions]
# dir = "customs/extensions"
# uis_dir = "customs/uis"

[tables]
# files = "directus_files"
# users = "directus_users"
# groups = "directus_groups"
# privileges = "directus_privileges"
# messages = "directus_messages"
# tables = "directus_tables"
"#
        .to_string()
    }
}

fn lookup<'a>(doc: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(doc, |node, segment| node.get(segment))
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_uses_directus_tables_and_no_mailer() {
        let settings = Settings::default();
        assert_eq!(settings.tables.users, "directus_users");
        assert!(settings.mail.is_none());
        assert!(settings.database.driver.is_none());
    }

    #[test]
    fn given_empty_settings_when_require_then_lists_all_missing_keys() {
        let settings = Settings::default();
        let err = settings
            .require(&["database.driver", "database.name", "filesystem.root_url"])
            .unwrap_err();
        match err {
            ApplicationError::MissingConfiguration { keys } => {
                assert_eq!(keys, vec!["database.driver", "database.name"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_blank_value_when_require_then_counts_as_missing() {
        let mut settings = Settings::default();
        settings.database.driver = Some("memory".into());
        settings.database.name = Some("  ".into());
        assert!(settings.require(&["database.driver"]).is_ok());
        assert!(settings.require(&["database.name"]).is_err());
    }

    #[test]
    fn given_memory_driver_when_required_keys_then_skips_host() {
        let mut db = DatabaseConfig {
            driver: Some("memory".into()),
            ..Default::default()
        };
        assert_eq!(db.required_keys(), vec!["database.driver", "database.name"]);
        db.driver = Some("mysql".into());
        assert!(db.required_keys().contains(&"database.host"));
    }

    #[test]
    fn given_toml_when_parsing_then_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
[database]
driver = "memory"
name = "cms"

[mail]
transport = "sendmail"

[tables]
users = "accounts"
"#,
        )
        .expect("parse settings");

        assert_eq!(settings.database.name.as_deref(), Some("cms"));
        assert_eq!(settings.tables.users, "accounts");
        assert_eq!(settings.tables.files, "directus_files");
        assert_eq!(
            settings.mail.and_then(|m| m.transport).as_deref(),
            Some("sendmail")
        );
        assert_eq!(settings.filesystem.root_url, "/storage/uploads");
    }

    #[test]
    fn given_tilde_in_path_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings::default();
        settings.extensions.dir = PathBuf::from("~/cms/extensions");

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.extensions.dir.to_string_lossy().starts_with(&home));
    }

    #[test]
    fn given_settings_when_to_toml_then_serializes_sections() {
        let toml = Settings::default().to_toml().unwrap();
        assert!(toml.contains("[filesystem]"));
        assert!(toml.contains("[tables]"));
    }

    #[test]
    fn test_template_parses() {
        let settings = Settings::from_toml(&Settings::template()).expect("template parses");
        assert_eq!(settings.database.driver.as_deref(), Some("memory"));
    }
}
