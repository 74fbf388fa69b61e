//! Command dispatch for the `cmswire` binary

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{AclSnapshot, ServiceName};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| InfraError::io("current directory", e))?,
    };
    match &cli.command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => config_show(&project_dir),
            ConfigCommands::Template => {
                output::info(&Settings::template());
                Ok(())
            }
            ConfigCommands::Path => config_path(&project_dir),
        },
        Some(Commands::Services) => services(&container(&project_dir)?),
        Some(Commands::Hooks) => hooks(&container(&project_dir)?),
        Some(Commands::Extensions) => extensions(&container(&project_dir)?),
        Some(Commands::Acl { user }) => acl(&container(&project_dir)?, *user),
        Some(Commands::Completion { shell }) => {
            completion(*shell);
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `cmswire --help`".into(),
        )),
    }
}

fn container(project_dir: &Path) -> CliResult<ServiceContainer> {
    let settings = Settings::load(Some(project_dir))?;
    Ok(ServiceContainer::new(settings))
}

#[instrument]
fn config_show(project_dir: &Path) -> CliResult<()> {
    let settings = Settings::load(Some(project_dir))?;
    output::info(&settings.to_toml()?);
    Ok(())
}

#[instrument]
fn config_path(project_dir: &Path) -> CliResult<()> {
    let show = |label: &str, path: Option<PathBuf>| match path {
        Some(path) if path.exists() => output::available(&format!("{label}: {}", path.display())),
        Some(path) => output::unavailable(&format!("{label}: {} (not found)", path.display())),
        None => output::unavailable(&format!("{label}: no config directory")),
    };
    output::header("Config files (lowest precedence first)");
    show("global", global_config_path());
    show("local", Some(local_config_path(project_dir)));
    Ok(())
}

#[instrument(skip(container))]
fn services(container: &ServiceContainer) -> CliResult<()> {
    output::header("Services");
    for name in container.registry().names() {
        // acl and auth follow the session and are never cached
        let fresh = matches!(name, ServiceName::Acl | ServiceName::Auth);
        match container.registry().resolve(name, None, fresh) {
            Ok(_) => output::available(&name),
            Err(e) => output::unavailable(&format!("{name}: {e}")),
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn hooks(container: &ServiceContainer) -> CliResult<()> {
    let hooks = container.hooks()?;
    for event in hooks.events() {
        output::header(&event);
        for listener in hooks.listeners(&event) {
            output::detail(&format!("{} ({})", listener.kind, listener.priority));
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn extensions(container: &ServiceContainer) -> CliResult<()> {
    for (title, found) in [
        ("Extensions", container.extensions()?),
        ("UIs", container.uis()?),
    ] {
        output::header(title);
        if found.is_empty() {
            output::detail("(none)");
        }
        for (name, entry) in found.iter() {
            output::field(name, &entry.display());
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn acl(container: &ServiceContainer, user: Option<i64>) -> CliResult<()> {
    let snapshot = match user {
        Some(id) if id <= 0 => {
            return Err(CliError::InvalidArgs(format!("user id must be positive: {id}")))
        }
        Some(id) => container.acl_for(id)?,
        None => container.acl()?,
    };
    debug!("acl snapshot built for {:?}", snapshot.user_id());
    print_acl(&snapshot);
    Ok(())
}

fn print_acl(snapshot: &AclSnapshot) {
    let or_none = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
    output::header("Access control");
    output::field("user", &or_none(snapshot.user_id()));
    output::field("group", &or_none(snapshot.group_id()));

    match snapshot.group_privileges() {
        None => output::warning("no privileges loaded, every check is denied"),
        Some(privileges) => {
            for (table, set) in privileges {
                let flags = [
                    ("view", set.view),
                    ("add", set.add),
                    ("edit", set.edit),
                    ("delete", set.delete),
                    ("alter", set.alter),
                ]
                .iter()
                .filter(|(_, allowed)| *allowed)
                .map(|(name, _)| *name)
                .join(",");
                output::field(table, &flags);
                if !set.read_field_blacklist.is_empty() {
                    output::detail(&format!("  read blacklist: {}", set.read_field_blacklist.join(",")));
                }
                if !set.write_field_blacklist.is_empty() {
                    output::detail(&format!("  write blacklist: {}", set.write_field_blacklist.join(",")));
                }
            }
        }
    }
    for (table, column) in snapshot.owner_columns() {
        output::field(&format!("owner of {table}"), column);
    }
}

fn completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
