//! File table handlers: upload stamping and URL/thumbnail enrichment

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::application::{ApplicationResult, HookEmitter};
use crate::config::FilesystemConfig;
use crate::domain::events::{generic, Phase, Verb};
use crate::domain::{value_as_id, Payload, Priority, Row, TableNames};
use crate::infrastructure::embed::EmbedManager;
use crate::infrastructure::traits::FileSystem;

/// Source formats whose thumbnails are rendered as jpg.
const JPG_THUMBNAIL_SOURCES: [&str; 4] = ["tif", "tiff", "psd", "pdf"];

pub struct FileFilters {
    fs: Arc<dyn FileSystem>,
    storage: FilesystemConfig,
    embed: Arc<EmbedManager>,
    tables: TableNames,
}

impl FileFilters {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        storage: FilesystemConfig,
        embed: Arc<EmbedManager>,
        tables: TableNames,
    ) -> Self {
        Self {
            fs,
            storage,
            embed,
            tables,
        }
    }

    pub fn register(self: &Arc<Self>, hooks: &HookEmitter) {
        let this = Arc::clone(self);
        hooks.add_filter(
            &generic(Verb::Insert, Phase::Before),
            Priority::Default,
            move |payload| this.before_insert(payload),
        );
        let this = Arc::clone(self);
        hooks.add_filter(
            &generic(Verb::Select, Phase::Done),
            Priority::Default,
            move |payload| this.after_select(payload),
        );
    }

    /// Drop raw upload bytes and stamp uploader and upload time.
    pub fn before_insert(&self, mut payload: Payload) -> ApplicationResult<Payload> {
        if !payload.is_table(&self.tables.files) {
            return Ok(payload);
        }
        let actor = payload.actor();
        if let Some(row) = payload.row_mut() {
            row.remove("data");
            if let Some(actor) = actor {
                row.insert("user".into(), Value::from(actor));
            }
            if !row.contains_key("date_uploaded") {
                let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
                row.insert("date_uploaded".into(), Value::from(now));
            }
        }
        Ok(payload)
    }

    pub fn after_select(&self, mut payload: Payload) -> ApplicationResult<Payload> {
        if !payload.is_table(&self.tables.files) {
            return Ok(payload);
        }
        if let Some(rows) = payload.rows_mut() {
            for row in rows.iter_mut().filter_map(Value::as_object_mut) {
                self.enrich(row);
            }
        }
        Ok(payload)
    }

    fn enrich(&self, row: &mut Row) {
        let Some(name) = row.get("name").and_then(Value::as_str).map(String::from) else {
            return;
        };
        row.insert(
            "url".into(),
            Value::from(join_url(&self.storage.root_url, &name)),
        );

        if let Some(thumbnail) = self.thumbnail_name(row, &name) {
            row.insert(
                "thumbnail_url".into(),
                Value::from(join_url(&self.storage.root_thumb_url, &thumbnail)),
            );
        }

        let code = row
            .get("type")
            .and_then(Value::as_str)
            .and_then(|t| self.embed.get_by_type(t))
            .and_then(|provider| provider.code(row));
        if let Some(code) = code {
            row.insert("html".into(), Value::from(code));
        }
    }

    /// Current thumbnails are named `<id>.<ext>`, legacy ones `<stem>.<ext>`.
    fn thumbnail_name(&self, row: &Row, name: &str) -> Option<String> {
        let ext = thumbnail_extension(name)?;
        let current = row
            .get("id")
            .and_then(value_as_id)
            .map(|id| format!("{id}.{ext}"));
        let stem = Path::new(name).file_stem()?.to_string_lossy().to_string();
        let legacy = format!("{stem}.{ext}");

        let exists = |candidate: &str| self.fs.exists(&self.storage.thumb_root.join(candidate));
        match current {
            Some(current) if exists(&current) => Some(current),
            Some(current) if exists(&legacy) => {
                debug!("legacy thumbnail for {}: {}", current, legacy);
                Some(legacy)
            }
            Some(current) => Some(current),
            None => Some(legacy),
        }
    }
}

/// Thumbnail extension for a file name, `None` without an extension.
pub fn thumbnail_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_string_lossy().to_lowercase();
    if JPG_THUMBNAIL_SOURCES.contains(&ext.as_str()) {
        Some("jpg".to_string())
    } else {
        Some(ext)
    }
}

fn join_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_print_formats_when_thumbnail_extension_then_jpg() {
        assert_eq!(thumbnail_extension("scan.TIFF").as_deref(), Some("jpg"));
        assert_eq!(thumbnail_extension("doc.pdf").as_deref(), Some("jpg"));
        assert_eq!(thumbnail_extension("logo.png").as_deref(), Some("png"));
        assert_eq!(thumbnail_extension("README"), None);
    }

    #[test]
    fn test_join_url_strips_trailing_slash() {
        assert_eq!(join_url("/storage/", "a.png"), "/storage/a.png");
    }
}
