//! Embed providers for externally hosted media

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::{value_as_id, Row};
use crate::infrastructure::traits::EmbedProvider;

const DEFAULT_WIDTH: i64 = 560;
const DEFAULT_HEIGHT: i64 = 315;

/// Providers keyed by the file type they render.
#[derive(Default)]
pub struct EmbedManager {
    providers: BTreeMap<String, Arc<dyn EmbedProvider>>,
}

impl EmbedManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with the built-in youtube and vimeo providers.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.register(Arc::new(YoutubeProvider));
        manager.register(Arc::new(VimeoProvider));
        manager
    }

    pub fn register(&mut self, provider: Arc<dyn EmbedProvider>) {
        debug!("embed provider: {}", provider.file_type());
        self.providers
            .insert(provider.file_type().to_string(), provider);
    }

    pub fn get_by_type(&self, file_type: &str) -> Option<&Arc<dyn EmbedProvider>> {
        self.providers.get(file_type)
    }

    pub fn types(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

/// The row's video id, only if it is a URL-safe token (`[A-Za-z0-9_-]`).
fn embed_id(row: &Row) -> Option<String> {
    let id = match row.get("embed_id")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let url_safe = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    (!id.is_empty() && url_safe).then_some(id)
}

fn dimension(row: &Row, column: &str, default: i64) -> i64 {
    row.get(column)
        .and_then(value_as_id)
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn iframe(src: &str, row: &Row) -> String {
    format!(
        r#"<iframe width="{}" height="{}" src="{}" frameborder="0" allowfullscreen></iframe>"#,
        dimension(row, "width", DEFAULT_WIDTH),
        dimension(row, "height", DEFAULT_HEIGHT),
        src
    )
}

pub struct YoutubeProvider;

impl EmbedProvider for YoutubeProvider {
    fn file_type(&self) -> &str {
        "embed/youtube"
    }

    fn code(&self, row: &Row) -> Option<String> {
        let id = embed_id(row)?;
        Some(iframe(&format!("//www.youtube.com/embed/{id}"), row))
    }
}

pub struct VimeoProvider;

impl EmbedProvider for VimeoProvider {
    fn file_type(&self) -> &str {
        "embed/vimeo"
    }

    fn code(&self, row: &Row) -> Option<String> {
        let id = embed_id(row)?;
        Some(iframe(&format!("//player.vimeo.com/video/{id}"), row))
    }
}
