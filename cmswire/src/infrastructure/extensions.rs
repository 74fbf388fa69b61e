//! Extension discovery
//!
//! An extension is a directory under the extensions root holding an entry
//! file. Names starting with `.` or `_` are disabled and skipped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::application::{ApplicationResult, IoResultExt};
use crate::infrastructure::traits::FileSystem;

pub const API_ENTRY: &str = "api.toml";
pub const UI_ENTRY: &str = "ui.toml";

/// Map extension name to its entry file. A missing root yields no extensions.
pub fn discover(
    fs: &dyn FileSystem,
    dir: &Path,
    entry_file: &str,
) -> ApplicationResult<BTreeMap<String, PathBuf>> {
    if !fs.is_dir(dir) {
        debug!("extensions: {} does not exist", dir.display());
        return Ok(BTreeMap::new());
    }

    let mut found = BTreeMap::new();
    for name in fs
        .list_dir(dir)
        .with_path_context("scan extensions", dir)?
    {
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        let path = dir.join(&name);
        if !fs.is_dir(&path) {
            continue;
        }
        debug!("extension: {}", name);
        found.insert(name, path.join(entry_file));
    }
    Ok(found)
}
