//! I/O boundary traits for testability
//!
//! These traits abstract the collaborators the bootstrap layer consumes
//! (storage, database driver, session storage), allowing services and hook
//! handlers to be tested with in-process implementations.

use std::io;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::domain::Row;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Names of the direct children of a directory, sorted.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// Errors raised by a database driver.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Structured select: equality conditions plus an optional `IN` list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub table: String,
    pub conditions: Vec<(String, Value)>,
    pub within: Option<(String, Vec<Value>)>,
}

impl Select {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    pub fn within(mut self, column: &str, values: Vec<Value>) -> Self {
        self.within = Some((column.to_string(), values));
        self
    }
}

/// Connected database handle.
pub trait Database: Send + Sync {
    fn select(&self, query: &Select) -> DbResult<Vec<Row>>;

    /// Insert a row and return it as stored (with its generated id).
    fn insert(&self, table: &str, row: Row) -> DbResult<Row>;

    /// Merge `row` into the record identified by `id` and return the result.
    fn update(&self, table: &str, id: &Value, row: Row) -> DbResult<Row>;

    /// Primary key column of a table.
    fn primary_key(&self, _table: &str) -> String {
        "id".to_string()
    }
}

/// Opens database connections from configuration.
pub trait DatabaseConnector: Send + Sync {
    fn connect(&self, config: &DatabaseConfig) -> DbResult<Arc<dyn Database>>;
}

/// Session storage for the authenticated user.
pub trait SessionStore: Send + Sync {
    fn user_id(&self) -> Option<i64>;

    fn set_user_id(&self, user_id: Option<i64>);

    fn is_logged_in(&self) -> bool {
        self.user_id().is_some()
    }
}

/// Renders embeddable media (videos hosted elsewhere) for a file row.
pub trait EmbedProvider: Send + Sync {
    /// File `type` this provider handles, e.g. `embed/youtube`.
    fn file_type(&self) -> &str;

    /// HTML embed code, `None` when the row lacks the media id.
    fn code(&self, row: &Row) -> Option<String>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        use walkdir::WalkDir;

        let mut names = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }
}
