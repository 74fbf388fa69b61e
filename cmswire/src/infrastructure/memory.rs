//! In-process implementations of the database and session collaborators
//!
//! The `memory` driver keeps tables as vectors of JSON rows. It is what the
//! CLI and the test-suite run against; real drivers plug in through
//! `DatabaseConnector`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::domain::{value_as_id, Row};
use crate::infrastructure::traits::{
    Database, DatabaseConnector, DbError, DbResult, FileSystem, Select, SessionStore,
};

pub const MEMORY_DRIVER: &str = "memory";

/// Seed file layout: `{ "tables": { name: [rows] }, "primary_keys": { name: column } }`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Seed {
    tables: BTreeMap<String, Vec<Row>>,
    primary_keys: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<BTreeMap<String, Vec<Row>>>,
    primary_keys: RwLock<BTreeMap<String, String>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: BTreeMap<String, Vec<Row>>) -> Self {
        Self {
            tables: RwLock::new(tables),
            primary_keys: RwLock::new(BTreeMap::new()),
        }
    }

    /// Parse a JSON seed document.
    pub fn from_json(content: &str) -> DbResult<Self> {
        let seed: Seed = serde_json::from_str(content)
            .map_err(|e| DbError::Connection(format!("invalid seed: {e}")))?;
        Ok(Self {
            tables: RwLock::new(seed.tables),
            primary_keys: RwLock::new(seed.primary_keys),
        })
    }

    pub fn set_primary_key(&self, table: &str, column: &str) {
        self.primary_keys
            .write()
            .insert(table.to_string(), column.to_string());
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    fn next_id(rows: &[Row], pk: &str) -> i64 {
        rows.iter()
            .filter_map(|r| r.get(pk).and_then(value_as_id))
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Ids arrive as numbers or strings depending on the caller.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (value_as_id(a), value_as_id(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

impl Database for MemoryDatabase {
    fn select(&self, query: &Select) -> DbResult<Vec<Row>> {
        let tables = self.tables.read();
        let Some(rows) = tables.get(&query.table) else {
            return Ok(Vec::new());
        };
        let matched = rows
            .iter()
            .filter(|row| {
                query.conditions.iter().all(|(column, expected)| {
                    row.get(column)
                        .map(|v| loosely_equal(v, expected))
                        .unwrap_or(false)
                })
            })
            .filter(|row| match &query.within {
                Some((column, values)) => row
                    .get(column)
                    .map(|v| values.iter().any(|candidate| loosely_equal(v, candidate)))
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect();
        Ok(matched)
    }

    fn insert(&self, table: &str, mut row: Row) -> DbResult<Row> {
        let pk = self.primary_key(table);
        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if !row.contains_key(&pk) {
            row.insert(pk.clone(), Value::from(Self::next_id(rows, &pk)));
        }
        debug!("memory insert: table={} {}={:?}", table, pk, row.get(&pk));
        rows.push(row.clone());
        Ok(row)
    }

    fn update(&self, table: &str, id: &Value, row: Row) -> DbResult<Row> {
        let pk = self.primary_key(table);
        let mut tables = self.tables.write();
        let existing = tables
            .get_mut(table)
            .and_then(|rows| {
                rows.iter_mut().find(|r| {
                    r.get(&pk)
                        .map(|v| loosely_equal(v, id))
                        .unwrap_or(false)
                })
            })
            .ok_or_else(|| DbError::Query(format!("no row in {table} with {pk}={id}")))?;
        for (key, value) in row {
            existing.insert(key, value);
        }
        Ok(existing.clone())
    }

    fn primary_key(&self, table: &str) -> String {
        self.primary_keys
            .read()
            .get(table)
            .cloned()
            .unwrap_or_else(|| "id".to_string())
    }
}

/// Connector for the `memory` driver.
pub struct MemoryConnector {
    fs: Arc<dyn FileSystem>,
    shared: Option<Arc<MemoryDatabase>>,
}

impl MemoryConnector {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs, shared: None }
    }

    /// Hand out the same database on every connect.
    pub fn with_database(fs: Arc<dyn FileSystem>, database: Arc<MemoryDatabase>) -> Self {
        Self {
            fs,
            shared: Some(database),
        }
    }

    fn load_seed(&self, path: &Path) -> DbResult<MemoryDatabase> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| DbError::Connection(format!("read seed {}: {e}", path.display())))?;
        MemoryDatabase::from_json(&content)
    }
}

impl DatabaseConnector for MemoryConnector {
    fn connect(&self, config: &DatabaseConfig) -> DbResult<Arc<dyn Database>> {
        let driver = config.driver.as_deref().unwrap_or_default();
        if driver != MEMORY_DRIVER {
            return Err(DbError::Connection(format!("unsupported driver: {driver}")));
        }
        if let Some(shared) = &self.shared {
            return Ok(shared.clone());
        }
        let database = match &config.seed {
            Some(path) => self.load_seed(path)?,
            None => MemoryDatabase::new(),
        };
        debug!("connected memory database: name={:?}", config.name);
        Ok(Arc::new(database))
    }
}

/// Process-local session storage.
#[derive(Debug, Default)]
pub struct MemorySession {
    user_id: RwLock<Option<i64>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in_as(user_id: i64) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id)),
        }
    }
}

impl SessionStore for MemorySession {
    fn user_id(&self) -> Option<i64> {
        *self.user_id.read()
    }

    fn set_user_id(&self, user_id: Option<i64>) {
        *self.user_id.write() = user_id;
    }
}
