//! The envelope threaded through filter chains
//!
//! A `Payload` is a JSON object. Well-known keys describe the table
//! operation; handlers may add any other key. A handler must hand back every
//! key it did not touch unchanged.

use serde_json::{Map, Value};

use crate::domain::{value_as_id, DomainError, Row};

/// Target table of the operation.
pub const TABLE: &str = "table";
/// Row being written (insert/update).
pub const ROW: &str = "row";
/// Select parameters.
pub const PARAMS: &str = "params";
/// Result set (array of rows, or an object once re-keyed).
pub const RESULT: &str = "result";
/// Id of the user performing the operation.
pub const ACTOR: &str = "actor";
/// Relation column definition for relational loads.
pub const COLUMN: &str = "column";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn for_table(table: &str) -> Self {
        Self::new().with(TABLE, table)
    }

    /// Builder-style setter.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn table(&self) -> Option<&str> {
        self.0.get(TABLE).and_then(Value::as_str)
    }

    pub fn is_table(&self, table: &str) -> bool {
        self.table() == Some(table)
    }

    pub fn actor(&self) -> Option<i64> {
        self.0.get(ACTOR).and_then(value_as_id)
    }

    pub fn row(&self) -> Option<&Row> {
        self.0.get(ROW).and_then(Value::as_object)
    }

    pub fn row_mut(&mut self) -> Option<&mut Row> {
        self.0.get_mut(ROW).and_then(Value::as_object_mut)
    }

    pub fn rows(&self) -> Option<&Vec<Value>> {
        self.0.get(RESULT).and_then(Value::as_array)
    }

    pub fn rows_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.0.get_mut(RESULT).and_then(Value::as_array_mut)
    }

    /// Take the result set out as rows. Non-object entries are an error.
    pub fn take_rows(&mut self) -> Result<Vec<Row>, DomainError> {
        match self.0.remove(RESULT) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    _ => Err(invalid(RESULT, "an array of objects")),
                })
                .collect(),
            Some(_) => Err(invalid(RESULT, "an array of objects")),
        }
    }

    pub fn set_rows(&mut self, rows: Vec<Row>) {
        let rows = rows.into_iter().map(Value::Object).collect();
        self.0.insert(RESULT.to_string(), Value::Array(rows));
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        Value::Object(payload.0)
    }
}

fn invalid(field: &str, expected: &str) -> DomainError {
    DomainError::InvalidPayload {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}
