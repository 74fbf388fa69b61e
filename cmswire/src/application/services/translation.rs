//! Translation relations: index related rows by language code
//!
//! A one-to-many relation rendered with the `translation` UI returns one row
//! per language. Consumers want them keyed by code (`{"en": {...}}`), so
//! this filter re-keys the result set.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::application::{ApplicationResult, HookEmitter};
use crate::domain::events::LOAD_RELATIONAL_ONETOMANY;
use crate::domain::payload::{COLUMN, RESULT};
use crate::domain::{DomainError, Payload, Priority};
use crate::infrastructure::traits::Database;

pub const TRANSLATION_UI: &str = "translation";
const DEFAULT_LINK_COLUMN: &str = "language_code";
const DEFAULT_CODE_COLUMN: &str = "code";

pub struct TranslationFilter {
    db: Arc<dyn Database>,
}

impl TranslationFilter {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn register(self: &Arc<Self>, hooks: &HookEmitter) {
        let this = Arc::clone(self);
        hooks.add_filter(LOAD_RELATIONAL_ONETOMANY, Priority::High, move |payload| {
            this.index_by_language(payload)
        });
    }

    pub fn index_by_language(&self, mut payload: Payload) -> ApplicationResult<Payload> {
        let Some(column) = payload.get(COLUMN).and_then(Value::as_object) else {
            return Ok(payload);
        };
        if column.get("ui").and_then(Value::as_str) != Some(TRANSLATION_UI) {
            return Ok(payload);
        }

        let relation = column
            .get("column_name")
            .and_then(Value::as_str)
            .unwrap_or(TRANSLATION_UI)
            .to_string();
        let options = column.get("options").and_then(Value::as_object);
        let option = |key: &str| {
            options
                .and_then(|o| o.get(key))
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let languages_table =
            option("languages_table").ok_or_else(|| DomainError::MissingRelationConfig {
                relation: relation.clone(),
                option: "languages_table".into(),
            })?;
        let link_column = option("left_column_name").unwrap_or_else(|| DEFAULT_LINK_COLUMN.into());
        let code_keys = [
            option("languages_code_column").unwrap_or_else(|| DEFAULT_CODE_COLUMN.into()),
            self.db.primary_key(&languages_table),
        ];

        let rows = match payload.remove(RESULT) {
            Some(Value::Array(rows)) => rows,
            Some(other) => {
                payload.set(RESULT, other);
                return Ok(payload);
            }
            None => return Ok(payload),
        };

        let mut indexed = Map::new();
        for row in rows {
            let code = row
                .get(&link_column)
                .and_then(|link| language_code(link, &code_keys));
            let Some(code) = code else {
                warn!("{}: row without `{}` dropped", relation, link_column);
                continue;
            };
            if indexed.insert(code.clone(), row).is_some() {
                warn!("{}: duplicate language `{}`, last row wins", relation, code);
            }
        }
        payload.set(RESULT, Value::Object(indexed));
        Ok(payload)
    }
}

/// Code from a link value: a scalar, or an object (optionally under `data`)
/// holding the first present key of `keys`.
fn language_code(link: &Value, keys: &[String]) -> Option<String> {
    match link {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            let inner = match map.get("data") {
                Some(Value::Object(data)) => data,
                _ => map,
            };
            keys.iter()
                .find_map(|key| inner.get(key))
                .and_then(|code| match code {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
        }
        _ => None,
    }
}
