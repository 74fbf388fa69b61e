//! Message attachments: resolve file ids to file rows

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use itertools::Itertools;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::application::{ApplicationResult, HookEmitter, TableGateway};
use crate::domain::events::{generic, Phase, Verb};
use crate::domain::{split_csv, value_as_id, Payload, Priority, Row, TableNames};
use crate::infrastructure::traits::{Database, Select};

pub struct MessageFilters {
    db: Arc<dyn Database>,
    hooks: Weak<HookEmitter>,
    tables: TableNames,
}

impl MessageFilters {
    /// `hooks` is held weakly: the emitter owns this handler.
    pub fn new(db: Arc<dyn Database>, hooks: Weak<HookEmitter>, tables: TableNames) -> Self {
        Self { db, hooks, tables }
    }

    pub fn register(self: &Arc<Self>, hooks: &HookEmitter) {
        let this = Arc::clone(self);
        hooks.add_filter(
            &generic(Verb::Select, Phase::Done),
            Priority::Default,
            move |payload| this.after_select(payload),
        );
    }

    pub fn after_select(&self, mut payload: Payload) -> ApplicationResult<Payload> {
        if !payload.is_table(&self.tables.messages) {
            return Ok(payload);
        }
        let Some(rows) = payload.rows() else {
            return Ok(payload);
        };

        let per_row: Vec<Vec<i64>> = rows
            .iter()
            .map(|row| attachment_ids(row.as_object()))
            .collect();
        let wanted: Vec<i64> = per_row.iter().flatten().copied().sorted_unstable().dedup().collect();
        if wanted.is_empty() {
            return Ok(payload);
        }

        let Some(hooks) = self.hooks.upgrade() else {
            warn!("attachments not loaded: hook emitter is gone");
            return Ok(payload);
        };
        let files = self.load_files(hooks, payload.actor(), wanted)?;

        if let Some(rows) = payload.rows_mut() {
            for (row, ids) in rows.iter_mut().zip(per_row) {
                let Some(row) = row.as_object_mut() else {
                    continue;
                };
                if !row.contains_key("attachment") {
                    continue;
                }
                let attachments: Vec<Value> = ids
                    .into_iter()
                    .filter_map(|id| {
                        let file = files.get(&id)?;
                        Some(json!({ "id": id, "data": file }))
                    })
                    .collect();
                row.insert("attachment".into(), Value::Array(attachments));
            }
        }
        Ok(payload)
    }

    /// Load through a gateway so the file filters enrich the rows.
    fn load_files(
        &self,
        hooks: Arc<HookEmitter>,
        actor: Option<i64>,
        ids: Vec<i64>,
    ) -> ApplicationResult<HashMap<i64, Row>> {
        let files = &self.tables.files;
        let pk = self.db.primary_key(files);
        debug!("load {} attachment(s) from {}", ids.len(), files);
        let gateway = TableGateway::new(files, Arc::clone(&self.db), hooks, actor);
        let rows = gateway.select(
            Select::from(files).within(&pk, ids.into_iter().map(Value::from).collect()),
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| Some((row.get(&pk).and_then(value_as_id)?, row)))
            .collect())
    }
}

fn attachment_ids(row: Option<&Row>) -> Vec<i64> {
    split_csv(row.and_then(|r| r.get("attachment")))
        .iter()
        .filter_map(|id| id.parse().ok())
        .collect()
}
