//! Table gateway: database access wrapped in the hook pipeline
//!
//! Every operation dispatches the generic event first, then the
//! table-specific one. Writes run `:before` filters ahead of persistence and
//! actions after it.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::application::{ApplicationResult, DbResultExt, HookEmitter};
use crate::domain::events::{table_events, Phase, Verb};
use crate::domain::payload::{ACTOR, PARAMS, ROW};
use crate::domain::{DomainError, Payload, Row};
use crate::infrastructure::traits::{Database, Select};

pub struct TableGateway {
    table: String,
    db: Arc<dyn Database>,
    hooks: Arc<HookEmitter>,
    actor: Option<i64>,
}

impl TableGateway {
    pub fn new(
        table: &str,
        db: Arc<dyn Database>,
        hooks: Arc<HookEmitter>,
        actor: Option<i64>,
    ) -> Self {
        Self {
            table: table.to_string(),
            db,
            hooks,
            actor,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn payload(&self) -> Payload {
        let mut payload = Payload::for_table(&self.table);
        if let Some(actor) = self.actor {
            payload.set(ACTOR, actor);
        }
        payload
    }

    fn filter(&self, verb: Verb, phase: Phase, payload: Payload) -> ApplicationResult<Payload> {
        let mut payload = payload;
        for event in table_events(verb, &self.table, phase) {
            payload = self.hooks.dispatch_filter(&event, payload)?;
        }
        Ok(payload)
    }

    fn act(&self, verb: Verb, payload: &Payload) {
        for event in table_events(verb, &self.table, Phase::Done) {
            self.hooks.dispatch_action(&event, payload);
        }
    }

    /// Query rows and run them through the select filters.
    pub fn select(&self, query: Select) -> ApplicationResult<Vec<Row>> {
        debug!("select: table={}", self.table);
        let query = Select {
            table: self.table.clone(),
            ..query
        };
        let rows = self
            .db
            .select(&query)
            .with_table_context("select from", &self.table)?;

        let mut payload = self.payload().with(PARAMS, params_value(&query));
        payload.set_rows(rows);
        let mut payload = self.filter(Verb::Select, Phase::Done, payload)?;
        Ok(payload.take_rows()?)
    }

    pub fn insert(&self, row: Row) -> ApplicationResult<Row> {
        debug!("insert: table={}", self.table);
        let row = self.filter_row(Verb::Insert, row)?;
        let stored = self
            .db
            .insert(&self.table, row)
            .with_table_context("insert into", &self.table)?;
        self.act(Verb::Insert, &self.payload().with(ROW, stored.clone()));
        Ok(stored)
    }

    pub fn update(&self, id: Value, row: Row) -> ApplicationResult<Row> {
        debug!("update: table={} id={}", self.table, id);
        let row = self.filter_row(Verb::Update, row)?;
        let stored = self
            .db
            .update(&self.table, &id, row)
            .with_table_context("update", &self.table)?;
        self.act(Verb::Update, &self.payload().with(ROW, stored.clone()));
        Ok(stored)
    }

    fn filter_row(&self, verb: Verb, row: Row) -> ApplicationResult<Row> {
        let payload = self.payload().with(ROW, row);
        let mut payload = self.filter(verb, Phase::Before, payload)?;
        match payload.remove(ROW) {
            Some(Value::Object(row)) => Ok(row),
            _ => Err(DomainError::InvalidPayload {
                field: ROW.to_string(),
                expected: "an object".to_string(),
            }
            .into()),
        }
    }
}

fn params_value(query: &Select) -> Value {
    let mut params = serde_json::Map::new();
    for (column, value) in &query.conditions {
        params.insert(column.clone(), value.clone());
    }
    if let Some((column, values)) = &query.within {
        params.insert(column.clone(), Value::Array(values.clone()));
    }
    Value::Object(params)
}
