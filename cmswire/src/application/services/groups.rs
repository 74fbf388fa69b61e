//! Group creation: seed default privileges on the users table

use std::sync::Arc;

use tracing::debug;

use crate::application::{ApplicationResult, DbResultExt, HookEmitter};
use crate::domain::acl::privilege_row;
use crate::domain::events::{specific, Phase, Verb};
use crate::domain::{value_as_id, DomainError, Payload, Priority, PrivilegeSet, TableNames};
use crate::infrastructure::traits::Database;

pub struct GroupActions {
    db: Arc<dyn Database>,
    tables: TableNames,
}

impl GroupActions {
    pub fn new(db: Arc<dyn Database>, tables: TableNames) -> Self {
        Self { db, tables }
    }

    pub fn register(self: &Arc<Self>, hooks: &HookEmitter) {
        let this = Arc::clone(self);
        hooks.add_action(
            &specific(Verb::Insert, &self.tables.groups, Phase::Done),
            Priority::Default,
            move |payload| this.after_insert(payload),
        );
    }

    /// Members of a new group may view and edit users, minus tokens.
    pub fn default_user_privileges() -> PrivilegeSet {
        PrivilegeSet {
            view: true,
            edit: true,
            read_field_blacklist: vec!["token".into()],
            write_field_blacklist: vec!["group".into(), "token".into()],
            ..PrivilegeSet::default()
        }
    }

    pub fn after_insert(&self, payload: &Payload) -> ApplicationResult<()> {
        let group_id = payload
            .row()
            .and_then(|row| row.get(&self.db.primary_key(&self.tables.groups)).and_then(value_as_id))
            .ok_or_else(|| DomainError::InvalidPayload {
                field: "row.id".into(),
                expected: "the id of the inserted group".into(),
            })?;

        let row = privilege_row(&self.tables.users, group_id, &Self::default_user_privileges());
        self.db
            .insert(&self.tables.privileges, row)
            .with_table_context("insert into", &self.tables.privileges)?;
        debug!("seeded {} privileges for group {}", self.tables.users, group_id);
        Ok(())
    }
}
