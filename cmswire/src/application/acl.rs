//! Per-request permission snapshot construction

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::application::{ApplicationResult, DbResultExt};
use crate::domain::{value_as_id, AclSnapshot, PrivilegeSet, TableNames};
use crate::infrastructure::traits::{Database, Select, SessionStore};

/// Column of a table definition naming the row owner.
pub const OWNER_COLUMN: &str = "user_create_column";

pub struct AccessControlBuilder {
    tables: TableNames,
}

impl AccessControlBuilder {
    pub fn new(tables: TableNames) -> Self {
        Self { tables }
    }

    /// Build the snapshot for the session's user.
    ///
    /// Without a user row the snapshot is anonymous: no privileges, no
    /// user id, so neither permission nor ownership checks pass.
    pub fn build(&self, db: &dyn Database, session: &dyn SessionStore) -> ApplicationResult<AclSnapshot> {
        let owner_columns = self.owner_columns(db)?;

        let Some(user_id) = session.user_id() else {
            debug!("acl: anonymous session");
            return Ok(AclSnapshot::new(owner_columns, None, None, None));
        };

        let users = &self.tables.users;
        let user = db
            .select(&Select::from(users).eq(&db.primary_key(users), user_id))
            .with_table_context("load user from", users)?
            .into_iter()
            .next();
        let Some(user) = user else {
            debug!("acl: user {} not found, treating as anonymous", user_id);
            return Ok(AclSnapshot::new(owner_columns, None, None, None));
        };

        let group_id = user.get("group").and_then(value_as_id);
        let privileges = match group_id {
            Some(group_id) => Some(self.group_privileges(db, group_id)?),
            None => None,
        };
        debug!(
            "acl: user {} group {:?} ({} tables)",
            user_id,
            group_id,
            privileges.as_ref().map(BTreeMap::len).unwrap_or(0)
        );
        Ok(AclSnapshot::new(
            owner_columns,
            privileges,
            Some(user_id),
            group_id,
        ))
    }

    fn owner_columns(&self, db: &dyn Database) -> ApplicationResult<BTreeMap<String, String>> {
        let rows = db
            .select(&Select::from(&self.tables.tables))
            .with_table_context("load table definitions from", &self.tables.tables)?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let table = row.get("table_name").and_then(Value::as_str)?;
                let column = row.get(OWNER_COLUMN).and_then(Value::as_str)?.trim();
                (!column.is_empty()).then(|| (table.to_string(), column.to_string()))
            })
            .collect())
    }

    fn group_privileges(
        &self,
        db: &dyn Database,
        group_id: i64,
    ) -> ApplicationResult<BTreeMap<String, PrivilegeSet>> {
        let rows = db
            .select(&Select::from(&self.tables.privileges).eq("group_id", group_id))
            .with_table_context("load privileges from", &self.tables.privileges)?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let table = row.get("table_name").and_then(Value::as_str)?;
                Some((table.to_string(), PrivilegeSet::from_row(row)))
            })
            .collect())
    }
}
