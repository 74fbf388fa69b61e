//! Authenticated user lookup
//!
//! `Auth` answers "who is acting" for a request by combining the session
//! with the users table.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::application::password::verify_password;
use crate::application::{ApplicationResult, DbResultExt};
use crate::domain::{Row, TableNames};
use crate::infrastructure::traits::{Database, Select, SessionStore};

pub struct Auth {
    db: Arc<dyn Database>,
    session: Arc<dyn SessionStore>,
    tables: TableNames,
}

impl Auth {
    pub fn new(db: Arc<dyn Database>, session: Arc<dyn SessionStore>, tables: TableNames) -> Self {
        Self {
            db,
            session,
            tables,
        }
    }

    pub fn logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn session(&self) -> &dyn SessionStore {
        self.session.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.session.user_id()
    }

    /// Row of the logged-in user, `None` when logged out or the row is gone.
    pub fn user(&self) -> ApplicationResult<Option<Row>> {
        let Some(id) = self.user_id() else {
            return Ok(None);
        };
        let pk = self.db.primary_key(&self.tables.users);
        let mut rows = self
            .db
            .select(&Select::from(&self.tables.users).eq(&pk, id))
            .with_table_context("load user from", &self.tables.users)?;
        if rows.is_empty() {
            debug!("session user {} has no row in {}", id, self.tables.users);
            return Ok(None);
        }
        Ok(Some(rows.swap_remove(0)))
    }

    /// Check `plain` against the stored `password` column.
    pub fn verify_password(row: &Row, plain: &str) -> bool {
        row.get("password")
            .and_then(Value::as_str)
            .map(|hashed| verify_password(plain, hashed))
            .unwrap_or(false)
    }
}
