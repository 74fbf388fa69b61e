//! User table handlers: credential redaction and password hashing

use std::sync::Arc;

use serde_json::Value;

use crate::application::password::{hash_password, new_salt};
use crate::application::{ApplicationResult, HookEmitter};
use crate::domain::events::{specific, Phase, Verb};
use crate::domain::{value_as_id, Payload, Priority, TableNames};

/// Columns only the user themself may read.
pub const PRIVATE_USER_FIELDS: [&str; 9] = [
    "password",
    "salt",
    "token",
    "access_token",
    "reset_token",
    "reset_expiration",
    "email_messages",
    "last_access",
    "last_page",
];

pub struct UserFilters {
    tables: TableNames,
}

impl UserFilters {
    pub fn new(tables: TableNames) -> Self {
        Self { tables }
    }

    pub fn register(self: &Arc<Self>, hooks: &HookEmitter) {
        let users = &self.tables.users;
        hooks.add_filter(
            &specific(Verb::Select, users, Phase::Done),
            Priority::Default,
            redact,
        );
        for verb in [Verb::Insert, Verb::Update] {
            hooks.add_filter(
                &specific(verb, users, Phase::Before),
                Priority::Default,
                hash_row_password,
            );
        }
    }
}

/// Strip private columns from every row that is not the acting user's own.
pub fn redact(mut payload: Payload) -> ApplicationResult<Payload> {
    let actor = payload.actor();
    if let Some(rows) = payload.rows_mut() {
        for row in rows.iter_mut().filter_map(Value::as_object_mut) {
            let own = actor.is_some() && row.get("id").and_then(value_as_id) == actor;
            if !own {
                for field in PRIVATE_USER_FIELDS {
                    row.remove(field);
                }
            }
        }
    }
    Ok(payload)
}

/// Replace a plaintext `password` with its salted Argon2id hash.
pub fn hash_row_password(mut payload: Payload) -> ApplicationResult<Payload> {
    if let Some(row) = payload.row_mut() {
        let plain = match row.get("password") {
            Some(Value::String(p)) if !p.is_empty() => p.clone(),
            _ => return Ok(payload),
        };
        let salt = new_salt();
        row.insert("password".into(), Value::from(hash_password(&salt, &plain)?));
        row.insert("salt".into(), Value::from(salt));
    }
    Ok(payload)
}
