//! Permission snapshot for one request
//!
//! An `AclSnapshot` is immutable once built. A missing privilege set means no
//! access, never unrestricted access.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{split_csv, value_as_flag, value_as_id, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Add,
    Edit,
    Delete,
    Alter,
}

/// Per-table flags of a permission group plus field blacklists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrivilegeSet {
    pub view: bool,
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
    pub alter: bool,
    pub read_field_blacklist: Vec<String>,
    pub write_field_blacklist: Vec<String>,
}

impl PrivilegeSet {
    /// Parse a privileges row (`allow_*` columns, comma-separated blacklists).
    pub fn from_row(row: &Row) -> Self {
        Self {
            view: value_as_flag(row.get("allow_view")),
            add: value_as_flag(row.get("allow_add")),
            edit: value_as_flag(row.get("allow_edit")),
            delete: value_as_flag(row.get("allow_delete")),
            alter: value_as_flag(row.get("allow_alter")),
            read_field_blacklist: split_csv(row.get("read_field_blacklist")),
            write_field_blacklist: split_csv(row.get("write_field_blacklist")),
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::View => self.view,
            Permission::Add => self.add,
            Permission::Edit => self.edit,
            Permission::Delete => self.delete,
            Permission::Alter => self.alter,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AclSnapshot {
    owner_columns: BTreeMap<String, String>,
    group_privileges: Option<BTreeMap<String, PrivilegeSet>>,
    user_id: Option<i64>,
    group_id: Option<i64>,
}

impl AclSnapshot {
    pub fn new(
        owner_columns: BTreeMap<String, String>,
        group_privileges: Option<BTreeMap<String, PrivilegeSet>>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Self {
        Self {
            owner_columns,
            group_privileges,
            user_id,
            group_id,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn group_id(&self) -> Option<i64> {
        self.group_id
    }

    pub fn owner_columns(&self) -> &BTreeMap<String, String> {
        &self.owner_columns
    }

    pub fn owner_column(&self, table: &str) -> Option<&str> {
        self.owner_columns.get(table).map(String::as_str)
    }

    /// `None` when the group privileges were never loaded.
    pub fn group_privileges(&self) -> Option<&BTreeMap<String, PrivilegeSet>> {
        self.group_privileges.as_ref()
    }

    pub fn privileges(&self, table: &str) -> Option<&PrivilegeSet> {
        self.group_privileges.as_ref()?.get(table)
    }

    pub fn can(&self, table: &str, permission: Permission) -> bool {
        self.privileges(table)
            .map(|p| p.allows(permission))
            .unwrap_or(false)
    }

    /// True when the table records its creator and the row was created by
    /// the current user.
    pub fn owns(&self, table: &str, row: &Row) -> bool {
        match (self.owner_column(table), self.user_id) {
            (Some(column), Some(user)) => row.get(column).and_then(value_as_id) == Some(user),
            _ => false,
        }
    }

    /// Drop fields on the read blacklist. Without view privilege nothing
    /// is readable.
    pub fn readable(&self, table: &str, mut row: Row) -> Row {
        match self.privileges(table) {
            Some(p) if p.view => {
                for field in &p.read_field_blacklist {
                    row.remove(field);
                }
                row
            }
            _ => Row::new(),
        }
    }

    pub fn can_write_field(&self, table: &str, field: &str) -> bool {
        self.privileges(table)
            .map(|p| !p.write_field_blacklist.iter().any(|f| f == field))
            .unwrap_or(false)
    }

    /// Field names of `row` the current user may not write.
    pub fn blocked_write_fields(&self, table: &str, row: &Row) -> Vec<String> {
        row.keys()
            .filter(|field| !self.can_write_field(table, field))
            .cloned()
            .collect()
    }
}

/// Render a privilege set as a privileges-table row.
pub fn privilege_row(table: &str, group_id: i64, set: &PrivilegeSet) -> Row {
    let mut row = Row::new();
    row.insert("table_name".into(), Value::from(table));
    row.insert("group_id".into(), Value::from(group_id));
    row.insert("allow_view".into(), Value::from(u8::from(set.view)));
    row.insert("allow_add".into(), Value::from(u8::from(set.add)));
    row.insert("allow_edit".into(), Value::from(u8::from(set.edit)));
    row.insert("allow_delete".into(), Value::from(u8::from(set.delete)));
    row.insert("allow_alter".into(), Value::from(u8::from(set.alter)));
    row.insert(
        "read_field_blacklist".into(),
        Value::from(set.read_field_blacklist.join(",")),
    );
    row.insert(
        "write_field_blacklist".into(),
        Value::from(set.write_field_blacklist.join(",")),
    );
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn snapshot() -> AclSnapshot {
        let mut owners = BTreeMap::new();
        owners.insert("articles".to_string(), "author".to_string());
        let mut privileges = BTreeMap::new();
        privileges.insert(
            "articles".to_string(),
            PrivilegeSet::from_row(&row(json!({
                "allow_view": 1, "allow_edit": "1", "allow_delete": 0,
                "read_field_blacklist": "secret", "write_field_blacklist": "author,status"
            }))),
        );
        AclSnapshot::new(owners, Some(privileges), Some(5), Some(2))
    }

    #[test]
    fn given_privilege_row_when_parsing_then_reads_flags_and_blacklists() {
        let set = PrivilegeSet::from_row(&row(json!({
            "allow_view": true, "allow_add": 0, "allow_edit": 1,
            "read_field_blacklist": "token", "write_field_blacklist": "group, token"
        })));
        assert!(set.view && set.edit);
        assert!(!set.add && !set.delete && !set.alter);
        assert_eq!(set.read_field_blacklist, vec!["token"]);
        assert_eq!(set.write_field_blacklist, vec!["group", "token"]);
    }

    #[test]
    fn given_snapshot_when_checking_permissions_then_uses_table_flags() {
        let acl = snapshot();
        assert!(acl.can("articles", Permission::View));
        assert!(acl.can("articles", Permission::Edit));
        assert!(!acl.can("articles", Permission::Delete));
        assert!(!acl.can("pages", Permission::View), "unknown table is denied");
    }

    #[test]
    fn given_no_privileges_when_checking_then_default_deny() {
        let acl = AclSnapshot::new(BTreeMap::new(), None, Some(1), None);
        assert!(!acl.can("articles", Permission::View));
        assert!(acl.readable("articles", row(json!({"id": 1}))).is_empty());
        assert!(!acl.can_write_field("articles", "title"));
    }

    #[test]
    fn given_owner_column_when_row_created_by_user_then_owns() {
        let acl = snapshot();
        assert!(acl.owns("articles", &row(json!({"author": 5}))));
        assert!(!acl.owns("articles", &row(json!({"author": 6}))));
        assert!(!acl.owns("pages", &row(json!({"author": 5}))));
    }

    #[test]
    fn given_blacklists_when_filtering_then_hides_and_blocks_fields() {
        let acl = snapshot();
        let visible = acl.readable("articles", row(json!({"title": "t", "secret": "s"})));
        assert!(visible.contains_key("title"));
        assert!(!visible.contains_key("secret"));

        let blocked = acl.blocked_write_fields("articles", &row(json!({"title": "t", "status": 1})));
        assert_eq!(blocked, vec!["status"]);
    }
}
