//! Domain entities: core data structures

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A database row as handed around by gateways and hook handlers.
pub type Row = Map<String, Value>;

/// Identifier of every service the registry knows how to build.
///
/// Strings are only parsed at the public boundary; internally the registry
/// is keyed by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceName {
    Config,
    Database,
    Session,
    Auth,
    Acl,
    Files,
    Mailer,
    Extensions,
    Uis,
    Embed,
    Hooks,
}

impl ServiceName {
    pub const ALL: [ServiceName; 11] = [
        ServiceName::Config,
        ServiceName::Database,
        ServiceName::Session,
        ServiceName::Auth,
        ServiceName::Acl,
        ServiceName::Files,
        ServiceName::Mailer,
        ServiceName::Extensions,
        ServiceName::Uis,
        ServiceName::Embed,
        ServiceName::Hooks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Config => "config",
            ServiceName::Database => "database",
            ServiceName::Session => "session",
            ServiceName::Auth => "auth",
            ServiceName::Acl => "acl",
            ServiceName::Files => "files",
            ServiceName::Mailer => "mailer",
            ServiceName::Extensions => "extensions",
            ServiceName::Uis => "uis",
            ServiceName::Embed => "embed",
            ServiceName::Hooks => "hooks",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn parse(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering class of a hook handler. Higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    Low,
    #[default]
    Default,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Default => "default",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

/// Whether a hook handler fires for side effects or transforms a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Action,
    Filter,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Action => f.write_str("action"),
            HookKind::Filter => f.write_str("filter"),
        }
    }
}

/// Names of the system tables the bootstrap layer cares about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TableNames {
    pub files: String,
    pub users: String,
    pub groups: String,
    pub privileges: String,
    pub messages: String,
    /// Table definitions (one row per managed table).
    pub tables: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            files: "directus_files".into(),
            users: "directus_users".into(),
            groups: "directus_groups".into(),
            privileges: "directus_privileges".into(),
            messages: "directus_messages".into(),
            tables: "directus_tables".into(),
        }
    }
}

/// Read an integer id out of a JSON value.
///
/// Accepts numbers and numeric strings, since rows coming from different
/// drivers disagree on how ids are typed.
pub fn value_as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Interpret a column value as a boolean flag (`1`, `true`, `"1"`, `"true"`).
pub fn value_as_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "yes"),
        _ => false,
    }
}

/// Split a comma-separated column into trimmed, non-empty parts.
pub fn split_csv(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|p| !p.is_empty())
            .collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_mixed_case_name_when_parsing_then_finds_service() {
        assert_eq!(ServiceName::parse("ACL"), Some(ServiceName::Acl));
        assert_eq!(ServiceName::parse(" Database "), Some(ServiceName::Database));
        assert_eq!(ServiceName::parse("twig"), None);
    }

    #[test]
    fn given_priorities_when_sorted_then_high_is_greatest() {
        let mut p = vec![Priority::Default, Priority::High, Priority::Low];
        p.sort();
        assert_eq!(p, vec![Priority::Low, Priority::Default, Priority::High]);
    }

    #[test]
    fn test_value_as_id() {
        assert_eq!(value_as_id(&json!(7)), Some(7));
        assert_eq!(value_as_id(&json!("12")), Some(12));
        assert_eq!(value_as_id(&json!(null)), None);
    }

    #[test]
    fn test_value_as_flag() {
        assert!(value_as_flag(Some(&json!(1))));
        assert!(value_as_flag(Some(&json!(true))));
        assert!(value_as_flag(Some(&json!("1"))));
        assert!(!value_as_flag(Some(&json!(0))));
        assert!(!value_as_flag(None));
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv(Some(&json!("1, 2,,3"))), vec!["1", "2", "3"]);
        assert_eq!(split_csv(Some(&json!([4, "5"]))), vec!["4", "5"]);
        assert!(split_csv(Some(&json!(null))).is_empty());
    }
}
