//! Event names
//!
//! Three families share a dotted convention:
//! - lifecycle events not tied to a table (`application.error`)
//! - generic table events (`table.insert:before`, `table.select`)
//! - table-specific events, fired after the generic one
//!   (`table.insert.<table>:before`, `table.<table>.select`)

pub const APPLICATION_BOOT: &str = "application.boot";
pub const APPLICATION_ERROR: &str = "application.error";
pub const LOAD_RELATIONAL_ONETOMANY: &str = "load.relational.onetomany";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Select,
    Insert,
    Update,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Select => "select",
            Verb::Insert => "insert",
            Verb::Update => "update",
        }
    }
}

/// Position of the event relative to persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before the write hits the database; filters may rewrite the row.
    Before,
    /// After the operation completed.
    Done,
}

impl Phase {
    fn suffix(&self) -> &'static str {
        match self {
            Phase::Before => ":before",
            Phase::Done => "",
        }
    }
}

/// `table.<verb>[:before]`
pub fn generic(verb: Verb, phase: Phase) -> String {
    format!("table.{}{}", verb.as_str(), phase.suffix())
}

/// `table.<table>.select` for reads, `table.<verb>.<table>[:before]` for writes.
pub fn specific(verb: Verb, table: &str, phase: Phase) -> String {
    match verb {
        Verb::Select => format!("table.{}.select{}", table, phase.suffix()),
        _ => format!("table.{}.{}{}", verb.as_str(), table, phase.suffix()),
    }
}

/// Both names for an operation, generic first.
pub fn table_events(verb: Verb, table: &str, phase: Phase) -> [String; 2] {
    [generic(verb, phase), specific(verb, table, phase)]
}
