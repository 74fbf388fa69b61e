//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violated data contracts inside a payload or a
/// relation definition. They are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("relation `{relation}` is missing required option `{option}`")]
    MissingRelationConfig { relation: String, option: String },

    #[error("invalid payload: field `{field}` must be {expected}")]
    InvalidPayload { field: String, expected: String },
}
