//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::traits::DbError;

/// Application errors wrap domain errors and add service/hook context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("missing required configuration: {}", keys.join(", "))]
    MissingConfiguration { keys: Vec<String> },

    #[error("failed to construct service `{service}`: {source}")]
    ServiceConstruction {
        service: String,
        #[source]
        source: Box<ApplicationError>,
    },

    #[error("circular service dependency: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    #[error("service `{service}` is not a {expected}")]
    ServiceType { service: String, expected: String },

    /// Detail is logged at the failure site and never shown to users.
    #[error("could not connect to the database")]
    Connection,

    #[error("database error: {context}")]
    Database {
        context: String,
        #[source]
        source: DbError,
    },

    #[error("hook handler for `{event}` failed: {source}")]
    Handler {
        event: String,
        #[source]
        source: Box<ApplicationError>,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Wrap a database error with context. Connection failures collapse to
    /// the generic `Connection` error after being logged.
    pub fn database(context: impl Into<String>, source: DbError) -> Self {
        match source {
            DbError::Connection(detail) => {
                tracing::error!("database connection failed: {}", detail);
                Self::Connection
            }
            source => Self::Database {
                context: context.into(),
                source,
            },
        }
    }

    /// Innermost error beneath handler and construction wrappers.
    pub fn root_cause(&self) -> &ApplicationError {
        match self {
            Self::Handler { source, .. } | Self::ServiceConstruction { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
