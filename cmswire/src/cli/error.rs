//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(InfraError::Io { .. }) => crate::exitcode::IOERR,
            CliError::Infra(InfraError::Application(e)) => match e.root_cause() {
                ApplicationError::Connection => crate::exitcode::UNAVAILABLE,
                ApplicationError::MissingConfiguration { .. } | ApplicationError::Config { .. } => {
                    crate::exitcode::CONFIG
                }
                ApplicationError::UnknownService(_) => crate::exitcode::USAGE,
                ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
                _ => crate::exitcode::SOFTWARE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_wrapped_connection_failure_when_exit_code_then_unavailable() {
        let err = CliError::from(ApplicationError::ServiceConstruction {
            service: "acl".into(),
            source: Box::new(ApplicationError::Connection),
        });
        assert_eq!(err.exit_code(), crate::exitcode::UNAVAILABLE);
    }

    #[test]
    fn given_missing_configuration_when_exit_code_then_config() {
        let err = CliError::from(ApplicationError::MissingConfiguration {
            keys: vec!["database.name".into()],
        });
        assert_eq!(err.exit_code(), crate::exitcode::CONFIG);
    }

    #[test]
    fn test_usage_exit_code() {
        assert_eq!(
            CliError::Usage("no command".into()).exit_code(),
            crate::exitcode::USAGE
        );
    }
}
