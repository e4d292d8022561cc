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

    #[error("{failed} of {total} exports failed")]
    PartialFailure { failed: usize, total: usize },
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
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::PartialFailure { .. } => crate::exitcode::PARTIAL,
            CliError::Infra(e) => match e {
                InfraError::Client { .. } => crate::exitcode::CONFIG,
                InfraError::Application(e) => application_exit_code(e),
            },
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::NotFound { .. } => crate::exitcode::NOINPUT,
        ApplicationError::Transport { .. } => crate::exitcode::UNAVAILABLE,
        ApplicationError::Config { .. } => crate::exitcode::CONFIG,
        ApplicationError::OperationFailed { source, .. }
            if source.downcast_ref::<std::io::Error>().is_some() =>
        {
            crate::exitcode::IOERR
        }
        ApplicationError::OperationFailed { .. } | ApplicationError::Domain(_) => {
            crate::exitcode::SOFTWARE
        }
    }
}
