//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Failure of a single catalog call.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("query rejected: {0}")]
    Query(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Result type for catalog calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Infrastructure errors wrap application errors and add client setup failures.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("catalog client setup failed: {message}")]
    Client { message: String },
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
