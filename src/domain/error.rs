//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of catalog modelling rules.
/// These are independent of transport and persistence concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },
}

impl DomainError {
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }
}
