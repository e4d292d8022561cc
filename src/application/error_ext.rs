//! Error conversion helpers for catalog calls and file writes
//!
//! Provides extension traits for cleaner error handling with call context.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::error::ApiResult;

/// Extension trait for converting `ApiResult` to `ApplicationResult` with context.
pub trait ApiResultExt<T> {
    /// Add call context to a catalog error.
    ///
    /// # Example
    /// ```ignore
    /// api.get_attributes(&asset.id)
    ///     .await
    ///     .with_call_context("attributes", &asset.id)?;
    /// ```
    fn with_call_context(self, call: &str, subject: &str) -> ApplicationResult<T>;
}

impl<T> ApiResultExt<T> for ApiResult<T> {
    fn with_call_context(self, call: &str, subject: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Transport {
            context: format!("{}: {}", call, subject),
            source: e,
        })
    }
}

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}
