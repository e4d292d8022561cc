//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod pagination;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::{ApiResultExt, IoResultExt};
pub use pagination::harvest_all;
