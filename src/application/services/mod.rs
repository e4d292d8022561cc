//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (CatalogApi, FileSystem)
//! but are themselves concrete structs, not traits.

mod authorization;
mod export;
mod persist;

pub use authorization::AuthorizationService;
pub use export::{ExportOptions, ExportService, ExportTarget, TargetOutcome};
pub use persist::DocumentStore;
