//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod authorization;
pub mod entities;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod normalize;
pub mod query;
pub mod records;

pub use entities::*;
pub use error::DomainError;
pub use filter::{FilterExpression, Literal, Syntax};
pub use hierarchy::{ancestor_chain, descendants_of};
pub use normalize::{normalize_asset, normalize_attribute_records, normalize_relation_records};
pub use query::AssetQuery;
