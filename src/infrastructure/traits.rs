//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::fs;
use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::domain::records::{
    AttributeRecord, GroupRecord, RawAsset, RelationRecord, ResponsibilityRecord, UserRecord,
};
use crate::domain::{FilterExpression, Node, NodeKind};
use crate::infrastructure::error::ApiResult;

/// Window into a paged list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

/// Remote catalog service.
///
/// REST listings page through [`Page`]; the structured query surface pages
/// inside the query text, so `query_assets` is one call per page.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// List communities or domains matching `filter`.
    async fn list_nodes(
        &self,
        kind: NodeKind,
        filter: &FilterExpression,
        page: Page,
    ) -> ApiResult<Vec<Node>>;

    /// List assets through the REST surface.
    async fn list_assets(&self, filter: &FilterExpression, page: Page) -> ApiResult<Vec<RawAsset>>;

    /// Run a structured assets query and return the `assets` array.
    async fn query_assets(&self, query: &str) -> ApiResult<Vec<RawAsset>>;

    async fn get_attributes(&self, asset_id: &str) -> ApiResult<Vec<AttributeRecord>>;

    /// Relations where the asset is source or target.
    async fn get_relations(&self, asset_id: &str) -> ApiResult<Vec<RelationRecord>>;

    async fn get_authorizations(
        &self,
        resource_id: &str,
        include_inherited: bool,
    ) -> ApiResult<Vec<ResponsibilityRecord>>;

    async fn resolve_users(&self, ids: &[String]) -> ApiResult<Vec<UserRecord>>;

    async fn resolve_groups(&self, ids: &[String]) -> ApiResult<Vec<GroupRecord>>;
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

// ============================================================
// Real implementations
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}
