//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{DocumentStore, ExportService};
use crate::config::Settings;
use crate::infrastructure::catalog::HttpCatalogClient;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::traits::{CatalogApi, FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub export: ExportService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    ///
    /// Fails when the catalog section does not describe a usable client.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let api = HttpCatalogClient::new(&settings.catalog)?;
        Ok(Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(api),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>, api: Arc<dyn CatalogApi>) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
            export: ExportService::new(api),
        }
    }

    /// Document store writing into `output_dir`, or the configured default.
    pub fn document_store(&self, output_dir: Option<&std::path::Path>) -> DocumentStore {
        let dir = output_dir
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.settings.export.output_dir.clone());
        DocumentStore::new(Arc::clone(&self.fs), dir)
    }
}
