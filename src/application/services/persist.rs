//! Document persistence
//!
//! Writes export documents as pretty-printed JSON into the output directory.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::SecondsFormat;
use regex::Regex;
use tracing::info;

use crate::application::error_ext::IoResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ExportDocument, NodeKind};
use crate::infrastructure::traits::FileSystem;

/// Service for writing export documents to disk.
pub struct DocumentStore {
    fs: Arc<dyn FileSystem>,
    output_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(fs: Arc<dyn FileSystem>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            output_dir: output_dir.into(),
        }
    }

    /// File name for `document`: `[Domain_]<Name>_<Method>_<timestamp>.json`.
    ///
    /// Every non-alphanumeric character of the name becomes `_`; the
    /// timestamp is RFC 3339 with `:` and `.` replaced by `-`.
    pub fn file_name(document: &ExportDocument) -> ApplicationResult<String> {
        let re = Regex::new(r"[^A-Za-z0-9]").map_err(|e| ApplicationError::OperationFailed {
            context: "compile file name pattern".to_string(),
            source: Box::new(e),
        })?;
        let target = &document.target;
        let name = re.replace_all(&target.name, "_");
        let timestamp = target
            .exported_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let prefix = match target.kind {
            NodeKind::Domain => "Domain_",
            NodeKind::Community => "",
        };

        Ok(format!(
            "{prefix}{name}_{}_{timestamp}.json",
            target.method.label()
        ))
    }

    /// Serialize and write `document`; returns the written path.
    pub fn save(&self, document: &ExportDocument) -> ApplicationResult<PathBuf> {
        let content =
            serde_json::to_string_pretty(document).map_err(|e| ApplicationError::OperationFailed {
                context: format!("serialize export of {}", document.target.name),
                source: Box::new(e),
            })?;

        if !self.fs.exists(&self.output_dir) {
            self.fs
                .create_dir_all(&self.output_dir)
                .with_path_context("create output directory", &self.output_dir)?;
        }

        let path = self.output_dir.join(Self::file_name(document)?);
        self.fs
            .write(&path, &content)
            .with_path_context("write export", &path)?;

        info!(path = %path.display(), bytes = content.len(), "export written");
        Ok(path)
    }
}
