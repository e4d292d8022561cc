//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/catex/catex.toml`
//! 3. Local config: `./catex.toml` or the path given with `--config`
//! 4. Environment variables: `CATEX_*` prefix, `__` between section and key

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::ExportOptions;
use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, DomainGrouping, ExportMethod};

const REDACTED: &str = "********";

/// Connection to the catalog instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL, e.g. `https://acme.example.com`
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

/// Export defaults; CLI flags override them per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportDefaults {
    pub output_dir: PathBuf,
    pub page_size: usize,
    pub graph_page_size: usize,
    pub method: ExportMethod,
    pub grouping: DomainGrouping,
    pub include_subcommunities: bool,
    pub include_assets: bool,
    pub include_attributes: bool,
    pub include_relations: bool,
    pub include_authorizations: bool,
    pub include_inherited: bool,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./exports"),
            page_size: 1000,
            graph_page_size: 100,
            method: ExportMethod::Graph,
            grouping: DomainGrouping::Id,
            include_subcommunities: true,
            include_assets: true,
            include_attributes: true,
            include_relations: false,
            include_authorizations: false,
            include_inherited: true,
        }
    }
}

/// Raw catalog section: `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCatalogConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawExportDefaults {
    pub output_dir: Option<PathBuf>,
    pub page_size: Option<usize>,
    pub graph_page_size: Option<usize>,
    pub method: Option<ExportMethod>,
    pub grouping: Option<DomainGrouping>,
    pub include_subcommunities: Option<bool>,
    pub include_assets: Option<bool>,
    pub include_attributes: Option<bool>,
    pub include_relations: Option<bool>,
    pub include_authorizations: Option<bool>,
    pub include_inherited: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub catalog: RawCatalogConfig,
    pub export: RawExportDefaults,
}

impl CatalogConfig {
    fn merge(&self, overlay: &RawCatalogConfig) -> Self {
        Self {
            url: overlay.url.clone().unwrap_or_else(|| self.url.clone()),
            username: overlay.username.clone().or_else(|| self.username.clone()),
            password: overlay.password.clone().or_else(|| self.password.clone()),
            timeout_secs: overlay.timeout_secs.unwrap_or(self.timeout_secs),
        }
    }
}

impl ExportDefaults {
    fn merge(&self, overlay: &RawExportDefaults) -> Self {
        Self {
            output_dir: overlay
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            page_size: overlay.page_size.unwrap_or(self.page_size),
            graph_page_size: overlay.graph_page_size.unwrap_or(self.graph_page_size),
            method: overlay.method.unwrap_or(self.method),
            grouping: overlay.grouping.unwrap_or(self.grouping),
            include_subcommunities: overlay
                .include_subcommunities
                .unwrap_or(self.include_subcommunities),
            include_assets: overlay.include_assets.unwrap_or(self.include_assets),
            include_attributes: overlay.include_attributes.unwrap_or(self.include_attributes),
            include_relations: overlay.include_relations.unwrap_or(self.include_relations),
            include_authorizations: overlay
                .include_authorizations
                .unwrap_or(self.include_authorizations),
            include_inherited: overlay.include_inherited.unwrap_or(self.include_inherited),
        }
    }
}

/// Unified configuration for catex.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub catalog: CatalogConfig,
    pub export: ExportDefaults,
}

/// Get the XDG config directory for catex.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "catex").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("catex.toml"))
}

/// Get the path to the local config file in the working directory.
pub fn local_config_path() -> PathBuf {
    PathBuf::from("catex.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.export.output_dir.to_string_lossy().as_ref());
        self.export.output_dir = PathBuf::from(expanded);
    }

    /// Overlay a raw layer; fields it specifies win.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            catalog: self.catalog.merge(&overlay.catalog),
            export: self.export.merge(&overlay.export),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Explicit local config file; must exist when given. Without
    ///   it `./catex.toml` is used if present.
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        match local {
            Some(path) => {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
            None => {
                let path = local_config_path();
                if path.exists() {
                    let raw = load_raw_settings(&path)?;
                    current = current.merge_with(&raw);
                }
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        Ok(current)
    }

    /// Apply CATEX_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // config crate only parses the environment here
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("CATEX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("catalog.url") {
            settings.catalog.url = val;
        }
        if let Ok(val) = config.get_string("catalog.username") {
            settings.catalog.username = Some(val);
        }
        if let Ok(val) = config.get_string("catalog.password") {
            settings.catalog.password = Some(val);
        }
        if let Some(val) = get_number(&config, "catalog.timeout_secs")? {
            settings.catalog.timeout_secs = val;
        }
        if let Ok(val) = config.get_string("export.output_dir") {
            settings.export.output_dir = PathBuf::from(val);
        }
        if let Some(val) = get_number(&config, "export.page_size")? {
            settings.export.page_size = val as usize;
        }
        if let Some(val) = get_number(&config, "export.graph_page_size")? {
            settings.export.graph_page_size = val as usize;
        }
        if let Ok(val) = config.get_string("export.method") {
            settings.export.method = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_string("export.grouping") {
            settings.export.grouping = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        let flags = [
            ("export.include_subcommunities", &mut settings.export.include_subcommunities),
            ("export.include_assets", &mut settings.export.include_assets),
            ("export.include_attributes", &mut settings.export.include_attributes),
            ("export.include_relations", &mut settings.export.include_relations),
            ("export.include_authorizations", &mut settings.export.include_authorizations),
            ("export.include_inherited", &mut settings.export.include_inherited),
        ];
        for (key, slot) in flags {
            if config.get_string(key).is_ok() {
                *slot = config.get_bool(key).map_err(config_err)?;
            }
        }

        Ok(settings)
    }

    /// Export options seeded from the configured defaults.
    pub fn export_options(&self) -> Result<ExportOptions, ApplicationError> {
        let page_size = |name: &str, value: usize| {
            NonZeroUsize::new(value).ok_or_else(|| ApplicationError::Config {
                message: format!("export.{name} must be greater than zero"),
            })
        };

        Ok(ExportOptions {
            include_subcommunities: self.export.include_subcommunities,
            include_assets: self.export.include_assets,
            include_attributes: self.export.include_attributes,
            include_relations: self.export.include_relations,
            include_authorizations: self.export.include_authorizations,
            include_inherited: self.export.include_inherited,
            method: self.export.method,
            bulk: false,
            grouping: self.export.grouping,
            page_size: page_size("page_size", self.export.page_size)?,
            graph_page_size: page_size("graph_page_size", self.export.graph_page_size)?,
        })
    }

    /// Show the effective configuration as TOML, password redacted.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        let mut shown = self.clone();
        if shown.catalog.password.is_some() {
            shown.catalog.password = Some(REDACTED.to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# catex configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/catex/catex.toml
#   Local:  ./catex.toml (or --config <path>)
#   Env:    CATEX_* environment variables, e.g. CATEX_CATALOG__PASSWORD

[catalog]
# Base URL of the catalog instance
# url = "https://acme.example.com"
# username = "exporter"
# password = "..."
# timeout_secs = 30

[export]
# Output directory (~ and $VARS are expanded)
# output_dir = "./exports"

# Page sizes for the REST listings and the structured query
# page_size = 1000
# graph_page_size = 100

# Query surface: graph | rest
# method = "graph"

# Fold assets by domain id or by domain name: id | name
# grouping = "id"

# include_subcommunities = true

# false exports communities and domains without their assets
# include_assets = true
# include_attributes = true
# include_relations = false
# include_authorizations = false
# include_inherited = true
"#
        .to_string()
    }
}

/// Integer env override, `None` when the key is not set.
fn get_number(config: &Config, key: &str) -> Result<Option<u64>, ApplicationError> {
    if config.get_string(key).is_err() {
        return Ok(None);
    }
    let value = config.get_int(key).map_err(config_err)?;
    u64::try_from(value)
        .map(Some)
        .map_err(|_| ApplicationError::Config {
            message: format!("{key} must not be negative"),
        })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.catalog.timeout_secs, 30);
        assert_eq!(settings.export.page_size, 1000);
        assert_eq!(settings.export.graph_page_size, 100);
        assert_eq!(settings.export.method, ExportMethod::Graph);
        assert!(settings.export.include_assets);
        assert!(settings.export.include_attributes);
        assert!(!settings.export.include_relations);
    }

    #[test]
    fn given_partial_overlay_when_merging_then_unspecified_fields_inherit() {
        let base = Settings::default();
        let overlay: RawSettings = toml::from_str(
            r#"
[catalog]
url = "https://c.example.com"

[export]
method = "rest"
include_relations = true
"#,
        )
        .expect("parse overlay");

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.catalog.url, "https://c.example.com");
        assert_eq!(merged.catalog.timeout_secs, 30);
        assert_eq!(merged.export.method, ExportMethod::Rest);
        assert!(merged.export.include_relations);
        assert!(merged.export.include_attributes);
    }

    #[test]
    fn given_password_when_showing_then_redacted() {
        let mut settings = Settings::default();
        settings.catalog.password = Some("s3cret".into());

        let shown = settings.to_toml().expect("serialize");

        assert!(!shown.contains("s3cret"));
        assert!(shown.contains(REDACTED));
    }

    #[test]
    fn given_zero_page_size_when_building_options_then_config_error() {
        let mut settings = Settings::default();
        settings.export.page_size = 0;
        assert!(matches!(
            settings.export_options(),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[test]
    fn given_tilde_in_output_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings::default();
        settings.export.output_dir = PathBuf::from("~/exports");

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.export.output_dir.starts_with(&home));
    }

    #[test]
    fn given_template_when_parsed_then_valid_toml() {
        let parsed: Result<RawSettings, _> = toml::from_str(&Settings::template());
        assert!(parsed.is_ok());
    }
}
