//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge semantics:
//! - Defaults → Local file: fields the file specifies win, the rest inherit
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Environment variables are process-global: tests that load settings hold
//! `ENV_LOCK` so the env override test cannot leak into them.

use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use tempfile::TempDir;

use catex::application::ApplicationError;
use catex::config::Settings;
use catex::domain::{DomainGrouping, ExportMethod};

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn given_local_file_when_load_then_overrides_defaults_field_by_field() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catex.toml");
    fs::write(
        &path,
        r#"
[catalog]
url = "https://catalog.example.com"
username = "exporter"

[export]
page_size = 250
grouping = "name"
include_relations = true
include_assets = false
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    assert_eq!(settings.catalog.url, "https://catalog.example.com");
    assert_eq!(settings.catalog.username.as_deref(), Some("exporter"));
    assert_eq!(settings.catalog.timeout_secs, 30, "unspecified field inherits");
    assert_eq!(settings.export.page_size, 250);
    assert_eq!(settings.export.graph_page_size, 100);
    assert_eq!(settings.export.grouping, DomainGrouping::Name);
    assert!(settings.export.include_relations);
    assert!(settings.export.include_attributes);

    let options = settings.export_options().unwrap();
    assert_eq!(options.page_size, NonZeroUsize::new(250).unwrap());
    assert!(options.include_relations);
    assert!(!options.include_assets);
    assert!(!options.bulk);
}

#[test]
fn given_missing_explicit_file_when_load_then_config_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();

    let result = Settings::load(Some(dir.path().join("absent.toml").as_path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_file_when_load_then_config_error_names_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[export\npage_size = ").unwrap();

    match Settings::load(Some(path.as_path())) {
        Err(ApplicationError::Config { message }) => assert!(message.contains("broken.toml")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn given_env_vars_when_load_then_override_file_values() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catex.toml");
    fs::write(
        &path,
        r#"
[catalog]
url = "https://file.example.com"
password = "from-file"

[export]
method = "graph"
include_inherited = true
"#,
    )
    .unwrap();

    env::set_var("CATEX_CATALOG__URL", "https://env.example.com");
    env::set_var("CATEX_CATALOG__TIMEOUT_SECS", "5");
    env::set_var("CATEX_EXPORT__METHOD", "rest");
    env::set_var("CATEX_EXPORT__INCLUDE_INHERITED", "false");
    env::set_var("CATEX_EXPORT__INCLUDE_ASSETS", "false");

    let loaded = Settings::load(Some(path.as_path()));

    env::set_var("CATEX_EXPORT__METHOD", "soap");
    let invalid = Settings::load(Some(path.as_path()));

    for key in [
        "CATEX_CATALOG__URL",
        "CATEX_CATALOG__TIMEOUT_SECS",
        "CATEX_EXPORT__METHOD",
        "CATEX_EXPORT__INCLUDE_INHERITED",
        "CATEX_EXPORT__INCLUDE_ASSETS",
    ] {
        env::remove_var(key);
    }

    let settings = loaded.expect("load settings");
    assert_eq!(settings.catalog.url, "https://env.example.com");
    assert_eq!(settings.catalog.password.as_deref(), Some("from-file"));
    assert_eq!(settings.catalog.timeout_secs, 5);
    assert_eq!(settings.export.method, ExportMethod::Rest);
    assert!(!settings.export.include_inherited);
    assert!(!settings.export.include_assets);

    assert!(matches!(invalid, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_loaded_settings_when_showing_then_password_never_printed() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catex.toml");
    fs::write(&path, "[catalog]\npassword = \"hunter2\"\n").unwrap();

    let shown = Settings::load(Some(path.as_path())).unwrap().to_toml().unwrap();

    assert!(!shown.contains("hunter2"));
    assert!(shown.contains("[catalog]"));
}
