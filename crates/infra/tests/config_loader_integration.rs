//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;
use std::path::PathBuf;

use dagplanner_domain::{Config, DagPlannerError};
use dagplanner_infra::config;
use tempfile::{NamedTempFile, TempDir};

fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create config file");
    file.write_all(contents.as_bytes()).expect("Failed to write config file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "dagplanner.json",
        r#"{
            "database": { "path": "/tmp/integration_test.db", "pool_size": 10 },
            "sync": { "enabled": false, "lookahead_months": 6, "time_zone": "Europe/Berlin" },
            "logging": { "filter": "dagplanner_infra=debug", "json": true }
        }"#,
    );

    let config = config::load_from_file(Some(path)).expect("Failed to load config from JSON file");

    assert_eq!(config.database.path, "/tmp/integration_test.db");
    assert_eq!(config.database.pool_size, 10);
    assert_eq!(config.database.busy_timeout_ms, 5000);
    assert!(!config.sync.enabled);
    assert_eq!(config.sync.lookahead_months, 6);
    assert_eq!(config.sync.lookback_months, 1);
    assert_eq!(config.sync.time_zone, "Europe/Berlin");
    assert_eq!(config.logging.filter, "dagplanner_infra=debug");
    assert!(config.logging.json);
}

#[test]
fn test_load_config_from_toml_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "dagplanner.toml",
        r#"
[database]
path = "/var/lib/dagplanner/calendar.db"
busy_timeout_ms = 250
enable_wal = false

[sync]
cron_expression = "0 0 * * * *"
job_timeout_secs = 60
"#,
    );

    let config = config::load_from_file(Some(path)).expect("Failed to load config from TOML file");

    assert_eq!(config.database.path, "/var/lib/dagplanner/calendar.db");
    assert_eq!(config.database.busy_timeout_ms, 250);
    assert!(!config.database.enable_wal);
    assert_eq!(config.sync.cron_expression, "0 0 * * * *");
    assert_eq!(config.sync.job_timeout_secs, 60);
    assert_eq!(config.logging, Config::default().logging);
}

#[test]
fn test_load_config_with_minimal_fields() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "config.json", "{}");

    let config = config::load_from_file(Some(path)).expect("Empty object should load");

    assert_eq!(config, Config::default());
}

#[test]
fn test_load_config_from_nonexistent_file() {
    let result = config::load_from_file(Some(PathBuf::from("/nonexistent/dagplanner.toml")));

    assert!(matches!(result, Err(DagPlannerError::Config(ref m)) if m.contains("not found")));
}

#[test]
fn test_load_config_with_invalid_format() {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(b"{ this is not json").expect("Failed to write to temp file");
    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));

    assert!(matches!(result, Err(DagPlannerError::Config(ref m)) if m.contains("Invalid JSON")));
    std::fs::remove_file(path).ok();
}

#[test]
fn test_env_loading_then_tracing_init() {
    let vars = [("DAGPLANNER_DB_PATH", "cache.db"), ("DAGPLANNER_LOG_FILTER", "warn")];
    let config = config::load_from_env_with(|key| {
        vars.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v).to_string())
    })
    .expect("Env config should load");

    assert_eq!(config.database.path, "cache.db");
    assert_eq!(config.logging.filter, "warn");
    // Another test binary may already have installed a subscriber.
    dagplanner_infra::init_tracing(&config.logging).expect("Valid filter should initialise");
}
