//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file from the working directory, if present
//! 2. Attempts to load from environment variables
//! 3. If `DAGPLANNER_DB_PATH` is unset, falls back to a config file
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `DAGPLANNER_DB_PATH`: Database file path (required for env loading)
//! - `DAGPLANNER_DB_POOL_SIZE`: Connection pool size
//! - `DAGPLANNER_DB_BUSY_TIMEOUT_MS`: SQLite busy timeout in milliseconds
//! - `DAGPLANNER_SYNC_ENABLED`: Whether background sync runs (true/false)
//! - `DAGPLANNER_SYNC_CRON`: Six-field cron expression for background sync
//! - `DAGPLANNER_SYNC_TIME_ZONE`: IANA zone for provider timestamps
//! - `DAGPLANNER_LOG_FILTER`: Tracing filter directives
//! - `DAGPLANNER_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./dagplanner.toml` or `./dagplanner.json`
//! 2. `./config.toml` or `./config.json`
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use dagplanner_domain::{Config, DagPlannerError, Result};

const FILE_NAMES: &[&str] = &["dagplanner.toml", "dagplanner.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `DagPlannerError::Config` if configuration cannot be loaded from
/// either source or is malformed.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables (after reading `.env`)
///
/// # Errors
/// Returns `DagPlannerError::Config` if `DAGPLANNER_DB_PATH` is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    dotenvy::dotenv().ok();
    load_from_env_with(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup
///
/// Unset optional variables keep their defaults.
///
/// # Errors
/// See [`load_from_env`].
pub fn load_from_env_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::default();

    config.database.path = lookup("DAGPLANNER_DB_PATH")
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| DagPlannerError::Config("DAGPLANNER_DB_PATH is not set".to_string()))?;

    if let Some(size) = parsed(&lookup, "DAGPLANNER_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }
    if let Some(timeout) = parsed(&lookup, "DAGPLANNER_DB_BUSY_TIMEOUT_MS")? {
        config.database.busy_timeout_ms = timeout;
    }
    if let Some(enabled) = flag(&lookup, "DAGPLANNER_SYNC_ENABLED")? {
        config.sync.enabled = enabled;
    }
    if let Some(cron) = lookup("DAGPLANNER_SYNC_CRON") {
        config.sync.cron_expression = cron;
    }
    if let Some(zone) = lookup("DAGPLANNER_SYNC_TIME_ZONE") {
        config.sync.time_zone = zone;
    }
    if let Some(filter) = lookup("DAGPLANNER_LOG_FILTER") {
        config.logging.filter = filter;
    }
    if let Some(json) = flag(&lookup, "DAGPLANNER_LOG_JSON")? {
        config.logging.json = json;
    }

    config.validate()?;
    Ok(config)
}

fn parsed<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| DagPlannerError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

fn flag<F>(lookup: &F, key: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(DagPlannerError::Config(format!("Invalid {key}: {other}"))),
        })
        .transpose()
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `DagPlannerError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DagPlannerError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DagPlannerError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DagPlannerError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration, detecting the format by file extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let config: Config = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DagPlannerError::Config(format!("Invalid TOML format: {e}")))?,
        "json" => serde_json::from_str(contents)
            .map_err(|e| DagPlannerError::Config(format!("Invalid JSON format: {e}")))?,
        _ => {
            return Err(DagPlannerError::Config(format!(
                "Unsupported config format: {extension}"
            )))
        }
    };

    config.validate()?;
    Ok(config)
}

/// Probe the standard locations for a configuration file
///
/// Returns the first file that exists, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}
