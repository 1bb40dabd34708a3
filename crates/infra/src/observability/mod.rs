//! Logging setup
//!
//! Installs the global `tracing` subscriber. Filter directives come from
//! `RUST_LOG` when set, otherwise from [`LoggingConfig::filter`].

use dagplanner_domain::{DagPlannerError, LoggingConfig, Result};
use tracing_subscriber::EnvFilter;

/// Build the filter for `config`, honouring `RUST_LOG` first.
///
/// # Errors
/// Returns `DagPlannerError::Config` if the configured directives don't parse.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| {
            DagPlannerError::Config(format!("Invalid log filter '{}': {e}", config.filter))
        }),
    }
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, so repeated
/// calls (tests, embedding hosts) are harmless.
///
/// # Errors
/// Returns `DagPlannerError::Config` for an invalid filter.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(filter = %config.filter, json = config.json, "tracing initialised");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directives_are_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig { filter: "dagplanner=[".to_string(), json: false };
        assert_eq!(env_filter(&config).unwrap_err().label(), "config");
    }

    #[test]
    fn second_initialisation_is_a_no_op() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config).unwrap();
        assert!(!init_tracing(&config).unwrap());
    }
}
