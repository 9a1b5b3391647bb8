//! Centralized console configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `CONSOLE`, nested with `__`:
//!
//! ```text
//! CONSOLE__API__BASE_URL=https://api.example.com/api
//! CONSOLE__SESSION__DEFAULT_SUBDOMAIN=acme
//! CONSOLE__STORAGE_PATH=/var/lib/console/state.json
//! ```

use crate::error::ConsoleError;
use affiliate_console_access::{GuardConfig, SessionConfig};
use affiliate_console_http::HttpClientConfig;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::path::PathBuf;

/// Console configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Backend API connection.
    #[serde(default)]
    pub api: HttpClientConfig,

    /// Session store settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Guard routes.
    #[serde(default)]
    pub guard: GuardConfig,

    /// File holding the persisted credential.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Tracing filter installed by `Console::bootstrap` when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".affiliate-console/state.json")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api: HttpClientConfig::default(),
            session: SessionConfig::default(),
            guard: GuardConfig::default(),
            storage_path: default_storage_path(),
            log_filter: default_log_filter(),
        }
    }
}

impl ConsoleConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, Report<ConsoleError>> {
        Self::from_source(environment())
    }

    fn from_source(source: config::Environment) -> Result<Self, Report<ConsoleError>> {
        let loaded = config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| ConsoleError::Config {
                details: e.to_string(),
            })?;
        Ok(loaded)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("CONSOLE")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use affiliate_console_core::Subdomain;

    fn load(vars: &[(&str, &str)]) -> Result<ConsoleConfig, Report<ConsoleError>> {
        let map = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ConsoleConfig::from_source(environment().source(Some(map)))
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).expect("load");
        assert_eq!(config.api, HttpClientConfig::default());
        assert_eq!(config.session.expiry_window_seconds, 300);
        assert_eq!(config.guard, GuardConfig::default());
        assert_eq!(config.storage_path, default_storage_path());
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn nested_variables_override_defaults() {
        let config = load(&[
            ("CONSOLE__API__BASE_URL", "https://api.example.com/api"),
            ("CONSOLE__API__TIMEOUT_SECONDS", "10"),
            ("CONSOLE__SESSION__DEFAULT_SUBDOMAIN", "acme"),
            ("CONSOLE__GUARD__LANDING_ROUTE", "/home"),
            ("CONSOLE__LOG_FILTER", "debug"),
        ])
        .expect("load");

        assert_eq!(config.api.base_url, "https://api.example.com/api");
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.session.default_subdomain, Some(Subdomain::new("acme")));
        assert_eq!(config.guard.landing_route, "/home");
        assert_eq!(config.guard.login_route, "/login");
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn invalid_value_is_config_error() {
        let err = load(&[("CONSOLE__API__TIMEOUT_SECONDS", "soon")]).expect_err("invalid");
        assert!(err.to_string().contains("failed to load configuration"));
    }
}
