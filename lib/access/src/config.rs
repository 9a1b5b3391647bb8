//! Session and guard configuration.
//!
//! Fields with defaults can be omitted when loading from environment
//! variables.

use affiliate_console_core::Subdomain;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// A persisted credential expiring within this many seconds is discarded
    /// at bootstrap instead of being restored.
    #[serde(default = "default_expiry_window_seconds")]
    pub expiry_window_seconds: i64,

    /// Tenant used when a login request names none.
    #[serde(default)]
    pub default_subdomain: Option<Subdomain>,
}

fn default_expiry_window_seconds() -> i64 {
    300
}

impl SessionConfig {
    /// Returns the bootstrap expiry safety window.
    ///
    /// Negative values clamp to zero; values too large for a `Duration`
    /// saturate.
    #[must_use]
    pub fn expiry_window(&self) -> Duration {
        Duration::try_seconds(self.expiry_window_seconds.max(0)).unwrap_or(Duration::MAX)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_window_seconds: default_expiry_window_seconds(),
            default_subdomain: None,
        }
    }
}

/// Routes the access guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Public entry route for unauthenticated visitors.
    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// Authenticated landing route for authorization denials.
    #[serde(default = "default_landing_route")]
    pub landing_route: String,

    /// Query parameter carrying the originally requested location.
    #[serde(default = "default_return_param")]
    pub return_param: String,
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_landing_route() -> String {
    "/dashboard".to_string()
}

fn default_return_param() -> String {
    "redirect".to_string()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_route: default_login_route(),
            landing_route: default_landing_route(),
            return_param: default_return_param(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.expiry_window_seconds, 300);
        assert_eq!(config.expiry_window(), Duration::minutes(5));
        assert!(config.default_subdomain.is_none());
    }

    #[test]
    fn negative_window_is_clamped() {
        let config = SessionConfig {
            expiry_window_seconds: -5,
            ..SessionConfig::default()
        };
        assert_eq!(config.expiry_window(), Duration::zero());
    }

    #[test]
    fn oversized_window_saturates() {
        let config = SessionConfig {
            expiry_window_seconds: i64::MAX,
            ..SessionConfig::default()
        };
        assert_eq!(config.expiry_window(), Duration::MAX);
    }

    #[test]
    fn guard_config_fills_missing_fields() {
        let config: GuardConfig =
            serde_json::from_str(r#"{"landing_route": "/home"}"#).expect("deserialize");
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.landing_route, "/home");
        assert_eq!(config.return_param, "redirect");
    }
}
