//! Configuration for the telemetry client
//!
//! `TelemetryConfig` is a plain serde section with per-field defaults so a
//! host application can embed it in its own TOML config file. Hosts that
//! don't carry a config file get the production defaults plus the
//! `TELEMETRY_SERVER` environment override via [`TelemetryConfig::from_env`].
//!
//! Path helpers follow the XDG Base Directory Specification:
//! - Identity store: `$XDG_CONFIG_HOME/<app_id>/` (~/.config/<app_id>/)
//! - Logs: `$XDG_STATE_HOME/<app_id>/` (~/.local/state/<app_id>/)

use serde::Deserialize;
use std::path::PathBuf;

/// Production Xavier collection endpoint.
pub const DEFAULT_SERVER_URL: &str = "https://xavier.fynelabs.com";

/// Environment variable overriding the collection endpoint, read once at
/// session initialization.
pub const SERVER_ENV: &str = "TELEMETRY_SERVER";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
pub(crate) fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
pub(crate) fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Telemetry client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Base URL of the collection server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TelemetryConfig {
    /// Defaults plus the `TELEMETRY_SERVER` environment override.
    ///
    /// The environment is read once here; later changes to the variable do
    /// not affect an already initialized session.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(server) = std::env::var(SERVER_ENV) {
            if !server.is_empty() {
                config.server_url = server;
            }
        }
        config
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
server_url = "https://telemetry.example.com"
timeout_secs = 3
"#;
        let config: TelemetryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server_url, "https://telemetry.example.com");
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config: TelemetryConfig = toml::from_str("timeout_secs = 30").unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var(SERVER_ENV, "http://localhost:8123");
        let config = TelemetryConfig::from_env();
        std::env::remove_var(SERVER_ENV);

        assert_eq!(config.server_url, "http://localhost:8123");
    }

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
    }
}
