//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/nl2sql-console/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/nl2sql-console/` (~/.config/nl2sql-console/)
//! - State/Logs: `$XDG_STATE_HOME/nl2sql-console/` (~/.local/state/nl2sql-console/)
//!
//! The `NL2SQL_API_URL` environment variable overrides the configured base
//! URL; it is the only environment override the console honors.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Log stream configuration
    #[serde(default)]
    pub stream: StreamConfig,

    /// Fallbacks for CLI arguments
    #[serde(default)]
    pub defaults: Defaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the nl2sql service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Row cap passed through to execute calls
    #[serde(default = "default_row_limit")]
    pub row_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            row_limit: default_row_limit(),
        }
    }
}

impl ApiConfig {
    /// Resolved base URL with the `NL2SQL_API_URL` override applied and any
    /// trailing slash trimmed.
    pub fn resolved_base_url(&self) -> String {
        std::env::var("NL2SQL_API_URL")
            .unwrap_or_else(|_| self.base_url.clone())
            .trim_end_matches('/')
            .to_string()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url must not be empty".to_string()));
        }
        if self.row_limit == 0 {
            return Err(Error::Config("api.row_limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_row_limit() -> u32 {
    100
}

/// Log stream configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Number of log lines retained per run (oldest discarded first)
    #[serde(default = "default_retention")]
    pub retention: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
        }
    }
}

fn default_retention() -> usize {
    200
}

/// Fallbacks for the `--deployment` and `--connector` CLI arguments
#[derive(Debug, Deserialize, Default)]
pub struct Defaults {
    /// Deployment label to plan against
    pub deployment: Option<String>,
    /// Connector identifier to plan and execute against
    pub connector: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
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

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/nl2sql-console/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("nl2sql-console").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/nl2sql-console/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("nl2sql-console")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/nl2sql-console/nl2sql-console.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("nl2sql-console.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8001");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.row_limit, 100);
        assert_eq!(config.stream.retention, 200);
        assert!(config.defaults.deployment.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[api]
base_url = "https://nl2sql.internal.example.com/"
row_limit = 50

[stream]
retention = 500

[defaults]
deployment = "prod"
connector = "orders_db"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.api.base_url, "https://nl2sql.internal.example.com/");
        assert_eq!(config.api.row_limit, 50);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.stream.retention, 500);
        assert_eq!(config.defaults.deployment.as_deref(), Some("prod"));
        assert_eq!(config.defaults.connector.as_deref(), Some("orders_db"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_api_config_validation() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());

        let config = ApiConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ApiConfig {
            row_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolved_base_url_trims_trailing_slash() {
        let config = ApiConfig {
            base_url: "http://localhost:8001/".to_string(),
            ..Default::default()
        };
        // Only meaningful when the env override is unset, which is the
        // normal test environment.
        if std::env::var("NL2SQL_API_URL").is_err() {
            assert_eq!(config.resolved_base_url(), "http://localhost:8001");
        }
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nbase_url = \"http://example:9\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "http://example:9");
    }
}
