#![deny(unsafe_code)]

//! Configuration loading and validation for supctl.
//!
//! Loads a TOML file describing where the supervisor daemon's XML-RPC
//! listener lives and how the client should behave. [`AppConfig`] is the
//! only configuration surface; it is passed explicitly to whatever builds a
//! client, never stored in process-wide state.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon endpoint and per-call behaviour.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the daemon listens and how long a single call may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// RPC endpoint, either `http://host:port/path` or `unix:///path/to.sock`.
    #[serde(default = "default_server_url")]
    pub url: String,

    /// Per-call deadline in seconds covering connect, call, and release.
    /// Zero disables the deadline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// The per-call deadline, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:9001/RPC2".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
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

/// URL schemes the client knows how to open a session on.
pub const SUPPORTED_SCHEMES: [&str; 2] = ["http://", "unix://"];

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), url = %config.server.url, "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server.url.as_str();
        if url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.url must not be empty".to_string(),
            ));
        }
        if url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "server.url: https is not supported, use http:// or unix://".to_string(),
            ));
        }
        if !SUPPORTED_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
            return Err(ConfigError::Validation(format!(
                "server.url must start with one of {:?}, got {:?}",
                SUPPORTED_SCHEMES, self.server.url
            )));
        }
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                VALID_LOG_LEVELS, self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.url, "http://127.0.0.1:9001/RPC2");
        assert_eq!(config.server.timeout_secs, 120);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.server.url, "http://127.0.0.1:9001/RPC2");
        assert_eq!(config.server.timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [server]
            url = "unix:///var/run/supervisor.sock"
            timeout_secs = 5

            [logging]
            level = "debug"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.server.url, "unix:///var/run/supervisor.sock");
        assert_eq!(config.server.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let toml = r#"
            [server]
            timeout_secs = 0
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.server.timeout(), None);
    }

    #[test]
    fn test_validation_rejects_empty_url() {
        let toml = r#"
            [server]
            url = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_https() {
        let toml = r#"
            [server]
            url = "https://supervisor.example.com/RPC2"
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("https is not supported"));
    }

    #[test]
    fn test_validation_rejects_unknown_scheme() {
        let toml = r#"
            [server]
            url = "ftp://127.0.0.1:9001"
        "#;
        assert!(matches!(
            AppConfig::parse(toml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validation_rejects_padded_url() {
        let mut config = AppConfig::default();
        config.server.url = " http://127.0.0.1:9001/RPC2".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let toml = r#"
            [logging]
            level = "verbose"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = AppConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("timeout_secs = 120"));
        let reparsed = AppConfig::parse(&rendered).unwrap();
        assert_eq!(reparsed.server.url, config.server.url);
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("supctl.toml");
        tokio::fs::write(
            &path,
            b"[server]\nurl = \"http://10.0.0.7:9001/RPC2\"\ntimeout_secs = 30\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.server.url, "http://10.0.0.7:9001/RPC2");
        assert_eq!(config.server.timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/file.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[")
            .await
            .unwrap();

        let result = AppConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
