//! Configuration builders and temporary config files for tests.

use std::path::{Path, PathBuf};

use supctl_config::AppConfig;
use tempfile::TempDir;

/// Fluent builder for [`AppConfig`] in tests.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .server_url(&daemon.url())
///     .timeout_secs(2)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn server_url(mut self, url: &str) -> Self {
        self.config.server.url = url.to_string();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.server.timeout_secs = secs;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A config file in a temp directory that is removed on drop.
pub struct TestConfigFile {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TestConfigFile {
    /// Write `toml_content` to a fresh `supctl.toml`.
    pub async fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("supctl.toml");
        tokio::fs::write(&path, toml_content)
            .await
            .expect("failed to write test config");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Serialize `config` into a fresh `supctl.toml`.
    pub async fn from_config(config: &AppConfig) -> Self {
        let content = toml::to_string(config).expect("failed to serialize test config");
        Self::with_toml(&content).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file back through the real config loader.
    pub async fn load(&self) -> AppConfig {
        AppConfig::load(&self.path)
            .await
            .expect("failed to parse test config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = TestConfigBuilder::new()
            .server_url("unix:///tmp/supervisor.sock")
            .timeout_secs(3)
            .log_level("debug")
            .build();
        assert_eq!(config.server.url, "unix:///tmp/supervisor.sock");
        assert_eq!(config.server.timeout_secs, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[tokio::test]
    async fn test_config_file_round_trips_through_loader() {
        let config = TestConfigBuilder::new()
            .server_url("http://127.0.0.1:9101/RPC2")
            .timeout_secs(5)
            .build();
        let file = TestConfigFile::from_config(&config).await;
        let loaded = file.load().await;
        assert_eq!(loaded.server.url, "http://127.0.0.1:9101/RPC2");
        assert_eq!(loaded.server.timeout_secs, 5);
    }
}
