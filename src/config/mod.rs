//! Configuration management for ihpp

pub mod schema;

pub use schema::Config;

use crate::error::{IhppError, IhppResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ihpp")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ihpp")
    }

    /// Get the default response store path
    pub fn default_store_path() -> PathBuf {
        Self::state_dir().join("responses.db")
    }

    /// Response store path for a loaded configuration
    pub fn store_path(config: &Config) -> PathBuf {
        config
            .cache
            .store_path
            .clone()
            .unwrap_or_else(Self::default_store_path)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> IhppResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> IhppResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| IhppError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| IhppError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        validate(&config).map_err(|reason| IhppError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> IhppResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            IhppError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> IhppResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| IhppError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(config: &Config) -> Result<(), String> {
    match config.general.log_format.as_str() {
        "text" | "json" => {}
        other => {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                other
            ))
        }
    }

    let api_url = &config.server.api_url;
    if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        return Err(format!(
            "server.api_url must start with http:// or https://, got \"{}\"",
            api_url
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.server.api_url, "http://localhost:20000");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.server.api_url = "https://inspector.test".to_string();
        config.cache.store_path = Some(temp.path().join("db.sqlite"));

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.server.api_url, "https://inspector.test");
        assert_eq!(
            ConfigManager::store_path(&loaded),
            temp.path().join("db.sqlite")
        );
    }

    #[tokio::test]
    async fn invalid_toml_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[server\napi_url = 1").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, IhppError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn rejects_unknown_log_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_format = \"xml\"\n").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn store_path_defaults_under_state_dir() {
        let config = Config::default();
        let path = ConfigManager::store_path(&config);
        assert!(path.starts_with(ConfigManager::state_dir()));
        assert!(path.ends_with("responses.db"));
    }
}
