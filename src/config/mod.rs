//! Configuration management for shellcache

pub mod schema;

pub use schema::{CacheNames, Config, StorageBackend};

use crate::error::{ShellcacheError, ShellcacheResult};
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
            .join("shellcache")
            .join("config.toml")
    }

    /// Get the default storage root for the disk backend
    pub fn default_storage_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellcache")
            .join("caches")
    }

    /// Storage root configured in `config`, or the default
    pub fn storage_dir(config: &schema::Config) -> PathBuf {
        config
            .storage
            .dir
            .clone()
            .unwrap_or_else(Self::default_storage_dir)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> ShellcacheResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ShellcacheResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            ShellcacheError::io(format!("reading config from {}", path.display()), e)
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|e| ShellcacheError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        config
            .caches
            .validate()
            .map_err(|e| ShellcacheError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        // Relative bundle/storage paths are relative to the config file
        if let Some(base) = path.parent() {
            config.worker.bundle = config.worker.bundle.map(|p| absolutize(base, p));
            config.storage.dir = config.storage.dir.map(|p| absolutize(base, p));
        }

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> ShellcacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ShellcacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> ShellcacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellcacheError::ConfigDirCreate {
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

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
