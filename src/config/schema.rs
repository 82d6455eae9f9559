//! Configuration schema for shellcache
//!
//! Configuration is stored at `~/.config/shellcache/config.toml`

use crate::error::{ShellcacheError, ShellcacheResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Worker settings
    pub worker: WorkerSettings,

    /// Store backend settings
    pub storage: StorageConfig,

    /// Cache store identities
    pub caches: CacheNames,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Origin the worker is registered for
    pub origin: String,

    /// Asset bundle holding the resource manifest and CORE set
    pub bundle: Option<PathBuf>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            bundle: None,
        }
    }
}

/// Store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Persistent stores under `storage.dir`
    #[default]
    Disk,
    /// Process-lifetime stores (nothing survives the command)
    Memory,
}

/// Store backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to use
    pub backend: StorageBackend,

    /// Storage root for the disk backend
    pub dir: Option<PathBuf>,
}

/// Names of the three cache stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheNames {
    /// Install staging store
    pub temp: String,

    /// Served content store
    pub content: String,

    /// Last applied manifest store
    pub manifest: String,
}

impl Default for CacheNames {
    fn default() -> Self {
        Self {
            temp: "app-temp-cache".to_string(),
            content: "app-cache".to_string(),
            manifest: "app-manifest".to_string(),
        }
    }
}

impl CacheNames {
    /// All three names in reset order
    pub fn all(&self) -> [&str; 3] {
        [
            self.content.as_str(),
            self.temp.as_str(),
            self.manifest.as_str(),
        ]
    }

    /// The three stores must not share a name
    pub fn validate(&self) -> ShellcacheResult<()> {
        let names = self.all();
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                return Err(ShellcacheError::StoreNameReused(name.to_string()));
            }
        }
        Ok(())
    }
}
