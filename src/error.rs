//! Error types for shellcache
//!
//! All modules use `ShellcacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shellcache operations
pub type ShellcacheResult<T> = Result<T, ShellcacheError>;

/// All errors that can occur in shellcache
#[derive(Error, Debug)]
pub enum ShellcacheError {
    // Manifest errors
    #[error("Invalid resource manifest: {0}")]
    ManifestInvalid(String),

    #[error("Core resource is not listed in the manifest: {0}")]
    CoreNotInManifest(String),

    #[error("Asset bundle not configured")]
    BundleNotConfigured,

    // Origin / URL errors
    #[error("Invalid origin '{origin}': {reason}")]
    OriginInvalid { origin: String, reason: String },

    // Network errors
    #[error("Network request failed: {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    // Store errors
    #[error("Cache store {store} failed while {context}")]
    Store {
        store: String,
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache entry in {store}: {reason}")]
    StoreCorrupt { store: String, reason: String },

    #[error("Invalid cache store name: {0}")]
    StoreNameInvalid(String),

    #[error("Cache store name {0} is assigned to more than one store")]
    StoreNameReused(String),

    // Lifecycle errors
    #[error("Activation failed and all caches were reset: {reason}")]
    ActivationReset { reason: String },

    #[error("No installed worker generation is waiting to activate")]
    NothingWaiting,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl ShellcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a store error with context
    pub fn store(
        store: impl Into<String>,
        context: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Store {
            store: store.into(),
            context: context.into(),
            source,
        }
    }

    /// Create a network error
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::HttpStatus { .. } | Self::ActivationReset { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::BundleNotConfigured => {
                Some("Run: shellcache config set worker.bundle <path>")
            }
            Self::Network { .. } => Some("Check that the origin is reachable: shellcache config show"),
            Self::ActivationReset { .. } => Some("Run: shellcache update"),
            Self::NothingWaiting => Some("Run: shellcache update"),
            Self::StoreNameReused(_) => {
                Some("Give caches.temp, caches.content and caches.manifest different names")
            }
            _ => None,
        }
    }
}
