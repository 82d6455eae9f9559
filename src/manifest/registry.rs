//! Manifest and CORE set types

use crate::error::{ShellcacheError, ShellcacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Logical key of the navigation entry point
pub const ROOT_KEY: &str = "/";

/// Mapping of logical resource path to content fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest(BTreeMap<String, String>);

impl ResourceManifest {
    /// Build a manifest from (path, fingerprint) pairs
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Fingerprint recorded for a path
    pub fn fingerprint(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether the path is a manifest key
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// All manifest keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `key` is still current in `self` relative to `previous`.
    ///
    /// A key is current only when both manifests list it with the same
    /// fingerprint.
    pub fn is_unchanged_since(&self, previous: &ResourceManifest, key: &str) -> bool {
        match (self.fingerprint(key), previous.fingerprint(key)) {
            (Some(new), Some(old)) => new == old,
            _ => false,
        }
    }

    fn validate(&self) -> ShellcacheResult<()> {
        if let Some(fingerprint) = self.0.get("") {
            return Err(ShellcacheError::ManifestInvalid(format!(
                "empty resource path (fingerprint {})",
                fingerprint
            )));
        }
        if let Some((key, _)) = self.0.iter().find(|(_, v)| v.is_empty()) {
            return Err(ShellcacheError::ManifestInvalid(format!(
                "resource {} has an empty fingerprint",
                key
            )));
        }
        Ok(())
    }
}

/// Ordered list of resource paths required before first render
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoreSet(Vec<String>);

impl CoreSet {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Immutable manifest plus CORE subset, as shipped by the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRegistry {
    resources: ResourceManifest,
    core: CoreSet,
}

impl ManifestRegistry {
    /// Create a registry, checking that every CORE path is a manifest key
    pub fn new(resources: ResourceManifest, core: CoreSet) -> ShellcacheResult<Self> {
        resources.validate()?;
        if let Some(missing) = core.iter().find(|path| !resources.contains(path)) {
            return Err(ShellcacheError::CoreNotInManifest(missing.to_string()));
        }
        Ok(Self { resources, core })
    }

    /// Parse an asset bundle from its JSON text
    pub fn parse(content: &str) -> ShellcacheResult<Self> {
        let raw: ManifestRegistry = serde_json::from_str(content)?;
        Self::new(raw.resources, raw.core)
    }

    /// Load an asset bundle from disk
    pub async fn from_file(path: &Path) -> ShellcacheResult<Self> {
        if !path.exists() {
            return Err(ShellcacheError::PathNotFound(path.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ShellcacheError::io(format!("reading asset bundle {}", path.display()), e)
        })?;
        let registry = Self::parse(&content)?;

        debug!(
            "Loaded asset bundle {} ({} resources, {} core)",
            path.display(),
            registry.resources.len(),
            registry.core.len()
        );
        Ok(registry)
    }

    pub fn resources(&self) -> &ResourceManifest {
        &self.resources
    }

    pub fn core(&self) -> &CoreSet {
        &self.core
    }
}
