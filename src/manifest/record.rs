//! Persisted record of the last applied manifest

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::manifest::ResourceManifest;
use crate::net::Response;
use crate::store::CacheStore;

/// Fixed key of the single record in the MANIFEST-META store
pub const MANIFEST_RECORD_KEY: &str = "manifest";

/// The manifest most recently committed by a successful activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedManifestRecord {
    pub manifest: ResourceManifest,
}

impl PersistedManifestRecord {
    pub fn new(manifest: ResourceManifest) -> Self {
        Self { manifest }
    }

    /// Encode as a JSON response payload
    pub fn to_response(&self) -> ShellcacheResult<Response> {
        let body = serde_json::to_vec(&self.manifest)?;
        Ok(Response::new(MANIFEST_RECORD_KEY, 200, body)
            .with_header("Content-Type", "application/json"))
    }

    /// Decode from a stored payload
    pub fn from_response(response: &Response) -> ShellcacheResult<Self> {
        let manifest = serde_json::from_slice(&response.body).map_err(|e| {
            ShellcacheError::ManifestInvalid(format!("persisted manifest record: {}", e))
        })?;
        Ok(Self { manifest })
    }

    /// Read the record, `None` if nothing was ever committed
    pub async fn load(store: &dyn CacheStore) -> ShellcacheResult<Option<Self>> {
        match store.lookup(MANIFEST_RECORD_KEY).await? {
            Some(response) => Self::from_response(&response).map(Some),
            None => Ok(None),
        }
    }

    /// Replace the record
    pub async fn save(&self, store: &dyn CacheStore) -> ShellcacheResult<()> {
        store.put(MANIFEST_RECORD_KEY, self.to_response()?).await
    }
}
