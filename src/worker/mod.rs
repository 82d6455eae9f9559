//! The offline cache worker
//!
//! A [`Worker`] is one generation of the background worker. Its handlers
//! (install, activate, fetch, message) share no in-memory state; they
//! coordinate only through the three named stores, so any handler may run
//! in a fresh process after a restart and reach the same result.
//!
//! # Upgrade flow
//!
//! | Step | Store effect |
//! |------|--------------|
//! | install | CORE fetched with forced revalidation into TEMP |
//! | activate | stale CONTENT evicted, TEMP merged, manifest committed |
//! | fetch | CONTENT read, lazily filled on miss |
//! | hydrate | every missing manifest entry fetched into CONTENT |

mod hydrate;
mod intercept;
mod lifecycle;
mod message;

pub use hydrate::HydrationReport;
pub use intercept::{FetchOutcome, ResponseSource};
pub use lifecycle::{ActivateOutcome, ActivationReport};
pub use message::{ControlMessage, MessageOutcome};

use crate::config::CacheNames;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::host::{ExtendableEvent, WorkerHost};
use crate::manifest::{ManifestRegistry, PersistedManifestRecord, ResourceManifest};
use crate::net::{Fetcher, Origin};
use crate::store::{CacheStorage, CacheStore};
use std::sync::Arc;
use uuid::Uuid;

/// Read-only configuration shared by every handler of a generation
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Origin,
    pub registry: ManifestRegistry,
    pub caches: CacheNames,
}

impl WorkerConfig {
    pub fn manifest(&self) -> &ResourceManifest {
        self.registry.resources()
    }
}

/// One worker generation
#[derive(Clone)]
pub struct Worker {
    config: Arc<WorkerConfig>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn WorkerHost>,
    generation: Uuid,
}

impl Worker {
    /// Create a generation; the three store names must be distinct
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
    ) -> ShellcacheResult<Self> {
        config.caches.validate()?;
        Ok(Self {
            config: Arc::new(config),
            storage,
            fetcher,
            host,
            generation: Uuid::new_v4(),
        })
    }

    /// Identifier of this generation, for log correlation
    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Manifest committed by the last successful activation
    pub async fn applied_manifest(&self) -> ShellcacheResult<Option<ResourceManifest>> {
        if !self.storage.has(&self.config.caches.manifest).await? {
            return Ok(None);
        }
        let store = self.open_manifest_meta().await?;
        Ok(PersistedManifestRecord::load(&*store)
            .await?
            .map(|record| record.manifest))
    }

    async fn open_content(&self) -> ShellcacheResult<Arc<dyn CacheStore>> {
        self.storage.open(&self.config.caches.content).await
    }

    async fn open_temp(&self) -> ShellcacheResult<Arc<dyn CacheStore>> {
        self.storage.open(&self.config.caches.temp).await
    }

    async fn open_manifest_meta(&self) -> ShellcacheResult<Arc<dyn CacheStore>> {
        self.storage.open(&self.config.caches.manifest).await
    }

    /// Install event handler
    pub fn on_install(&self, event: &mut ExtendableEvent) {
        let worker = self.clone();
        event.wait_until(async move { worker.install().await.map(|_| ()) });
    }

    /// Activate event handler; a reset settles the event with an error
    pub fn on_activate(&self, event: &mut ExtendableEvent) {
        let worker = self.clone();
        event.wait_until(async move {
            match worker.activate().await {
                ActivateOutcome::Activated(_) => Ok(()),
                ActivateOutcome::Reset { reason } => {
                    Err(ShellcacheError::ActivationReset { reason })
                }
            }
        });
    }

    /// Message event handler
    pub fn on_message(&self, event: &mut ExtendableEvent, data: &str) {
        let worker = self.clone();
        let data = data.to_string();
        event.wait_until(async move { worker.handle_message(&data).await.map(|_| ()) });
    }
}
