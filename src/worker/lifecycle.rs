//! Install and activate transitions
//!
//! Activation reconciles CONTENT against the previously committed manifest:
//! entries whose fingerprint is unchanged survive, everything else is
//! evicted, and the freshly staged CORE responses are merged on top. Any
//! failure wipes all three stores so the next activation starts clean.

use super::Worker;
use crate::error::ShellcacheResult;
use crate::manifest::{PersistedManifestRecord, ResourceManifest};
use crate::net::{add_all, CacheMode, Request};
use crate::store::{copy_entries, CacheStore};
use tracing::{debug, error, info, warn};

/// Result of an activation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivateOutcome {
    /// CONTENT reconciled and the new manifest committed
    Activated(ActivationReport),
    /// Reconciliation failed; CONTENT, TEMP and MANIFEST-META were deleted
    Reset { reason: String },
}

/// What a successful activation did to CONTENT
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// No previous manifest was found, CONTENT was rebuilt from TEMP
    pub first_activation: bool,
    /// Entries kept because their fingerprint did not change
    pub retained: usize,
    /// Logical keys (or foreign URLs) evicted from CONTENT
    pub evicted: Vec<String>,
    /// Entries merged from TEMP
    pub staged: usize,
}

impl Worker {
    /// Stage the CORE set into TEMP.
    ///
    /// Requests early activation first. Every CORE path is fetched with
    /// forced revalidation; if any fetch fails nothing is left in TEMP.
    pub async fn install(&self) -> ShellcacheResult<usize> {
        self.host.skip_waiting().await;

        let temp_name = &self.config.caches.temp;
        // TEMP holds exactly this generation's CORE set
        self.storage.delete(temp_name).await?;
        let temp = self.open_temp().await?;

        let requests: Vec<Request> = self
            .config
            .registry
            .core()
            .iter()
            .map(|path| {
                Request::get(self.config.origin.url_for(path)).with_cache_mode(CacheMode::Reload)
            })
            .collect();

        match add_all(&*temp, &*self.fetcher, requests).await {
            Ok(staged) => {
                info!(
                    "Generation {} staged {} core resources",
                    self.generation, staged
                );
                Ok(staged)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(temp_name).await {
                    warn!("Failed to discard partial install staging: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    /// Reconcile CONTENT with the new manifest, resetting every store on failure
    pub async fn activate(&self) -> ActivateOutcome {
        match self.reconcile().await {
            Ok(report) => {
                self.host.claim_clients().await;
                info!(
                    "Generation {} activated: {} retained, {} evicted, {} staged",
                    self.generation,
                    report.retained,
                    report.evicted.len(),
                    report.staged
                );
                ActivateOutcome::Activated(report)
            }
            Err(e) => {
                error!("Failed to upgrade worker generation {}: {}", self.generation, e);
                self.reset_stores().await;
                ActivateOutcome::Reset {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn reconcile(&self) -> ShellcacheResult<ActivationReport> {
        let caches = &self.config.caches;
        let mut content = self.open_content().await?;
        let temp = self.open_temp().await?;
        let meta = self.open_manifest_meta().await?;
        let new = self.config.manifest();

        let mut report = ActivationReport::default();
        match PersistedManifestRecord::load(&*meta).await? {
            None => {
                debug!("No previous manifest, rebuilding {}", caches.content);
                self.storage.delete(&caches.content).await?;
                content = self.open_content().await?;
                report.first_activation = true;
            }
            Some(record) => {
                let (retained, evicted) = self.evict_stale(&*content, &record.manifest).await?;
                report.retained = retained;
                report.evicted = evicted;
            }
        }

        report.staged = copy_entries(&*temp, &*content).await?;
        self.storage.delete(&caches.temp).await?;
        PersistedManifestRecord::new(new.clone())
            .save(&*meta)
            .await?;

        Ok(report)
    }

    /// Delete every CONTENT entry that is not current under the new manifest
    async fn evict_stale(
        &self,
        content: &dyn CacheStore,
        old: &ResourceManifest,
    ) -> ShellcacheResult<(usize, Vec<String>)> {
        let new = self.config.manifest();
        let mut retained = 0;
        let mut evicted = Vec::new();

        for url in content.keys().await? {
            let key = self.config.origin.resource_key(&url);
            let keep = key
                .as_deref()
                .is_some_and(|key| new.is_unchanged_since(old, key));

            if keep {
                retained += 1;
            } else {
                content.delete(&url).await?;
                debug!("Evicted {}", url);
                evicted.push(key.unwrap_or(url));
            }
        }

        Ok((retained, evicted))
    }

    /// Delete CONTENT, TEMP and MANIFEST-META, continuing past failures
    async fn reset_stores(&self) {
        for name in self.config.caches.all() {
            if let Err(e) = self.storage.delete(name).await {
                warn!("Failed to delete {} during reset: {}", name, e);
            }
        }
    }
}
