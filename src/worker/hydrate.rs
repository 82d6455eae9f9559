//! On-demand offline hydration
//!
//! Backfills CONTENT with every manifest resource it does not hold yet,
//! making the application usable without a network.

use super::Worker;
use crate::error::ShellcacheResult;
use crate::net::{add_all, Request};
use std::collections::HashSet;
use tracing::{debug, info};

/// Result of a hydration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrationReport {
    /// Manifest keys that were missing from CONTENT
    pub missing: Vec<String>,
    /// Entries fetched and stored
    pub fetched: usize,
}

impl Worker {
    /// Manifest keys with no CONTENT entry, in manifest order
    pub async fn missing_resources(&self) -> ShellcacheResult<Vec<String>> {
        let content = self.open_content().await?;
        let origin = &self.config.origin;

        let cached: HashSet<String> = content
            .keys()
            .await?
            .iter()
            .filter_map(|url| origin.resource_key(url))
            .collect();

        Ok(self
            .config
            .manifest()
            .keys()
            .filter(|key| !cached.contains(*key))
            .map(str::to_string)
            .collect())
    }

    /// Fetch every missing manifest resource into CONTENT as one batch
    pub async fn hydrate_offline(&self) -> ShellcacheResult<HydrationReport> {
        let missing = self.missing_resources().await?;
        if missing.is_empty() {
            debug!("Nothing to hydrate");
            return Ok(HydrationReport::default());
        }

        let content = self.open_content().await?;
        let requests = missing
            .iter()
            .map(|key| Request::get(self.config.origin.url_for(key)))
            .collect();
        let fetched = add_all(&*content, &*self.fetcher, requests).await?;

        info!("Hydrated {} resources for offline use", fetched);
        Ok(HydrationReport { missing, fetched })
    }
}
