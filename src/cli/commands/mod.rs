//! CLI command implementations
//!
//! Every invocation is a fresh process with a fresh [`Registration`]; the
//! only state carried between commands lives in the cache stores.

pub mod config;
pub mod entries;
pub mod fetch;
pub mod message;
pub mod status;
pub mod update;

pub use config::execute as config;
pub use entries::execute as entries;
pub use fetch::execute as fetch;
pub use message::execute as message;
pub use status::execute as status;
pub use update::execute as update;

use crate::config::{Config, ConfigManager, StorageBackend};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::host::Registration;
use crate::manifest::ManifestRegistry;
use crate::net::{HttpFetcher, Origin};
use crate::store::{CacheStorage, DiskStorage, MemoryStorage};
use crate::worker::{Worker, WorkerConfig};
use std::sync::Arc;
use tracing::debug;

/// Open the configured store backend
pub fn open_storage(config: &Config) -> Arc<dyn CacheStorage> {
    match config.storage.backend {
        StorageBackend::Disk => {
            let root = ConfigManager::storage_dir(config);
            debug!("Using disk storage at {}", root.display());
            Arc::new(DiskStorage::new(root))
        }
        StorageBackend::Memory => {
            debug!("Using in-memory storage");
            Arc::new(MemoryStorage::new())
        }
    }
}

/// Load the bundle's manifest and CORE set
pub async fn load_registry(config: &Config) -> ShellcacheResult<ManifestRegistry> {
    let bundle = config
        .worker
        .bundle
        .as_deref()
        .ok_or(ShellcacheError::BundleNotConfigured)?;
    ManifestRegistry::from_file(bundle).await
}

/// A worker generation for the configured bundle, hosted by a new registration
pub async fn load_worker(config: &Config) -> ShellcacheResult<(Worker, Arc<Registration>)> {
    let worker_config = WorkerConfig {
        origin: Origin::parse(&config.worker.origin)?,
        registry: load_registry(config).await?,
        caches: config.caches.clone(),
    };

    let registration = Arc::new(Registration::new());
    let worker = Worker::new(
        worker_config,
        open_storage(config),
        Arc::new(HttpFetcher::new()),
        registration.clone(),
    )?;
    debug!("Created worker generation {}", worker.generation());

    Ok((worker, registration))
}
