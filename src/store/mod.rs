//! Named asynchronous cache stores
//!
//! The worker coordinates its handlers only through stores reached via a
//! [`CacheStorage`]. Three stores are used:
//!
//! | Store | Lifetime | Contents |
//! |-------|----------|----------|
//! | TEMP | one upgrade | CORE responses staged by install |
//! | CONTENT | long-lived | responses served to clients |
//! | MANIFEST-META | long-lived | the last applied manifest, one record |
//!
//! Stores are created lazily by `open` and live until `delete`. Every
//! mutation is idempotent: `put` overwrites, deleting something absent
//! reports `false`.

pub mod disk;
pub mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::Response;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Summary of one stored entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Request identity the entry is stored under
    pub key: String,
    pub status: u16,
    pub size_bytes: u64,
    pub stored_at: DateTime<Utc>,
}

/// One named key-value store of responses
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name
    fn name(&self) -> &str;

    /// Look up the response stored under `key`
    async fn lookup(&self, key: &str) -> ShellcacheResult<Option<Response>>;

    /// Store a response, replacing any existing entry
    async fn put(&self, key: &str, response: Response) -> ShellcacheResult<()>;

    /// Remove an entry, returning whether it existed
    async fn delete(&self, key: &str) -> ShellcacheResult<bool>;

    /// Describe every entry, ordered by key
    async fn entries(&self) -> ShellcacheResult<Vec<EntryInfo>>;

    /// Every key, ordered
    async fn keys(&self) -> ShellcacheResult<Vec<String>> {
        Ok(self.entries().await?.into_iter().map(|e| e.key).collect())
    }
}

/// Factory and registry of named stores
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if it does not exist
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn CacheStore>>;

    /// Whether a store with this name exists
    async fn has(&self, name: &str) -> ShellcacheResult<bool>;

    /// Delete a store and everything in it, returning whether it existed.
    ///
    /// Handles opened before the delete stay detached: they read as empty
    /// and their writes fail. Reopening the name yields a new, empty store.
    async fn delete(&self, name: &str) -> ShellcacheResult<bool>;

    /// Names of all existing stores
    async fn names(&self) -> ShellcacheResult<Vec<String>>;
}

/// Store names become directory names on disk, so keep them plain
pub(crate) fn validate_store_name(name: &str) -> ShellcacheResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ShellcacheError::StoreNameInvalid(name.to_string()))
    }
}

/// Copy every entry of `from` into `to`, overwriting existing keys
pub async fn copy_entries(from: &dyn CacheStore, to: &dyn CacheStore) -> ShellcacheResult<usize> {
    let mut copied = 0;
    for key in from.keys().await? {
        // Entry vanished between listing and reading
        let Some(response) = from.lookup(&key).await? else {
            continue;
        };
        to.put(&key, response).await?;
        copied += 1;
    }
    Ok(copied)
}
