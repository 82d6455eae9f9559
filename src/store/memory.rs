//! In-process store backend

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::Response;
use crate::store::{validate_store_name, CacheStorage, CacheStore, EntryInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stores that live as long as the process
///
/// Handles to a deleted store read as empty and reject writes; later opens
/// of the same name get a fresh store.
#[derive(Default)]
pub struct MemoryStorage {
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn CacheStore>> {
        validate_store_name(name)?;
        let mut stores = self.stores.write().await;
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new(name)))
            .clone();
        Ok(store)
    }

    async fn has(&self, name: &str) -> ShellcacheResult<bool> {
        Ok(self.stores.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> ShellcacheResult<bool> {
        let Some(store) = self.stores.write().await.remove(name) else {
            return Ok(false);
        };
        store.deleted.store(true, Ordering::SeqCst);
        store.entries.write().await.clear();
        Ok(true)
    }

    async fn names(&self) -> ShellcacheResult<Vec<String>> {
        let mut names: Vec<String> = self.stores.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// A single in-memory store
pub struct MemoryStore {
    name: String,
    entries: RwLock<BTreeMap<String, (Response, DateTime<Utc>)>>,
    deleted: AtomicBool,
}

impl MemoryStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(BTreeMap::new()),
            deleted: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &str) -> ShellcacheResult<Option<Response>> {
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .map(|(response, _)| response.clone()))
    }

    async fn put(&self, key: &str, response: Response) -> ShellcacheResult<()> {
        let mut entries = self.entries.write().await;
        if self.deleted.load(Ordering::SeqCst) {
            return Err(ShellcacheError::store(
                self.name.clone(),
                format!("writing {}", key),
                std::io::Error::new(ErrorKind::NotFound, "store was deleted"),
            ));
        }
        entries.insert(key.to_string(), (response, Utc::now()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> ShellcacheResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn entries(&self) -> ShellcacheResult<Vec<EntryInfo>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(key, (response, stored_at))| EntryInfo {
                key: key.clone(),
                status: response.status,
                size_bytes: response.body.len() as u64,
                stored_at: *stored_at,
            })
            .collect())
    }
}
