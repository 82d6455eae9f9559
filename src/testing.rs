//! Test doubles shared by unit tests

use crate::config::CacheNames;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::host::WorkerHost;
use crate::manifest::{CoreSet, ManifestRegistry, ResourceManifest};
use crate::net::{Fetcher, Origin, Request, Response};
use crate::store::{CacheStorage, CacheStore, EntryInfo, MemoryStorage};
use crate::worker::{Worker, WorkerConfig};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ORIGIN: &str = "https://app.test";

enum Route {
    Serve { status: u16, body: Vec<u8> },
    Fail,
}

/// Fetcher answering from a fixed route table and recording every request
#[derive(Default)]
pub struct StubFetcher {
    routes: HashMap<String, Route>,
    offline: AtomicBool,
    calls: Mutex<Vec<Request>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.serve_status(url, 200, body)
    }

    pub fn serve_status(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(
            url.to_string(),
            Route::Serve {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn fail(mut self, url: &str) -> Self {
        self.routes.insert(url.to_string(), Route::Fail);
        self
    }

    /// Make every request fail as if the network were down
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.url).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(ShellcacheError::network(&request.url, "network offline"));
        }

        match self.routes.get(&request.url) {
            Some(Route::Serve { status, body }) => {
                Ok(Response::new(&request.url, *status, body.clone()))
            }
            Some(Route::Fail) | None => {
                Err(ShellcacheError::network(&request.url, "connection refused"))
            }
        }
    }
}

/// Host that only counts what the worker asked of it
#[derive(Default)]
pub struct RecordingHost {
    skip_waiting: AtomicUsize,
    claim: AtomicUsize,
}

impl RecordingHost {
    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claim.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerHost for RecordingHost {
    async fn skip_waiting(&self) {
        self.skip_waiting.fetch_add(1, Ordering::SeqCst);
    }

    async fn claim_clients(&self) {
        self.claim.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory storage whose chosen stores reject writes
pub struct FailingStorage {
    inner: Arc<MemoryStorage>,
    fail_puts: HashSet<String>,
}

impl FailingStorage {
    pub fn new(inner: Arc<MemoryStorage>) -> Self {
        Self {
            inner,
            fail_puts: HashSet::new(),
        }
    }

    pub fn fail_puts_in(mut self, name: &str) -> Self {
        self.fail_puts.insert(name.to_string());
        self
    }
}

struct FailingStore {
    inner: Arc<dyn CacheStore>,
    fail_puts: bool,
}

#[async_trait]
impl CacheStore for FailingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn lookup(&self, key: &str) -> ShellcacheResult<Option<Response>> {
        self.inner.lookup(key).await
    }

    async fn put(&self, key: &str, response: Response) -> ShellcacheResult<()> {
        if self.fail_puts {
            return Err(ShellcacheError::store(
                self.inner.name(),
                format!("write {}", key),
                std::io::Error::other("disk full"),
            ));
        }
        self.inner.put(key, response).await
    }

    async fn delete(&self, key: &str) -> ShellcacheResult<bool> {
        self.inner.delete(key).await
    }

    async fn entries(&self) -> ShellcacheResult<Vec<EntryInfo>> {
        self.inner.entries().await
    }
}

#[async_trait]
impl CacheStorage for FailingStorage {
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn CacheStore>> {
        let inner = self.inner.open(name).await?;
        Ok(Arc::new(FailingStore {
            inner,
            fail_puts: self.fail_puts.contains(name),
        }))
    }

    async fn has(&self, name: &str) -> ShellcacheResult<bool> {
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> ShellcacheResult<bool> {
        self.inner.delete(name).await
    }

    async fn names(&self) -> ShellcacheResult<Vec<String>> {
        self.inner.names().await
    }
}

/// Worker for [`ORIGIN`] with default store names
pub fn test_worker(
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn WorkerHost>,
    manifest: &[(&str, &str)],
    core: &[&str],
) -> Worker {
    let registry = ManifestRegistry::new(
        ResourceManifest::from_entries(manifest.iter().copied()),
        CoreSet::new(core.iter().copied()),
    )
    .expect("test manifest must contain core");
    let config = WorkerConfig {
        origin: Origin::parse(ORIGIN).expect("test origin"),
        registry,
        caches: CacheNames::default(),
    };
    Worker::new(config, storage, fetcher, host).expect("test store names are distinct")
}
