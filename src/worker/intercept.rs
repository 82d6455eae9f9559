//! Fetch interception
//!
//! Only GET requests for manifest keys are intercepted. The root document is
//! served online-first so a deployed update is picked up on the next
//! navigation; every other resource is served cache-first and populated
//! lazily on a miss.

use super::Worker;
use crate::error::ShellcacheResult;
use crate::manifest::ROOT_KEY;
use crate::net::{Method, Request, Response};
use std::fmt;
use tracing::{debug, warn};

/// Where an intercepted response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Result of offering a request to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host handles the request itself
    Passthrough,
    /// The worker answered the request
    Respond {
        response: Response,
        source: ResponseSource,
    },
}

impl Worker {
    /// Fetch event handler
    ///
    /// Network failures surface as `Err` only when no cached copy can stand
    /// in for the response.
    pub async fn handle_fetch(&self, request: &Request) -> ShellcacheResult<FetchOutcome> {
        if request.method != Method::Get {
            return Ok(FetchOutcome::Passthrough);
        }

        let Some(key) = self.config.origin.resource_key(&request.url) else {
            return Ok(FetchOutcome::Passthrough);
        };
        if !self.config.manifest().contains(&key) {
            debug!("{} is not a manifest resource", request.url);
            return Ok(FetchOutcome::Passthrough);
        }

        if key == ROOT_KEY {
            self.online_first(request).await
        } else {
            self.cache_first(request, &key).await
        }
    }

    async fn cache_first(&self, request: &Request, key: &str) -> ShellcacheResult<FetchOutcome> {
        let content = self.open_content().await?;
        let cache_url = self.config.origin.url_for(key);

        if let Some(response) = content.lookup(&cache_url).await? {
            return Ok(FetchOutcome::Respond {
                response,
                source: ResponseSource::Cache,
            });
        }

        let response = self.fetcher.fetch(request).await?;
        if response.is_ok() {
            if let Err(e) = content.put(&cache_url, response.clone()).await {
                warn!("Failed to cache {}: {}", cache_url, e);
            }
        }

        Ok(FetchOutcome::Respond {
            response,
            source: ResponseSource::Network,
        })
    }

    async fn online_first(&self, request: &Request) -> ShellcacheResult<FetchOutcome> {
        let cache_url = self.config.origin.url_for(ROOT_KEY);

        let network_err = match self.fetcher.fetch(request).await {
            Ok(response) => {
                match self.open_content().await {
                    Ok(content) => {
                        if let Err(e) = content.put(&cache_url, response.clone()).await {
                            warn!("Failed to cache {}: {}", cache_url, e);
                        }
                    }
                    Err(e) => warn!("Failed to open content cache: {}", e),
                }
                return Ok(FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                });
            }
            Err(e) => e,
        };

        debug!("Network unavailable for {}, trying cache: {}", request.url, network_err);
        let cached = match self.open_content().await {
            Ok(content) => content.lookup(&cache_url).await,
            Err(e) => Err(e),
        };

        match cached {
            Ok(Some(response)) => Ok(FetchOutcome::Respond {
                response,
                source: ResponseSource::Cache,
            }),
            Ok(None) => Err(network_err),
            Err(e) => {
                warn!("Cache fallback for {} failed: {}", cache_url, e);
                Err(network_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShellcacheError;
    use crate::store::{CacheStorage, MemoryStorage};
    use crate::testing::{test_worker, RecordingHost, StubFetcher, ORIGIN};
    use std::sync::Arc;

    const MANIFEST: &[(&str, &str)] = &[("/", "h0"), ("main.js", "h1"), ("assets/a.png", "h2")];

    fn setup(fetcher: StubFetcher) -> (Worker, Arc<MemoryStorage>, Arc<StubFetcher>) {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(fetcher);
        let worker = test_worker(
            storage.clone(),
            fetcher.clone(),
            Arc::new(RecordingHost::default()),
            MANIFEST,
            &[],
        );
        (worker, storage, fetcher)
    }

    fn source(outcome: &FetchOutcome) -> Option<ResponseSource> {
        match outcome {
            FetchOutcome::Respond { source, .. } => Some(*source),
            FetchOutcome::Passthrough => None,
        }
    }

    #[tokio::test]
    async fn non_get_passes_through() {
        let (worker, _, fetcher) = setup(StubFetcher::new());
        let request = Request::new(Method::Post, format!("{}/main.js", ORIGIN));

        let outcome = worker.handle_fetch(&request).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Passthrough);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_and_foreign_urls_pass_through() {
        let (worker, _, fetcher) = setup(StubFetcher::new());

        for url in [
            format!("{}/api/data.json", ORIGIN),
            "https://cdn.other.test/main.js".to_string(),
        ] {
            let outcome = worker.handle_fetch(&Request::get(url)).await.unwrap();
            assert_eq!(outcome, FetchOutcome::Passthrough);
        }
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn cache_miss_populates_once() {
        let url = format!("{}/main.js", ORIGIN);
        let (worker, _, fetcher) = setup(StubFetcher::new().serve(&url, "js"));

        let first = worker.handle_fetch(&Request::get(&url)).await.unwrap();
        let second = worker.handle_fetch(&Request::get(&url)).await.unwrap();

        assert_eq!(source(&first), Some(ResponseSource::Network));
        assert_eq!(source(&second), Some(ResponseSource::Cache));
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn version_query_hits_same_entry() {
        let url = format!("{}/main.js", ORIGIN);
        let versioned = format!("{}/main.js?v=123", ORIGIN);
        let (worker, storage, fetcher) = setup(StubFetcher::new().serve(&versioned, "js"));

        worker.handle_fetch(&Request::get(&versioned)).await.unwrap();
        let outcome = worker.handle_fetch(&Request::get(&url)).await.unwrap();

        assert_eq!(source(&outcome), Some(ResponseSource::Cache));
        assert_eq!(fetcher.call_count(), 1);
        let content = storage.open("app-cache").await.unwrap();
        assert_eq!(content.keys().await.unwrap(), vec![url]);
    }

    #[tokio::test]
    async fn unsuccessful_response_not_cached() {
        let url = format!("{}/assets/a.png", ORIGIN);
        let (worker, storage, fetcher) = setup(StubFetcher::new().serve_status(&url, 503, "busy"));

        let first = worker.handle_fetch(&Request::get(&url)).await.unwrap();
        worker.handle_fetch(&Request::get(&url)).await.unwrap();

        match first {
            FetchOutcome::Respond { response, .. } => assert_eq!(response.status, 503),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fetcher.call_count(), 2);
        let content = storage.open("app-cache").await.unwrap();
        assert!(content.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_miss_with_network_failure_propagates() {
        let (worker, _, _) = setup(StubFetcher::new());
        let result = worker
            .handle_fetch(&Request::get(format!("{}/main.js", ORIGIN)))
            .await;
        assert!(matches!(result, Err(ShellcacheError::Network { .. })));
    }

    #[tokio::test]
    async fn root_prefers_network_and_refreshes_cache() {
        let root = format!("{}/", ORIGIN);
        let (worker, storage, fetcher) = setup(StubFetcher::new().serve(&root, "v2"));
        let content = storage.open("app-cache").await.unwrap();
        content.put(&root, Response::new(&root, 200, "v1")).await.unwrap();

        let outcome = worker.handle_fetch(&Request::get(&root)).await.unwrap();

        assert_eq!(source(&outcome), Some(ResponseSource::Network));
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(content.lookup(&root).await.unwrap().unwrap().body, b"v2");
    }

    #[tokio::test]
    async fn root_spellings_fall_back_to_one_entry() {
        let root = format!("{}/", ORIGIN);
        let (worker, storage, fetcher) = setup(StubFetcher::new());
        fetcher.set_offline(true);
        let content = storage.open("app-cache").await.unwrap();
        content.put(&root, Response::new(&root, 200, "shell")).await.unwrap();

        for url in [
            ORIGIN.to_string(),
            root.clone(),
            format!("{}/#/settings", ORIGIN),
        ] {
            let outcome = worker.handle_fetch(&Request::get(&url)).await.unwrap();
            match outcome {
                FetchOutcome::Respond { response, source } => {
                    assert_eq!(source, ResponseSource::Cache);
                    assert_eq!(response.body, b"shell");
                }
                other => panic!("unexpected {:?} for {}", other, url),
            }
        }
    }

    #[tokio::test]
    async fn root_without_cache_propagates_network_error() {
        let (worker, _, _) = setup(StubFetcher::new());
        let result = worker.handle_fetch(&Request::get(ORIGIN)).await;
        assert!(matches!(result, Err(ShellcacheError::Network { .. })));
    }
}
