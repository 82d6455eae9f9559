//! Network access for the worker
//!
//! `Fetcher` is the seam between the worker and the network. `HttpFetcher`
//! talks to a real origin; tests substitute scripted fetchers.

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::{CacheMode, Method, Request, Response};
use crate::store::CacheStore;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::debug;

/// Abstract network interface
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform a request.
    ///
    /// Only transport failures are errors; any HTTP status is a response.
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response>;
}

/// Blocking `ureq` agent driven from the tokio blocking pool
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response> {
        if request.method != Method::Get {
            return Err(ShellcacheError::User(format!(
                "Only GET requests can be fetched, got {}",
                request.method
            )));
        }

        let agent = self.agent.clone();
        let url = request.url.clone();
        let cache_mode = request.cache_mode;

        tokio::task::spawn_blocking(move || get_blocking(&agent, &url, cache_mode))
            .await
            .map_err(|e| ShellcacheError::Internal(format!("fetch task failed: {}", e)))?
    }
}

fn get_blocking(agent: &ureq::Agent, url: &str, cache_mode: CacheMode) -> ShellcacheResult<Response> {
    let mut builder = agent.get(url);
    if cache_mode == CacheMode::Reload {
        builder = builder
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache");
    }

    let mut response = builder
        .call()
        .map_err(|e| ShellcacheError::network(url, e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(|e| ShellcacheError::network(url, format!("reading body: {}", e)))?;

    debug!("GET {} -> {} ({} bytes)", url, status, body.len());

    Ok(Response {
        url: url.to_string(),
        status,
        headers,
        body,
    })
}

/// Fetch every request and store the responses as one batch.
///
/// All fetches run concurrently. Nothing is written unless every fetch
/// succeeds with a 2xx status.
pub async fn add_all(
    store: &dyn CacheStore,
    fetcher: &dyn Fetcher,
    requests: Vec<Request>,
) -> ShellcacheResult<usize> {
    if requests.is_empty() {
        return Ok(0);
    }

    let responses = try_join_all(requests.iter().map(|request| async move {
        let response = fetcher.fetch(request).await?;
        if !response.is_ok() {
            return Err(ShellcacheError::HttpStatus {
                url: request.url.clone(),
                status: response.status,
            });
        }
        Ok(response)
    }))
    .await?;

    for (request, response) in requests.iter().zip(responses) {
        store.put(&request.url, response).await?;
    }

    debug!("Stored {} entries in {}", requests.len(), store.name());
    Ok(requests.len())
}
