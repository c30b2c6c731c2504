// src/fetch/http.rs

//! HTTP backend for the fetch fabric.

use crate::error::{Error, Result};
use crate::fetch::{FeedFetcher, cache_key};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for a single fetch before the error surfaces
const MAX_FETCH_ATTEMPTS: u32 = 5;

/// Base retry delay; the n-th retry waits n times this
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Product-qualified user-agent applied when the caller supplies none
const DEFAULT_USER_AGENT: &str = concat!("feedmirror/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed fetcher with response caching and retry
pub struct HttpFetcher {
    client: reqwest::Client,
    json_cache: DashMap<String, Arc<Value>>,
    file_cache: TempDir,
}

impl HttpFetcher {
    /// Create a fetcher with the default user-agent
    pub fn new() -> Result<Self> {
        Self::with_user_agent(None)
    }

    /// Create a fetcher, overriding the user-agent when one is supplied
    pub fn with_user_agent(user_agent: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            json_cache: DashMap::new(),
            file_cache: TempDir::with_prefix("feedmirror-cache-")?,
        })
    }

    /// Issue one GET, classifying 404 and non-2xx statuses
    async fn get_once(&self, uri: &str, cancel: &CancellationToken) -> Result<reqwest::Response> {
        let request = self.client.get(uri).send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            r = request => r.map_err(|e| Error::Transport {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?,
        };

        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(Error::NotFound(uri.to_string())),
            s => Err(Error::Transport {
                uri: uri.to_string(),
                reason: format!("HTTP {s}"),
            }),
        }
    }

    /// GET with the fetch-level retry loop
    ///
    /// Only transport errors retry; 404 and cancellation surface at once.
    async fn get_with_retry(
        &self,
        uri: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.get_once(uri, cancel).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < MAX_FETCH_ATTEMPTS => {
                    warn!("Fetch attempt {} for {} failed: {}, retrying", attempt, uri, e);
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(RETRY_DELAY * attempt) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch_json(&self, uri: &str, cancel: &CancellationToken) -> Result<Arc<Value>> {
        let key = cache_key(uri);
        if let Some(cached) = self.json_cache.get(&key) {
            debug!("Cache hit: {}", uri);
            return Ok(cached.clone());
        }

        let response = self.get_with_retry(uri, cancel).await?;
        let body = response.bytes().await.map_err(|e| Error::Transport {
            uri: uri.to_string(),
            reason: format!("failed to read body: {e}"),
        })?;

        // serde_json leaves timestamps as strings; callers parse them with
        // a single ISO-8601 format.
        let value: Value = serde_json::from_slice(&body).map_err(|e| Error::ContentInvalid {
            uri: uri.to_string(),
            reason: format!("body is not JSON: {e}"),
        })?;

        if !value.is_object() {
            return Err(Error::ContentInvalid {
                uri: uri.to_string(),
                reason: "expected a JSON object".to_string(),
            });
        }

        let value = Arc::new(value);
        self.json_cache.insert(key, value.clone());
        Ok(value)
    }

    async fn fetch_file(&self, uri: &str, cancel: &CancellationToken) -> Result<PathBuf> {
        let key = cache_key(uri);
        let dest = self.file_cache.path().join(&key);
        if dest.exists() {
            debug!("File cache hit: {}", uri);
            return Ok(dest);
        }

        let response = self.get_with_retry(uri, cancel).await?;
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            b = response.bytes() => b.map_err(|e| Error::Transport {
                uri: uri.to_string(),
                reason: format!("failed to read body: {e}"),
            })?,
        };

        // Write to a temp sibling, then atomic rename
        let tmp = self.file_cache.path().join(format!("{key}.part"));
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &dest).await?;

        debug!("Downloaded {} bytes from {}", body.len(), uri);
        Ok(dest)
    }

    async fn head(&self, uri: &str, cancel: &CancellationToken) -> Result<()> {
        let request = self.client.head(uri).send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            r = request => r.map_err(|e| Error::Transport {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?,
        };

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::NotFound(uri.to_string())),
            s => Err(Error::Transport {
                uri: uri.to_string(),
                reason: format!("HTTP {s}"),
            }),
        }
    }

    fn invalidate(&self, uri: &str) {
        let key = cache_key(uri);
        self.json_cache.remove(&key);
        let path = self.file_cache.path().join(&key);
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }

    fn clear_cache(&self) {
        self.json_cache.clear();
        if let Ok(entries) = std::fs::read_dir(self.file_cache.path()) {
            for entry in entries.flatten() {
                let _ = std::fs::remove_file(entry.path());
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
