// src/fetch/local.rs

//! Directory-tree backend for the fetch fabric.
//!
//! Resolves URIs below a configured base against a local directory,
//! allowing a feed published to disk to be read with the same machinery
//! as a remote one. Also the seam the integration tests run through.

use crate::error::{Error, Result};
use crate::fetch::{FeedFetcher, cache_key};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fetcher that maps `{base_uri}/rest` to `{root}/rest`
pub struct LocalFetcher {
    root: PathBuf,
    base_uri: String,
    json_cache: DashMap<String, Arc<Value>>,
}

impl LocalFetcher {
    pub fn new(root: impl AsRef<Path>, base_uri: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            base_uri: base_uri.trim_end_matches('/').to_string(),
            json_cache: DashMap::new(),
        }
    }

    /// Map a URI under the base to its on-disk path
    fn resolve(&self, uri: &str) -> Result<PathBuf> {
        let rest = uri
            .strip_prefix(&self.base_uri)
            .ok_or_else(|| Error::NotFound(format!("{uri} is outside {}", self.base_uri)))?
            .trim_start_matches('/');

        // Reject traversal out of the root
        if rest.split('/').any(|seg| seg == "..") {
            return Err(Error::NotFound(uri.to_string()));
        }

        Ok(self.root.join(rest))
    }
}

#[async_trait]
impl FeedFetcher for LocalFetcher {
    async fn fetch_json(&self, uri: &str, cancel: &CancellationToken) -> Result<Arc<Value>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let key = cache_key(uri);
        if let Some(cached) = self.json_cache.get(&key) {
            return Ok(cached.clone());
        }

        let path = self.resolve(uri)?;
        let body = tokio::fs::read(&path)
            .await
            .map_err(|_| Error::NotFound(uri.to_string()))?;

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

        debug!("Read {} from {}", uri, path.display());
        let value = Arc::new(value);
        self.json_cache.insert(key, value.clone());
        Ok(value)
    }

    async fn fetch_file(&self, uri: &str, cancel: &CancellationToken) -> Result<PathBuf> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let path = self.resolve(uri)?;
        if !path.is_file() {
            return Err(Error::NotFound(uri.to_string()));
        }
        Ok(path)
    }

    async fn head(&self, uri: &str, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if self.resolve(uri)?.is_file() {
            Ok(())
        } else {
            Err(Error::NotFound(uri.to_string()))
        }
    }

    fn invalidate(&self, uri: &str) {
        self.json_cache.remove(&cache_key(uri));
    }

    fn clear_cache(&self) {
        self.json_cache.clear();
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_and_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/doc.json"), br#"{"ok": true}"#).unwrap();

        let fetcher = LocalFetcher::new(dir.path(), "https://localhost:8080/testFeed/");
        let cancel = CancellationToken::new();

        let doc = fetcher
            .fetch_json("https://localhost:8080/testFeed/sub/doc.json", &cancel)
            .await
            .unwrap();
        assert_eq!(doc["ok"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = LocalFetcher::new(dir.path(), "https://feed");
        let cancel = CancellationToken::new();

        let err = fetcher
            .fetch_json("https://feed/nope.json", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_uri_outside_base_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = LocalFetcher::new(dir.path(), "https://feed");
        let cancel = CancellationToken::new();

        assert!(
            fetcher
                .head("https://other.host/doc.json", &cancel)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_cancellation_surfaces_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = LocalFetcher::new(dir.path(), "https://feed");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher
            .fetch_json("https://feed/doc.json", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
