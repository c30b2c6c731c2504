// src/fetch/mod.rs

//! Fetch fabric: JSON documents, package archives, and manifests by URI.
//!
//! Transport abstraction with two backends:
//! - HTTP/HTTPS via reqwest (retrying, response-cached)
//! - Local directory trees (mirroring an on-disk feed, test fixtures)
//!
//! Archive fetches are validated by opening the zip and locating the
//! manifest entry before the path is surfaced; a failed open invalidates
//! the cache entry so a retry re-downloads.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

mod http;
mod local;

pub use http::HttpFetcher;
pub use local::LocalFetcher;

/// Transport abstraction used by every reader and the mirror driver
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse a JSON document
    ///
    /// The body must parse as a JSON object; timestamps stay strings and
    /// are parsed by the caller. 404 surfaces as [`Error::NotFound`].
    async fn fetch_json(&self, uri: &str, cancel: &CancellationToken) -> Result<Arc<Value>>;

    /// Fetch a file into the fabric's cache, returning the cached path
    ///
    /// Callers copy out of the cache; the path is owned by the fabric and
    /// may disappear on [`FeedFetcher::clear_cache`].
    async fn fetch_file(&self, uri: &str, cancel: &CancellationToken) -> Result<PathBuf>;

    /// Lightweight reachability probe (HEAD or file existence)
    async fn head(&self, uri: &str, cancel: &CancellationToken) -> Result<()>;

    /// Drop a single cached response
    fn invalidate(&self, uri: &str);

    /// Best-effort removal of all cached responses and files
    fn clear_cache(&self);

    /// Human-readable backend name for logging
    fn name(&self) -> &str;
}

/// Derive the deterministic cache key for a URI
///
/// Scheme and path separators are replaced with `_`, which also makes the
/// key usable as a file name in the download cache.
pub fn cache_key(uri: &str) -> String {
    uri.chars()
        .map(|c| match c {
            ':' | '/' | '?' | '#' | '&' | '=' | '\\' => '_',
            c => c,
        })
        .collect()
}

/// Fetch a `.nupkg` archive and validate it before returning the path
///
/// Validation opens the zip and locates the root-level `.nuspec` entry.
/// An unreadable archive invalidates the cache entry and surfaces as a
/// retryable transport error.
pub async fn fetch_nupkg(
    fetcher: &dyn FeedFetcher,
    uri: &str,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let path = fetcher.fetch_file(uri, cancel).await?;

    match crate::nuspec::find_nuspec_entry(&path) {
        Ok(_) => Ok(path),
        Err(e) => {
            warn!("Invalid archive from {}: {}", uri, e);
            fetcher.invalidate(uri);
            Err(Error::Transport {
                uri: uri.to_string(),
                reason: format!("archive failed validation: {e}"),
            })
        }
    }
}

/// Fetch a `.nuspec` manifest and parse it before returning
pub async fn fetch_manifest(
    fetcher: &dyn FeedFetcher,
    uri: &str,
    cancel: &CancellationToken,
) -> Result<crate::nuspec::Nuspec> {
    let path = fetcher.fetch_file(uri, cancel).await?;
    debug!("Parsing manifest from {}", uri);

    crate::nuspec::Nuspec::from_path(&path).map_err(|e| {
        fetcher.invalidate(uri);
        match e {
            Error::ContentInvalid { reason, .. } => Error::ContentInvalid {
                uri: uri.to_string(),
                reason,
            },
            other => other,
        }
    })
}
