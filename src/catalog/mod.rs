// src/catalog/mod.rs

//! Catalog traversal: the append-only event log of a feed.
//!
//! The catalog root lists pages; pages list entries; entries are package
//! publish/edit/delete events. A traversal over a window `(start, end]`
//! yields exactly the events committed in that window, independent of how
//! page fetches interleave.

use crate::context::FeedContext;
use crate::error::Result;
use crate::version::NuGetVersion;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod entry;
pub mod flatten;
pub mod index;
pub mod pages;

pub use entry::{CatalogEntry, EntryKind};
pub use flatten::{flatten, package_set};
pub use index::{CatalogPage, load_pages, select_page_range};
pub use pages::DEFAULT_MAX_THREADS;

/// Earliest representable cursor position
///
/// Matches the zero timestamp catalogs use for "never"; every real commit
/// is strictly later.
pub fn min_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()
}

/// Reader over a feed's catalog resource
pub struct CatalogReader {
    ctx: Arc<FeedContext>,
    max_threads: usize,
}

impl CatalogReader {
    pub fn new(ctx: Arc<FeedContext>) -> Self {
        Self {
            ctx,
            max_threads: DEFAULT_MAX_THREADS,
        }
    }

    /// Bound the number of in-flight page fetches (minimum 1)
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads.max(1);
        self
    }

    pub fn context(&self) -> &Arc<FeedContext> {
        &self.ctx
    }

    /// List all catalog pages
    pub async fn pages(&self, cancel: &CancellationToken) -> Result<Vec<CatalogPage>> {
        index::load_pages(&self.ctx, cancel).await
    }

    /// All events with commit timestamps in `(start, end]`, unordered
    pub async fn entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogEntry>> {
        let all_pages = self.pages(cancel).await?;
        let selected = index::select_page_range(&all_pages, start, end);
        pages::read_entries(&self.ctx, &selected, start, end, self.max_threads, cancel).await
    }

    /// Every event in the catalog
    pub async fn all_entries(&self, cancel: &CancellationToken) -> Result<Vec<CatalogEntry>> {
        self.entries(min_time(), Utc::now(), cancel).await
    }

    /// The live package set for the window, newest commit first
    pub async fn flattened_entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogEntry>> {
        Ok(flatten::flatten(self.entries(start, end, cancel).await?))
    }

    /// Group the window's live set into `id -> sorted versions`
    pub async fn package_set(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, BTreeSet<Arc<NuGetVersion>>>> {
        let flat = self.flattened_entries(start, end, cancel).await?;
        Ok(flatten::package_set(&flat))
    }
}
