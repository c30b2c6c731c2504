// src/catalog/pages.rs

//! Bounded-concurrency materialization of catalog pages into entries.

use crate::catalog::entry::CatalogEntry;
use crate::catalog::index::CatalogPage;
use crate::context::FeedContext;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default bound on in-flight page fetches
pub const DEFAULT_MAX_THREADS: usize = 16;

/// Fetch `pages` and collect their entries with timestamps in `(start, end]`
///
/// At most `max_threads` fetches are in flight (lower bound 1). Output
/// order is unspecified; callers sort by commit timestamp when ordering
/// matters. Exact duplicate events (same leaf URI) are dropped.
pub async fn read_entries(
    ctx: &FeedContext,
    pages: &[CatalogPage],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_threads: usize,
    cancel: &CancellationToken,
) -> Result<Vec<CatalogEntry>> {
    let max_threads = max_threads.max(1);
    let semaphore = Arc::new(Semaphore::new(max_threads));

    let fetches = stream::iter(pages.iter().cloned().enumerate())
        .map(|(index, page)| {
            let permit = semaphore.clone();
            async move {
                let _permit = permit.acquire().await.unwrap();
                (index, read_page(ctx, &page, start, end, cancel).await)
            }
        })
        .buffer_unordered(max_threads);

    // Reassemble in page order so ties on commit timestamp resolve the
    // same way on every run, regardless of fetch interleaving.
    let mut results: Vec<(usize, Result<Vec<CatalogEntry>>)> = fetches.collect().await;
    results.sort_by_key(|(index, _)| *index);

    let mut seen: HashSet<Arc<str>> = HashSet::new();
    let mut entries = Vec::new();
    for (_, result) in results {
        for entry in result? {
            if seen.insert(entry.uri.clone()) {
                entries.push(entry);
            }
        }
    }

    debug!(
        "Materialized {} entries from {} pages",
        entries.len(),
        pages.len()
    );
    Ok(entries)
}

/// Fetch one page and parse its in-window items
async fn read_page(
    ctx: &FeedContext,
    page: &CatalogPage,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<Vec<CatalogEntry>> {
    let doc = ctx.fetcher().fetch_json(&page.uri, cancel).await?;

    let items = doc
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::ContentInvalid {
            uri: page.uri.to_string(),
            reason: "catalog page has no 'items' array".to_string(),
        })?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let entry = CatalogEntry::from_page_item(ctx, &page.uri, item)?;
        // The page-level selection is coarse; a selected page can carry
        // commits outside the window on either side.
        if entry.commit_time > start && entry.commit_time <= end {
            entries.push(entry);
        }
    }
    Ok(entries)
}
