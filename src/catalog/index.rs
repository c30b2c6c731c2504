// src/catalog/index.rs

//! Catalog root: the paginated index of catalog pages.

use crate::context::FeedContext;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One `items[]` element of the catalog root
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub uri: Arc<str>,
    pub commit_id: Arc<str>,
    /// Timestamp of the latest commit on the page
    pub commit_time: DateTime<Utc>,
    pub types: Vec<Arc<str>>,
}

/// Fetch the catalog root and list its pages
///
/// A root with no `items` is an empty catalog, not an error.
pub async fn load_pages(ctx: &FeedContext, cancel: &CancellationToken) -> Result<Vec<CatalogPage>> {
    let catalog_uri = ctx.service_index().catalog_uri()?;
    let root = ctx.fetcher().fetch_json(catalog_uri, cancel).await?;

    let Some(items) = root.get("items").and_then(Value::as_array) else {
        debug!("Catalog {} has no items; treating as empty", catalog_uri);
        return Ok(Vec::new());
    };

    let invalid = |reason: String| Error::ContentInvalid {
        uri: catalog_uri.to_string(),
        reason,
    };

    let pool = ctx.pool();
    let mut pages = Vec::with_capacity(items.len());
    for item in items {
        let uri = item
            .get("@id")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("catalog page missing '@id'".to_string()))?;
        let commit_id = item
            .get("commitId")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(format!("catalog page {uri} missing 'commitId'")))?;
        let stamp = item
            .get("commitTimeStamp")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(format!("catalog page {uri} missing 'commitTimeStamp'")))?;
        let types = match item.get("@type") {
            Some(Value::String(s)) => vec![pool.string(s)],
            Some(Value::Array(list)) => list
                .iter()
                .filter_map(Value::as_str)
                .map(|t| pool.string(t))
                .collect(),
            _ => Vec::new(),
        };

        pages.push(CatalogPage {
            uri: pool.string(uri),
            commit_id: pool.string(commit_id),
            commit_time: pool.date(stamp)?,
            types,
        });
    }

    debug!("Catalog {} has {} pages", catalog_uri, pages.len());
    Ok(pages)
}

/// Select the pages that can hold commits in `(start, end]`
///
/// A page's declared timestamp equals the *latest* commit on that page.
/// Because the window is right-closed and multiple commits may share a
/// timestamp, the first page strictly beyond `end` must be included to
/// guarantee that any commit with `timestamp == end` that happens to live
/// on the next page is observed. The lower bound is exclusive, so pages at
/// or below `start` are trimmed; the caller then re-filters entry by
/// entry, because a page whose declared timestamp is `> start` may still
/// contain some earlier entries from an earlier commit on the same page.
pub fn select_page_range(
    pages: &[CatalogPage],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<CatalogPage> {
    let mut selected: Vec<CatalogPage> = pages
        .iter()
        .filter(|p| p.commit_time > start && p.commit_time <= end)
        .cloned()
        .collect();

    let next_after_end = pages
        .iter()
        .filter(|p| p.commit_time > end)
        .min_by_key(|p| p.commit_time);
    if let Some(next) = next_after_end {
        selected.push(next.clone());
    }

    selected.sort_by_key(|p| p.commit_time);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn page(n: i64) -> CatalogPage {
        CatalogPage {
            uri: Arc::from(format!("https://feed/catalog/page{n}.json").as_str()),
            commit_id: Arc::from("c0ffee"),
            commit_time: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, n as u32).unwrap(),
            types: Vec::new(),
        }
    }

    fn t(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, n).unwrap()
    }

    #[test]
    fn test_window_selects_interior_plus_next() {
        let pages: Vec<_> = (0..10).map(page).collect();
        let selected = select_page_range(&pages, t(2), t(7));

        // (2, 7] plus the first page after 7
        let times: Vec<u32> = selected
            .iter()
            .map(|p| (p.commit_time.timestamp() % 60) as u32)
            .collect();
        assert_eq!(times, vec![3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_lower_bound_exclusive() {
        let pages: Vec<_> = (0..4).map(page).collect();
        let selected = select_page_range(&pages, t(1), t(3));
        assert!(selected.iter().all(|p| p.commit_time > t(1)));
    }

    #[test]
    fn test_no_page_after_end() {
        let pages: Vec<_> = (0..4).map(page).collect();
        let selected = select_page_range(&pages, t(0), t(9));
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_empty_catalog() {
        let selected = select_page_range(&[], t(0), t(9));
        assert!(selected.is_empty());
    }

    #[test]
    fn test_window_entirely_before_catalog() {
        // All pages after end: only the single next page is returned
        let pages: Vec<_> = (5..10).map(page).collect();
        let selected = select_page_range(&pages, t(0), t(2));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].commit_time, t(5));
    }

    #[test]
    fn test_result_sorted_ascending() {
        let mut pages: Vec<_> = (0..10).map(page).collect();
        pages.reverse();
        let selected = select_page_range(&pages, t(2), t(9));
        for w in selected.windows(2) {
            assert!(w[0].commit_time <= w[1].commit_time);
        }
    }
}
