// src/commands/mod.rs
//! Command handlers for the feedmirror CLI

mod list;
mod nupkgs;
mod validate;

pub use list::cmd_list;
pub use nupkgs::cmd_nupkgs;
pub use validate::cmd_validate;

use crate::catalog::{self, CatalogReader};
use crate::context::FeedContext;
use crate::error::{Error, Result};
use crate::fetch::{FeedFetcher, HttpFetcher, LocalFetcher};
use crate::intern::parse_timestamp;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Build a fetcher for a feed index argument
///
/// `http(s)` URIs go through the HTTP fabric. Anything else is treated as
/// the path of a service index file inside a feed published to disk, read
/// through the local fabric under a synthetic `file://` base.
fn make_fetcher(feed_index: &str) -> Result<(Arc<dyn FeedFetcher>, String)> {
    if feed_index.starts_with("http://") || feed_index.starts_with("https://") {
        return Ok((Arc::new(HttpFetcher::new()?), feed_index.to_string()));
    }

    let path = Path::new(feed_index);
    if !path.is_file() {
        return Err(Error::Configuration(format!(
            "{feed_index} is neither an http(s) URI nor a service index file"
        )));
    }
    let root = path
        .parent()
        .ok_or_else(|| Error::Configuration(format!("{feed_index} has no parent directory")))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Configuration(format!("bad feed index path {feed_index}")))?;

    let base = format!("file://{}", root.display());
    let index_uri = format!("{base}/{file_name}");
    Ok((Arc::new(LocalFetcher::new(root, &base)), index_uri))
}

/// Open a reader session against a feed index argument
pub(crate) async fn open_reader(
    feed_index: &str,
    max_threads: usize,
    cancel: &CancellationToken,
) -> Result<CatalogReader> {
    let (fetcher, index_uri) = make_fetcher(feed_index)?;
    let ctx = Arc::new(FeedContext::connect(fetcher, &index_uri, cancel).await?);
    Ok(CatalogReader::new(ctx).with_max_threads(max_threads))
}

/// Parse optional window bounds, defaulting to the whole catalog
pub(crate) fn parse_window(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = match start {
        Some(s) => parse_timestamp(s)
            .map_err(|_| Error::Configuration(format!("invalid start timestamp '{s}'")))?,
        None => catalog::min_time(),
    };
    let end = match end {
        Some(s) => parse_timestamp(s)
            .map_err(|_| Error::Configuration(format!("invalid end timestamp '{s}'")))?,
        None => Utc::now(),
    };
    if end < start {
        return Err(Error::Configuration(format!(
            "window end {} precedes start {}",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }
    Ok((start, end))
}
