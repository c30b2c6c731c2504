// src/commands/list.rs
//! `feedmirror list` — print the live package set

use crate::error::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// List flattened `(id, version)` pairs in a window, sorted by id then
/// version
pub async fn cmd_list(
    feed_index: &str,
    start: Option<&str>,
    end: Option<&str>,
    verbose: bool,
    max_threads: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let (start, end) = super::parse_window(start, end)?;
    let reader = super::open_reader(feed_index, max_threads, cancel).await?;

    let mut entries = reader.flattened_entries(start, end, cancel).await?;
    entries.sort_by(|a, b| {
        a.id.to_lowercase()
            .cmp(&b.id.to_lowercase())
            .then_with(|| a.version.cmp(&b.version))
    });

    info!("{} live package(s)", entries.len());
    for entry in &entries {
        if verbose {
            println!(
                "{} {} {}",
                entry.id,
                entry.version.normalized(),
                entry.commit_time.to_rfc3339()
            );
        } else {
            println!("{} {}", entry.id, entry.version.normalized());
        }
    }
    Ok(())
}
