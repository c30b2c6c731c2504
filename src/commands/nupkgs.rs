// src/commands/nupkgs.rs
//! `feedmirror nupkgs` — mirror a feed's archives

use crate::error::Result;
use crate::mirror::{DownloadMode, IdFilter, Layout, MirrorOptions, run_mirror};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[allow(clippy::too_many_arguments)]
pub async fn cmd_nupkgs(
    feed_index: &str,
    output: PathBuf,
    folder_format: Layout,
    delay_minutes: i64,
    max_threads: usize,
    batch_size: usize,
    mode: DownloadMode,
    ignore_errors: bool,
    include: Vec<String>,
    exclude: Vec<String>,
    extra_roots: Vec<PathBuf>,
    cancel: &CancellationToken,
) -> Result<()> {
    let reader = super::open_reader(feed_index, max_threads, cancel).await?;

    let mut opts = MirrorOptions::new(output);
    opts.roots.extend(extra_roots);
    opts.layout = folder_format;
    opts.mode = mode;
    opts.delay = chrono::Duration::minutes(delay_minutes);
    opts.max_threads = max_threads;
    opts.batch_size = batch_size;
    opts.ignore_errors = ignore_errors;
    opts.filter = IdFilter::new(&include, &exclude)?;

    let outcome = run_mirror(&reader, &opts, cancel).await?;

    info!(
        "{} new file(s), {} skipped, {} missing upstream",
        outcome.downloaded.len(),
        outcome.skipped,
        outcome.missing
    );
    for path in &outcome.downloaded {
        println!("{}", path.display());
    }
    Ok(())
}
