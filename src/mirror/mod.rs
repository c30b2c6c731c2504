// src/mirror/mod.rs

//! Mirror driver: cursored, batched replication of a feed to disk.
//!
//! Each run traverses the catalog window `(cursor, now - delay]`, flattens
//! it to the live package set, and downloads archives in bounded batches.
//! The cursor only ever advances past commits whose events have all been
//! handed off, so a crashed run resumes without skipping anything; retried
//! commits are idempotent because downloads compare against on-disk state.

use crate::catalog::{self, CatalogEntry, CatalogReader};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use filetime::FileTime;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod cursor;
pub mod filters;
pub mod layout;

pub use cursor::{cursor_path, read_cursor, write_cursor};
pub use filters::IdFilter;
pub use layout::{DownloadMode, Layout};

/// Maximum attempts for one download task
const TASK_MAX_ATTEMPTS: u32 = 10;

/// Task-level backoff base; the n-th retry waits `5s * (n + 1)`
const TASK_RETRY_BASE: Duration = Duration::from_secs(5);

/// Default number of entries dispatched per batch
pub const DEFAULT_BATCH_SIZE: usize = 128;

/// Default publisher-race guard, in minutes
pub const DEFAULT_DELAY_MINUTES: i64 = 10;

/// Per-run change log: one absolute path per newly written archive
const UPDATED_FILES: &str = "updatedFiles.txt";

/// Per-run error log: one message per failure
const ERROR_LOG: &str = "lastRunErrors.txt";

/// Configuration for a mirror run
pub struct MirrorOptions {
    /// Storage roots; the first also holds the cursor and run logs
    pub roots: Vec<PathBuf>,
    pub layout: Layout,
    pub mode: DownloadMode,
    /// Window upper bound is `now - delay`, guarding against racing
    /// publishers
    pub delay: chrono::Duration,
    pub max_threads: usize,
    pub batch_size: usize,
    pub ignore_errors: bool,
    pub filter: IdFilter,
}

impl MirrorOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![output.into()],
            layout: Layout::default(),
            mode: DownloadMode::default(),
            delay: chrono::Duration::minutes(DEFAULT_DELAY_MINUTES),
            max_threads: catalog::DEFAULT_MAX_THREADS,
            batch_size: DEFAULT_BATCH_SIZE,
            ignore_errors: false,
            filter: IdFilter::default(),
        }
    }
}

/// What a finished run did
#[derive(Debug, Default)]
pub struct MirrorOutcome {
    /// Newly written archive paths
    pub downloaded: Vec<PathBuf>,
    /// Entries skipped because the destination was already current
    pub skipped: usize,
    /// Entries whose archive was missing upstream (404, warned)
    pub missing: usize,
    /// Failure messages collected under `--ignore-errors`
    pub errors: Vec<String>,
    /// Final persisted cursor
    pub cursor: Option<DateTime<Utc>>,
}

/// One download task's terminal state
enum TaskResult {
    Done {
        entry: CatalogEntry,
        written: Option<PathBuf>,
        missing: bool,
    },
    Failed {
        entry: CatalogEntry,
        error: Error,
    },
    Cancelled,
}

/// Run one mirror pass over the feed
pub async fn run_mirror(
    reader: &CatalogReader,
    opts: &MirrorOptions,
    cancel: &CancellationToken,
) -> Result<MirrorOutcome> {
    let output = opts
        .roots
        .first()
        .ok_or_else(|| Error::Configuration("no output root configured".to_string()))?
        .clone();
    std::fs::create_dir_all(&output)?;

    let start = cursor::read_cursor(&output)?.unwrap_or_else(catalog::min_time);
    let end = Utc::now() - opts.delay;
    if end <= start {
        info!("Cursor {} is already at the window edge", start.to_rfc3339());
        return Ok(MirrorOutcome {
            cursor: Some(start),
            ..Default::default()
        });
    }

    info!(
        "Mirroring window ({}, {}]",
        start.to_rfc3339(),
        end.to_rfc3339()
    );

    let mut entries = reader.flattened_entries(start, end, cancel).await?;
    entries.retain(|e| e.is_add_or_update() && opts.filter.matches(&e.id));
    entries.sort_by_key(|e| e.commit_time);
    info!("{} package(s) to consider", entries.len());

    let mut queue: VecDeque<CatalogEntry> = entries.into();
    let mut outcome = MirrorOutcome::default();
    let mut failures: Vec<Error> = Vec::new();
    let batch_size = opts.batch_size.max(1);

    while !queue.is_empty() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let take = batch_size.min(queue.len());
        let batch: Vec<CatalogEntry> = queue.drain(..take).collect();
        let next_pending = queue.front().map(|e| e.commit_time);

        let results = run_batch(reader, opts, batch, cancel).await;

        let mut processed: Vec<DateTime<Utc>> = Vec::new();
        let mut batch_written: Vec<PathBuf> = Vec::new();
        for result in results {
            match result {
                TaskResult::Done {
                    entry,
                    written,
                    missing,
                } => {
                    processed.push(entry.commit_time);
                    match written {
                        Some(path) => batch_written.push(path),
                        None if missing => outcome.missing += 1,
                        None => outcome.skipped += 1,
                    }
                }
                TaskResult::Failed { entry, error } => {
                    warn!("{} {} failed: {}", entry.id, entry.version, error);
                    if opts.ignore_errors {
                        // The entry is handled as far as the cursor is
                        // concerned; the failure is still reported.
                        processed.push(entry.commit_time);
                    }
                    failures.push(error);
                }
                TaskResult::Cancelled => {
                    return Err(Error::Cancelled);
                }
            }
        }

        append_updated_files(&output, &batch_written)?;
        outcome.downloaded.extend(batch_written);

        if !failures.is_empty() && !opts.ignore_errors {
            break;
        }

        // Advance only past commits that cannot have pending siblings
        // still on the queue.
        let advance_to = match next_pending {
            Some(next) => processed.iter().filter(|t| **t < next).max().copied(),
            None => Some(end),
        };
        if let Some(to) = advance_to {
            outcome.cursor = Some(cursor::write_cursor(&output, to)?);
        }

        // Cap disk use between batches
        reader.context().fetcher().clear_cache();
    }

    if queue.is_empty() && failures.is_empty() {
        outcome.cursor = Some(cursor::write_cursor(&output, end)?);
    }

    write_error_log(&output, &failures)?;
    outcome.errors = failures.iter().map(|e| e.to_string()).collect();

    info!(
        "Mirror run finished: {} downloaded, {} skipped, {} missing, {} failed",
        outcome.downloaded.len(),
        outcome.skipped,
        outcome.missing,
        failures.len()
    );

    if !failures.is_empty() && !opts.ignore_errors {
        return Err(Error::Aggregate(failures));
    }
    Ok(outcome)
}

/// Dispatch one batch with bounded concurrency
async fn run_batch(
    reader: &CatalogReader,
    opts: &MirrorOptions,
    batch: Vec<CatalogEntry>,
    cancel: &CancellationToken,
) -> Vec<TaskResult> {
    let semaphore = Arc::new(Semaphore::new(opts.max_threads.max(1)));

    stream::iter(batch.into_iter())
        .map(|entry| {
            let permit = semaphore.clone();
            async move {
                let _permit = permit.acquire().await.unwrap();
                download_with_retry(reader, opts, entry, cancel).await
            }
        })
        .buffer_unordered(opts.max_threads.max(1))
        .collect()
        .await
}

/// Drive one entry to a terminal state with the task-level retry policy
///
/// A 404 is a publisher-side gap, logged as a warning and counted as
/// handled; retrying it would never help.
async fn download_with_retry(
    reader: &CatalogReader,
    opts: &MirrorOptions,
    entry: CatalogEntry,
    cancel: &CancellationToken,
) -> TaskResult {
    let mut attempt = 0;
    loop {
        match download_entry(reader, opts, &entry, cancel).await {
            Ok(written) => {
                return TaskResult::Done {
                    entry,
                    written,
                    missing: false,
                };
            }
            Err(Error::NotFound(uri)) => {
                warn!("{} {} is missing upstream: {}", entry.id, entry.version, uri);
                return TaskResult::Done {
                    entry,
                    written: None,
                    missing: true,
                };
            }
            Err(Error::Cancelled) => return TaskResult::Cancelled,
            Err(e) if e.is_retryable() && attempt + 1 < TASK_MAX_ATTEMPTS => {
                let backoff = TASK_RETRY_BASE * (attempt + 1);
                warn!(
                    "{} {} attempt {} failed: {}, retrying in {:?}",
                    entry.id,
                    entry.version,
                    attempt + 1,
                    e,
                    backoff
                );
                tokio::select! {
                    _ = cancel.cancelled() => return TaskResult::Cancelled,
                    _ = tokio::time::sleep(backoff) => {}
                }
                attempt += 1;
            }
            Err(error) => return TaskResult::Failed { entry, error },
        }
    }
}

/// Download one archive into its selected root, honoring the mode
///
/// Returns the destination path when a new file was written.
async fn download_entry(
    reader: &CatalogReader,
    opts: &MirrorOptions,
    entry: &CatalogEntry,
    cancel: &CancellationToken,
) -> Result<Option<PathBuf>> {
    let root = layout::select_root(&opts.roots, opts.layout, entry);
    let dest = opts.layout.nupkg_path(root, entry);
    let exists = dest.exists();

    let refresh = match opts.mode {
        DownloadMode::FailIfExists if exists => {
            return Err(Error::Configuration(format!(
                "{} already exists",
                dest.display()
            )));
        }
        DownloadMode::SkipIfExists if exists => false,
        DownloadMode::OverwriteIfNewer if exists => {
            let mtime: DateTime<Utc> = std::fs::metadata(&dest)?.modified()?.into();
            entry.commit_time > mtime
        }
        _ => true,
    };

    if refresh {
        let ctx = reader.context();
        let uri = entry.nupkg_uri(ctx)?;
        let cached = crate::fetch::fetch_nupkg(ctx.fetcher(), &uri, cancel).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = dest.with_extension("nupkg.part");
        tokio::fs::copy(&cached, &tmp).await?;
        tokio::fs::rename(&tmp, &dest).await?;

        // Stamp file times with the commit timestamp so OverwriteIfNewer
        // comparisons survive process restarts.
        let stamp = FileTime::from_unix_time(
            entry.commit_time.timestamp(),
            entry.commit_time.timestamp_subsec_nanos(),
        );
        filetime::set_file_times(&dest, stamp, stamp)?;
        debug!("Wrote {}", dest.display());
    }

    if opts.layout == Layout::V3 && dest.exists() {
        layout::write_v3_sidecars(&dest, entry, refresh)?;
    }

    Ok(refresh.then_some(dest))
}

/// Append newly written paths to the change log
fn append_updated_files(output: &Path, written: &[PathBuf]) -> Result<()> {
    if written.is_empty() {
        return Ok(());
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(output.join(UPDATED_FILES))?;
    for path in written {
        let absolute = path.canonicalize().unwrap_or_else(|_| path.clone());
        writeln!(file, "{}", absolute.display())?;
    }
    Ok(())
}

/// Rewrite the error log, one flattened message per line
///
/// A clean run removes any log left by a previous one.
fn write_error_log(output: &Path, failures: &[Error]) -> Result<()> {
    let path = output.join(ERROR_LOG);
    if failures.is_empty() {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        return Ok(());
    }

    let mut file = std::fs::File::create(&path)?;
    for failure in failures {
        for leaf in failure.flatten() {
            writeln!(file, "{leaf}")?;
        }
    }
    Ok(())
}
