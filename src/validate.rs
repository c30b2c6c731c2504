// src/validate.rs

//! Feed validation: reachability of every live archive.

use crate::catalog::{self, CatalogEntry, CatalogReader};
use crate::error::{Error, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One unreachable archive
#[derive(Debug)]
pub struct ValidationFailure {
    pub id: String,
    pub version: String,
    pub uri: String,
    pub message: String,
}

/// Result of a validation pass
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Number of live entries probed
    pub checked: usize,
    /// Failures sorted case-insensitively by id, then version
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Probe every live archive in the window `(min, now - delay]`
pub async fn validate_feed(
    reader: &CatalogReader,
    delay: chrono::Duration,
    max_threads: usize,
    cancel: &CancellationToken,
) -> Result<ValidationReport> {
    let end = Utc::now() - delay;
    let entries = reader
        .flattened_entries(catalog::min_time(), end, cancel)
        .await?;
    info!("Validating {} live package(s)", entries.len());

    let max_threads = max_threads.max(1);
    let semaphore = Arc::new(Semaphore::new(max_threads));
    let ctx = reader.context();

    let probes = stream::iter(entries.into_iter())
        .map(|entry| {
            let permit = semaphore.clone();
            async move {
                let _permit = permit.acquire().await.unwrap();
                let outcome = probe(reader, &entry, cancel).await;
                (entry, outcome)
            }
        })
        .buffer_unordered(max_threads);

    let results: Vec<(CatalogEntry, Result<()>)> = probes.collect().await;

    let mut report = ValidationReport::default();
    for (entry, outcome) in results {
        report.checked += 1;
        match outcome {
            Ok(()) => debug!("{} {} reachable", entry.id, entry.version),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => report.failures.push(ValidationFailure {
                id: entry.id.to_string(),
                version: entry.version.normalized(),
                uri: entry.nupkg_uri(ctx).unwrap_or_default(),
                message: e.to_string(),
            }),
        }
    }

    report.failures.sort_by(|a, b| {
        a.id.to_lowercase()
            .cmp(&b.id.to_lowercase())
            .then_with(|| a.version.cmp(&b.version))
    });

    info!(
        "Validation finished: {} checked, {} failed",
        report.checked,
        report.failures.len()
    );
    Ok(report)
}

async fn probe(
    reader: &CatalogReader,
    entry: &CatalogEntry,
    cancel: &CancellationToken,
) -> Result<()> {
    let ctx = reader.context();
    let uri = entry.nupkg_uri(ctx)?;
    ctx.fetcher().head(&uri, cancel).await
}
