// src/commands/validate.rs
//! `feedmirror validate` — archive reachability check

use crate::error::{Error, Result};
use crate::validate::validate_feed;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Probe every live archive; error unless all are reachable
pub async fn cmd_validate(
    feed_index: &str,
    delay_minutes: i64,
    max_threads: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let reader = super::open_reader(feed_index, max_threads, cancel).await?;
    let report = validate_feed(
        &reader,
        chrono::Duration::minutes(delay_minutes),
        max_threads,
        cancel,
    )
    .await?;

    for failure in &report.failures {
        error!(
            "{} {} unreachable at {}: {}",
            failure.id, failure.version, failure.uri, failure.message
        );
    }

    println!(
        "checked {} package(s), {} failure(s)",
        report.checked,
        report.failures.len()
    );

    if report.ok() {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "validation failed for {} package(s)",
            report.failures.len()
        )))
    }
}
