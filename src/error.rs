// src/error.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by feed readers and the mirror driver
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed service index, missing service type, or bad argument
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A fetched document failed schema expectations (JSON/XML/zip)
    #[error("invalid content from {uri}: {reason}")]
    ContentInvalid { uri: String, reason: String },

    /// HTTP failure other than 404; safe to retry
    #[error("transport error for {uri}: {reason}")]
    Transport { uri: String, reason: String },

    /// The resource does not exist (HTTP 404 or missing file)
    #[error("not found: {0}")]
    NotFound(String),

    /// Disk-side failure during archive or log writes
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Version string that does not parse
    #[error("invalid version '{0}': {1}")]
    Version(String, String),

    /// The operation was cancelled before completion
    #[error("operation cancelled")]
    Cancelled,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Collected failures from a batch of tasks
    #[error("{} task(s) failed", .0.len())]
    Aggregate(Vec<Error>),
}

impl Error {
    /// True when a retry at the fetch or task level may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Io(_))
    }

    /// Flatten nested aggregates into individual leaf errors.
    ///
    /// Used when writing the per-run error log: each inner failure gets
    /// its own line rather than one opaque composite message.
    pub fn flatten(&self) -> Vec<&Error> {
        match self {
            Error::Aggregate(inner) => inner.iter().flat_map(|e| e.flatten()).collect(),
            other => vec![other],
        }
    }
}
