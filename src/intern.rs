// src/intern.rs

//! Reference interning for repeated catalog values.
//!
//! A large catalog repeats the same ids, type strings, timestamps, and
//! versions across thousands of entries. Interning them through one pool
//! per reader session bounds memory: insert-or-get with first-writer-wins,
//! safe for concurrent page readers.

use crate::error::{Error, Result};
use crate::version::NuGetVersion;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Shared value pool for one reader session
#[derive(Debug, Default)]
pub struct InternPool {
    strings: DashMap<String, Arc<str>>,
    dates: DashMap<String, DateTime<Utc>>,
    versions: DashMap<String, Arc<NuGetVersion>>,
}

impl InternPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning the shared copy
    pub fn string(&self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return existing.clone();
        }
        self.strings
            .entry(s.to_string())
            .or_insert_with(|| Arc::from(s))
            .clone()
    }

    /// Parse and intern an ISO-8601 timestamp
    ///
    /// Timestamps arrive as JSON strings and are parsed here with a single
    /// fixed format, never by the JSON layer.
    pub fn date(&self, s: &str) -> Result<DateTime<Utc>> {
        if let Some(existing) = self.dates.get(s) {
            return Ok(*existing);
        }
        let parsed = parse_timestamp(s)?;
        self.dates.insert(s.to_string(), parsed);
        Ok(parsed)
    }

    /// Parse and intern a version string
    pub fn version(&self, s: &str) -> Result<Arc<NuGetVersion>> {
        if let Some(existing) = self.versions.get(s) {
            return Ok(existing.clone());
        }
        let parsed = Arc::new(NuGetVersion::parse(s)?);
        Ok(self
            .versions
            .entry(s.to_string())
            .or_insert(parsed)
            .clone())
    }

    /// Number of distinct strings held (diagnostics)
    pub fn len(&self) -> usize {
        self.strings.len() + self.dates.len() + self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse an ISO-8601 timestamp with offset into UTC
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::ContentInvalid {
            uri: String::new(),
            reason: format!("invalid timestamp '{s}': {e}"),
        })
}
