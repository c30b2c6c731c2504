// src/mirror/cursor.rs

//! Persistent mirror cursor.
//!
//! The cursor marks the last commit timestamp fully processed by a mirror
//! run, stored as `{root}/cursor.json` with a single RFC 3339 field. It is
//! written only after every event at or before it has been handed to the
//! downloader, and it never moves backwards.

use crate::error::Result;
use crate::intern::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CURSOR_FILE: &str = "cursor.json";

#[derive(Debug, Serialize, Deserialize)]
struct CursorDoc {
    cursor: String,
}

/// Path of the cursor file under an output root
pub fn cursor_path(root: &Path) -> PathBuf {
    root.join(CURSOR_FILE)
}

/// Read the persisted cursor, if any
pub fn read_cursor(root: &Path) -> Result<Option<DateTime<Utc>>> {
    let path = cursor_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let body = std::fs::read_to_string(&path)?;
    let doc: CursorDoc = serde_json::from_str(&body)?;
    let parsed = parse_timestamp(&doc.cursor)?;
    debug!("Loaded cursor {} from {}", doc.cursor, path.display());
    Ok(Some(parsed))
}

/// Persist the cursor, atomically and monotonically
///
/// A value older than the one already on disk is ignored; a crashed or
/// concurrent run must never rewind a cursor that was already persisted.
pub fn write_cursor(root: &Path, value: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if let Some(existing) = read_cursor(root)?
        && existing > value
    {
        debug!("Keeping newer on-disk cursor {}", existing.to_rfc3339());
        return Ok(existing);
    }

    std::fs::create_dir_all(root)?;
    let doc = CursorDoc {
        cursor: value.to_rfc3339(),
    };
    let path = cursor_path(root);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(&doc)?)?;
    std::fs::rename(&tmp, &path)?;

    info!("Cursor advanced to {}", doc.cursor);
    Ok(value)
}
