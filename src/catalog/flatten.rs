// src/catalog/flatten.rs

//! Collapse the event stream to the live package set.

use crate::catalog::entry::CatalogEntry;
use crate::version::NuGetVersion;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

/// Reduce entries to the most recent non-deleted event per identity
///
/// Input order does not matter; entries are sorted descending by commit
/// timestamp here (stable, so ties keep their incoming page order and the
/// output is identical across runs). Walking newest-first, the first event
/// per identity decides: a delete shadows every older add, an add that is
/// not shadowed wins.
pub fn flatten(mut entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    entries.sort_by(|a, b| b.commit_time.cmp(&a.commit_time));

    let mut live: Vec<CatalogEntry> = Vec::new();
    let mut live_keys: HashSet<(String, Arc<NuGetVersion>)> = HashSet::new();
    let mut deleted: HashSet<(String, Arc<NuGetVersion>)> = HashSet::new();

    for entry in entries {
        let key = entry.identity();
        if entry.is_delete() {
            deleted.insert(key);
        } else if !deleted.contains(&key) && live_keys.insert(key) {
            live.push(entry);
        }
    }

    // Already newest-first from the stable sort above
    live
}

/// Group flattened entries into `id -> ascending set of versions`
///
/// Ids group case-insensitively; the first-seen spelling is kept for
/// display.
pub fn package_set(flattened: &[CatalogEntry]) -> BTreeMap<String, BTreeSet<Arc<NuGetVersion>>> {
    let mut spellings: BTreeMap<String, String> = BTreeMap::new();
    let mut sets: BTreeMap<String, BTreeSet<Arc<NuGetVersion>>> = BTreeMap::new();

    for entry in flattened {
        let lower = entry.id.to_lowercase();
        let display = spellings
            .entry(lower)
            .or_insert_with(|| entry.id.to_string())
            .clone();
        sets.entry(display).or_default().insert(entry.version.clone());
    }

    sets
}
