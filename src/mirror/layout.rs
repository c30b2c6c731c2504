// src/mirror/layout.rs

//! On-disk archive layouts and storage-root selection.

use crate::catalog::CatalogEntry;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory layout for mirrored archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Layout {
    /// `{root}/{id}/{id}.{version}.nupkg`
    V2,
    /// `{root}/{id}/{version}/{id}.{version}.nupkg` plus hash and manifest sidecars
    #[default]
    V3,
}

/// Behavior when the destination archive already exists
///
/// Discriminants are distinct by construction; `SkipIfExists` is the
/// short-circuit on an existing valid file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DownloadMode {
    FailIfExists,
    SkipIfExists,
    /// Write only when the catalog commit is strictly later than the
    /// on-disk modification time
    #[default]
    OverwriteIfNewer,
    Force,
}

impl Layout {
    /// Directory holding the archive for `(id, version)` under `root`
    pub fn package_dir(&self, root: &Path, entry: &CatalogEntry) -> PathBuf {
        let id = entry.id.to_lowercase();
        match self {
            Layout::V2 => root.join(id),
            Layout::V3 => root.join(id).join(entry.version.normalized_lower()),
        }
    }

    /// Full archive path for `(id, version)` under `root`
    pub fn nupkg_path(&self, root: &Path, entry: &CatalogEntry) -> PathBuf {
        self.package_dir(root, entry).join(entry.file_name())
    }
}

/// Pick the storage root for an entry
///
/// A root already holding the archive wins, so refreshes land next to the
/// existing copy. Otherwise the root whose filesystem has the most free
/// space is chosen; ties keep configuration order, which is deterministic
/// within a run.
pub fn select_root<'a>(roots: &'a [PathBuf], layout: Layout, entry: &CatalogEntry) -> &'a Path {
    assert!(!roots.is_empty(), "at least one storage root is required");

    for root in roots {
        if layout.nupkg_path(root, entry).exists() {
            return root;
        }
    }

    let mut best: &Path = &roots[0];
    let mut best_free = free_space(best);
    for root in &roots[1..] {
        let free = free_space(root);
        if free > best_free {
            best = root;
            best_free = free;
        }
    }
    best
}

/// Free space of the filesystem containing `path`
///
/// Walks up to the nearest existing ancestor so roots that do not exist
/// yet still report their filesystem, not zero.
fn free_space(path: &Path) -> u64 {
    let mut probe = path;
    loop {
        if probe.exists() {
            return fs2::available_space(probe).unwrap_or(0);
        }
        match probe.parent() {
            Some(parent) => probe = parent,
            None => return 0,
        }
    }
}

/// Write the V3 sidecars next to an archive
///
/// `{version}.nupkg.sha512` holds the base64 SHA-512 of the archive bytes;
/// `{id}.nuspec` is the manifest extracted from the archive. Called after
/// a fresh write, and again whenever either sidecar is missing.
pub fn write_v3_sidecars(archive: &Path, entry: &CatalogEntry, refreshed: bool) -> Result<()> {
    let dir = archive
        .parent()
        .ok_or_else(|| Error::Configuration(format!("{} has no parent", archive.display())))?;

    let hash_path = dir.join(format!("{}.sha512", archive_file_name(archive)?));
    if refreshed || !hash_path.exists() {
        let digest = sha512_base64(archive)?;
        let tmp = hash_path.with_extension("sha512.tmp");
        std::fs::write(&tmp, &digest)?;
        std::fs::rename(&tmp, &hash_path)?;
        debug!("Wrote {}", hash_path.display());
    }

    let nuspec_path = dir.join(format!("{}.nuspec", entry.id.to_lowercase()));
    if refreshed || !nuspec_path.exists() {
        crate::nuspec::extract_nuspec(archive, &nuspec_path)?;
        debug!("Wrote {}", nuspec_path.display());
    }

    Ok(())
}

fn archive_file_name(archive: &Path) -> Result<&str> {
    archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Configuration(format!("bad archive path {}", archive.display())))
}

/// Base64 of the SHA-512 over a file's bytes
pub fn sha512_base64(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha512::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(BASE64.encode(hasher.finalize()))
}
