// src/catalog/entry.rs

//! Catalog entries: one package publish/edit/delete event.

use crate::context::FeedContext;
use crate::error::{Error, Result};
use crate::nuspec::Nuspec;
use crate::uris;
use crate::version::NuGetVersion;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Declared type of a catalog event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// `nuget:PackageDetails` — the package was published or edited
    AddOrUpdate,
    /// `nuget:PackageDelete` — the package was removed
    Delete,
}

/// One event from a catalog page
///
/// Identity for equality and hashing is `(lowercased id, version)`; the
/// commit id and timestamp are deliberately not part of it, so that edits
/// of the same package version collapse in identity-keyed sets.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// URI of the catalog leaf document
    pub uri: Arc<str>,
    /// Declared `@type` values
    pub types: Vec<Arc<str>>,
    pub kind: EntryKind,
    pub commit_id: Arc<str>,
    pub commit_time: DateTime<Utc>,
    pub id: Arc<str>,
    pub version: Arc<NuGetVersion>,
}

impl CatalogEntry {
    /// Build an entry from one catalog page item, interning shared values
    pub fn from_page_item(ctx: &FeedContext, page_uri: &str, item: &Value) -> Result<Self> {
        let invalid = |reason: String| Error::ContentInvalid {
            uri: page_uri.to_string(),
            reason,
        };

        let uri = item
            .get("@id")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("page item missing '@id'".to_string()))?;

        let raw_types: Vec<&str> = match item.get("@type") {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => return Err(invalid(format!("page item {uri} missing '@type'"))),
        };

        let kind = if raw_types.iter().any(|t| *t == "nuget:PackageDelete") {
            EntryKind::Delete
        } else if raw_types.iter().any(|t| *t == "nuget:PackageDetails") {
            EntryKind::AddOrUpdate
        } else {
            return Err(invalid(format!(
                "page item {uri} has unrecognized types {raw_types:?}"
            )));
        };

        let field = |name: &str| {
            str_field(item, name).ok_or_else(|| invalid(format!("page item {uri} missing '{name}'")))
        };

        let pool = ctx.pool();
        // Interning the URI segment by segment shares the long common
        // prefixes across thousands of entries.
        for segment in uri.split('/') {
            pool.string(segment);
        }

        Ok(Self {
            uri: pool.string(uri),
            types: raw_types.iter().map(|t| pool.string(t)).collect(),
            kind,
            commit_id: pool.string(field("commitId")?),
            commit_time: pool.date(field("commitTimeStamp")?)?,
            id: pool.string(field("nuget:id")?),
            version: pool.version(field("nuget:version")?)?,
        })
    }

    pub fn is_add_or_update(&self) -> bool {
        self.kind == EntryKind::AddOrUpdate
    }

    pub fn is_delete(&self) -> bool {
        self.kind == EntryKind::Delete
    }

    /// Identity key: lowercased id plus version (metadata included)
    pub fn identity(&self) -> (String, Arc<NuGetVersion>) {
        (self.id.to_lowercase(), self.version.clone())
    }

    /// Canonical archive file name, `{id}.{version}.nupkg` lowercased
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.nupkg",
            self.id.to_lowercase(),
            self.version.normalized_lower()
        )
    }

    /// Archive URI in the flat container
    pub fn nupkg_uri(&self, ctx: &FeedContext) -> Result<String> {
        let base = ctx.service_index().package_base_uri()?;
        Ok(uris::nupkg_uri(base, &self.id, &self.version))
    }

    /// Manifest URI in the flat container
    pub fn nuspec_uri(&self, ctx: &FeedContext) -> Result<String> {
        let base = ctx.service_index().package_base_uri()?;
        Ok(uris::nuspec_uri(base, &self.id, &self.version))
    }

    /// Registration leaf URI for this exact version
    pub fn registration_leaf_uri(&self, ctx: &FeedContext) -> Result<String> {
        let base = ctx.service_index().registration_base_uri()?;
        Ok(uris::registration_leaf_uri(base, &self.id, &self.version))
    }

    /// Registration index URI for the package id
    pub fn registration_index_uri(&self, ctx: &FeedContext) -> Result<String> {
        let base = ctx.service_index().registration_base_uri()?;
        Ok(uris::registration_index_uri(base, &self.id))
    }

    /// Download the archive into `dir` under its canonical file name
    ///
    /// The fetched archive is validated before the copy; the destination
    /// write goes through a temp sibling and an atomic rename.
    pub async fn download_nupkg(
        &self,
        ctx: &FeedContext,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let uri = self.nupkg_uri(ctx)?;
        let cached = crate::fetch::fetch_nupkg(ctx.fetcher(), &uri, cancel).await?;

        let dest = dir.join(self.file_name());
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = dest.with_extension("nupkg.part");
        tokio::fs::copy(&cached, &tmp).await?;
        tokio::fs::rename(&tmp, &dest).await?;

        debug!("Downloaded {} {} to {}", self.id, self.version, dest.display());
        Ok(dest)
    }

    /// Fetch and parse the package manifest
    pub async fn fetch_nuspec(
        &self,
        ctx: &FeedContext,
        cancel: &CancellationToken,
    ) -> Result<Nuspec> {
        let uri = self.nuspec_uri(ctx)?;
        crate::fetch::fetch_manifest(ctx.fetcher(), &uri, cancel).await
    }

    /// Whether this version is listed, per the registration leaf
    ///
    /// An orthogonal query rather than an entity field; a leaf without the
    /// `listed` flag counts as listed.
    pub async fn is_listed(&self, ctx: &FeedContext, cancel: &CancellationToken) -> Result<bool> {
        let uri = self.registration_leaf_uri(ctx)?;
        let leaf = ctx.fetcher().fetch_json(&uri, cancel).await?;
        Ok(leaf.get("listed").and_then(Value::as_bool).unwrap_or(true))
    }
}

fn str_field<'a>(item: &'a Value, name: &str) -> Option<&'a str> {
    item.get(name).and_then(Value::as_str)
}

impl PartialEq for CatalogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id) && self.version == other.version
    }
}

impl Eq for CatalogEntry {}

impl Hash for CatalogEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.to_lowercase().hash(state);
        self.version.hash(state);
    }
}
