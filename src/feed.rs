// src/feed.rs

//! Catalog-less feed reading via the flat container.
//!
//! Some repositories expose a package-base-address but no catalog. This
//! reader enumerates versions per package id from the per-id index
//! document, materializing entry records with unknown commit metadata.

use crate::catalog::{self, CatalogEntry, EntryKind};
use crate::context::FeedContext;
use crate::error::{Error, Result};
use crate::uris;
use crate::version::NuGetVersion;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Reader over the package-base-address service only
pub struct FeedReader {
    ctx: Arc<FeedContext>,
}

impl FeedReader {
    pub fn new(ctx: Arc<FeedContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<FeedContext> {
        &self.ctx
    }

    /// Whether the feed also publishes a catalog
    ///
    /// Absence is a successful negative; callers fall back to this reader.
    pub fn has_catalog(&self) -> bool {
        self.ctx.service_index().has_catalog()
    }

    /// Versions published for `id`, ascending
    ///
    /// A missing per-id index means the package has no versions, not an
    /// error.
    pub async fn versions(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<NuGetVersion>>> {
        let base = self.ctx.service_index().package_base_uri()?;
        let uri = uris::package_index_uri(base, id);

        let doc = match self.ctx.fetcher().fetch_json(&uri, cancel).await {
            Ok(doc) => doc,
            Err(Error::NotFound(_)) => {
                debug!("No flat-container index for {}", id);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let raw = doc
            .get("versions")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::ContentInvalid {
                uri: uri.clone(),
                reason: "per-id index has no 'versions' array".to_string(),
            })?;

        let pool = self.ctx.pool();
        let mut versions = Vec::with_capacity(raw.len());
        for v in raw {
            let s = v.as_str().ok_or_else(|| Error::ContentInvalid {
                uri: uri.clone(),
                reason: "non-string entry in 'versions'".to_string(),
            })?;
            versions.push(pool.version(s)?);
        }

        versions.sort();
        Ok(versions)
    }

    /// Entry records for every version of `id`
    ///
    /// The flat container carries no commit metadata; records use the
    /// minimum timestamp and an empty commit id.
    pub async fn entries_for(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogEntry>> {
        let base = self.ctx.service_index().package_base_uri()?;
        let pool = self.ctx.pool();
        let id_arc = pool.string(id);

        let versions = self.versions(id, cancel).await?;
        let entries = versions
            .into_iter()
            .map(|version| CatalogEntry {
                uri: pool.string(&uris::package_index_uri(base, id)),
                types: Vec::new(),
                kind: EntryKind::AddOrUpdate,
                commit_id: pool.string(""),
                commit_time: catalog::min_time(),
                id: id_arc.clone(),
                version,
            })
            .collect();
        Ok(entries)
    }
}
