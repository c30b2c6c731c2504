// src/context.rs

//! Shared state for one reader session.
//!
//! The service index, fetch fabric, and intern pool are shared by every
//! reader and entry created from a session. Entries carry plain data and
//! take the context as an argument for any operation that fetches, instead
//! of holding back-references.

use crate::error::Result;
use crate::fetch::FeedFetcher;
use crate::intern::InternPool;
use crate::service_index::ServiceIndex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One reader session against a feed
pub struct FeedContext {
    service_index: ServiceIndex,
    fetcher: Arc<dyn FeedFetcher>,
    pool: InternPool,
}

impl FeedContext {
    /// Load the service index and open a session
    pub async fn connect(
        fetcher: Arc<dyn FeedFetcher>,
        index_uri: &str,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let service_index = ServiceIndex::load(fetcher.as_ref(), index_uri, cancel).await?;
        Ok(Self {
            service_index,
            fetcher,
            pool: InternPool::new(),
        })
    }

    /// Open a session from an already-parsed service index
    pub fn from_parts(service_index: ServiceIndex, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            service_index,
            fetcher,
            pool: InternPool::new(),
        }
    }

    pub fn service_index(&self) -> &ServiceIndex {
        &self.service_index
    }

    pub fn fetcher(&self) -> &dyn FeedFetcher {
        self.fetcher.as_ref()
    }

    pub fn pool(&self) -> &InternPool {
        &self.pool
    }
}
