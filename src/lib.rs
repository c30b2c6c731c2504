// src/lib.rs

//! feedmirror
//!
//! Reader and mirror for NuGet v3 feeds built around the catalog resource:
//! an append-only, time-ordered log of package publish, edit, and delete
//! events exposed as paginated JSON.
//!
//! # Architecture
//!
//! - Fetch fabric: transport abstraction over HTTP and local directory
//!   trees, with response caching and retry
//! - Catalog reader: windowed traversal of the event log with bounded
//!   concurrency, flattened to the live package set
//! - Mirror driver: cursored, batched replication of archives into a
//!   deterministic directory layout
//! - Validator: reachability check over every live archive

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod context;
mod error;
pub mod feed;
pub mod fetch;
pub mod intern;
pub mod mirror;
pub mod nuspec;
pub mod service_index;
pub mod uris;
pub mod validate;
pub mod version;

pub use catalog::{CatalogEntry, CatalogPage, CatalogReader, EntryKind};
pub use context::FeedContext;
pub use error::{Error, Result};
pub use feed::FeedReader;
pub use fetch::{FeedFetcher, HttpFetcher, LocalFetcher};
pub use intern::InternPool;
pub use mirror::{DownloadMode, IdFilter, Layout, MirrorOptions, MirrorOutcome, run_mirror};
pub use nuspec::{Nuspec, NuspecDependency};
pub use service_index::ServiceIndex;
pub use validate::{ValidationReport, validate_feed};
pub use version::NuGetVersion;
