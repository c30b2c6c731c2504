// src/service_index.rs

//! Service index: the root document of a NuGet v3 feed.
//!
//! Maps service type strings to base URIs. Loaded exactly once per reader
//! session; a document without a `resources` array is refused, since that
//! means the caller pointed at a catalog leaf or some other JSON, not a
//! feed root.

use crate::error::{Error, Result};
use crate::fetch::FeedFetcher;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Accepted catalog service types, in order of preference
pub const CATALOG_TYPES: &[&str] = &[
    "Catalog/3.0.0",
    "http://schema.emgarten.com/sleet#Catalog/1.0.0",
];

/// Accepted registration base types, in order of preference
pub const REGISTRATION_TYPES: &[&str] = &[
    "RegistrationsBaseUrl/Versioned",
    "RegistrationsBaseUrl/3.6.0",
    "RegistrationsBaseUrl/3.4.0",
    "RegistrationsBaseUrl/3.0.0-beta",
];

/// Flat-container (archive/manifest layout) service type
pub const PACKAGE_BASE_TYPES: &[&str] = &["PackageBaseAddress/3.0.0"];

/// Optional package index service type
pub const PACKAGE_INDEX_TYPES: &[&str] =
    &["http://schema.emgarten.com/sleet#SymbolsPackageIndex/1.0.0"];

/// One `resources[]` element
#[derive(Debug, Clone)]
struct ServiceResource {
    uri: String,
    types: Vec<String>,
}

/// Parsed service index
#[derive(Debug, Clone)]
pub struct ServiceIndex {
    /// URI the index was loaded from
    uri: String,
    resources: Vec<ServiceResource>,
}

impl ServiceIndex {
    /// Fetch and parse the service index at `index_uri`
    pub async fn load(
        fetcher: &dyn FeedFetcher,
        index_uri: &str,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let doc = fetcher.fetch_json(index_uri, cancel).await?;
        Self::from_json(index_uri, &doc)
    }

    /// Parse an already-fetched root document
    pub fn from_json(index_uri: &str, doc: &Value) -> Result<Self> {
        let resources = doc.get("resources").and_then(Value::as_array).ok_or_else(|| {
            Error::Configuration(format!(
                "{index_uri} is not a service index: no 'resources' array"
            ))
        })?;

        let mut parsed = Vec::with_capacity(resources.len());
        for resource in resources {
            let Some(uri) = resource.get("@id").and_then(Value::as_str) else {
                continue;
            };
            // '@type' is normally a string; some publishers emit an array
            let types = match resource.get("@type") {
                Some(Value::String(s)) => vec![s.clone()],
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => continue,
            };
            parsed.push(ServiceResource {
                uri: uri.to_string(),
                types,
            });
        }

        debug!("Service index {} with {} resources", index_uri, parsed.len());
        Ok(Self {
            uri: index_uri.to_string(),
            resources: parsed,
        })
    }

    /// URI this index was loaded from
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Find the first resource matching the preferred types, in order
    pub fn resource(&self, preferred: &[&str]) -> Option<&str> {
        for wanted in preferred {
            for resource in &self.resources {
                if resource.types.iter().any(|t| t == wanted) {
                    return Some(&resource.uri);
                }
            }
        }
        None
    }

    fn required(&self, preferred: &[&str]) -> Result<&str> {
        self.resource(preferred).ok_or_else(|| {
            Error::Configuration(format!(
                "{} declares none of the service types {:?}",
                self.uri, preferred
            ))
        })
    }

    /// Catalog root URI
    pub fn catalog_uri(&self) -> Result<&str> {
        self.required(CATALOG_TYPES)
    }

    /// Whether the feed exposes a catalog at all
    ///
    /// Absence is a successful negative, not an error; catalog-less feeds
    /// are read through [`crate::feed::FeedReader`].
    pub fn has_catalog(&self) -> bool {
        self.resource(CATALOG_TYPES).is_some()
    }

    /// Flat-container base URI (archives and manifests)
    pub fn package_base_uri(&self) -> Result<&str> {
        self.required(PACKAGE_BASE_TYPES)
    }

    /// Registration base URI, preferring versioned variants
    pub fn registration_base_uri(&self) -> Result<&str> {
        self.required(REGISTRATION_TYPES)
    }

    /// Optional package index URI
    pub fn package_index_uri(&self) -> Option<&str> {
        self.resource(PACKAGE_INDEX_TYPES)
    }
}
