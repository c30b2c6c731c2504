// src/uris.rs

//! Canonical URI construction for package resources.
//!
//! All paths use the lowercased package id and the lowercased normalized
//! version (build metadata stripped). Base URIs are normalized by trimming
//! the trailing `/`.

use crate::version::NuGetVersion;

/// Trim a trailing slash from a base URI
pub fn trim_base(base: &str) -> &str {
    base.trim_end_matches('/')
}

/// `{base}/{id}/{version}/{id}.{version}.nupkg`
pub fn nupkg_uri(package_base: &str, id: &str, version: &NuGetVersion) -> String {
    let id = id.to_lowercase();
    let ver = version.normalized_lower();
    format!("{}/{id}/{ver}/{id}.{ver}.nupkg", trim_base(package_base))
}

/// `{base}/{id}/{version}/{id}.nuspec`
pub fn nuspec_uri(package_base: &str, id: &str, version: &NuGetVersion) -> String {
    let id = id.to_lowercase();
    let ver = version.normalized_lower();
    format!("{}/{id}/{ver}/{id}.nuspec", trim_base(package_base))
}

/// `{base}/{id}/index.json` — the flat-container per-id version list
pub fn package_index_uri(package_base: &str, id: &str) -> String {
    format!("{}/{}/index.json", trim_base(package_base), id.to_lowercase())
}

/// `{registrationBase}/{id}/{version}.json`
pub fn registration_leaf_uri(registration_base: &str, id: &str, version: &NuGetVersion) -> String {
    format!(
        "{}/{}/{}.json",
        trim_base(registration_base),
        id.to_lowercase(),
        version.normalized_lower()
    )
}

/// `{registrationBase}/{id}/index.json`
pub fn registration_index_uri(registration_base: &str, id: &str) -> String {
    format!(
        "{}/{}/index.json",
        trim_base(registration_base),
        id.to_lowercase()
    )
}
