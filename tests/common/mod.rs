// tests/common/mod.rs

//! Shared test fixture: a complete feed published to a temp directory.
//!
//! Builds a service index, catalog (root plus pages of a configurable
//! size), flat-container tree with real zip archives, and registration
//! leaves. Read through `LocalFetcher` under a fixed https base URI.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use feedmirror::{CatalogReader, FeedContext, LocalFetcher};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const BASE_URI: &str = "https://localhost:8080/testFeed";

#[derive(Clone)]
struct Event {
    id: String,
    version: String,
    time: DateTime<Utc>,
    delete: bool,
    seq: usize,
}

/// A feed published to disk, one JSON document and archive at a time
pub struct TestFeed {
    pub dir: TempDir,
    page_size: usize,
    events: Vec<Event>,
    clock: DateTime<Utc>,
}

impl TestFeed {
    pub fn new(page_size: usize) -> Self {
        let feed = Self {
            dir: tempfile::tempdir().unwrap(),
            page_size,
            events: Vec::new(),
            clock: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
        };
        feed.write_service_index();
        feed.write_catalog();
        feed
    }

    pub fn index_uri(&self) -> String {
        format!("{BASE_URI}/index.json")
    }

    pub fn fetcher(&self) -> Arc<LocalFetcher> {
        Arc::new(LocalFetcher::new(self.dir.path(), BASE_URI))
    }

    pub async fn reader(&self) -> CatalogReader {
        let cancel = tokio_util::sync::CancellationToken::new();
        let ctx = Arc::new(
            FeedContext::connect(self.fetcher(), &self.index_uri(), &cancel)
                .await
                .unwrap(),
        );
        CatalogReader::new(ctx)
    }

    fn next_time(&mut self) -> DateTime<Utc> {
        self.clock = self.clock + Duration::seconds(1);
        self.clock
    }

    /// Publish `(id, version)`, superseding any live copy first
    ///
    /// Re-publishing an already-live version inserts the implicit delete a
    /// real publisher emits for the superseded edit.
    pub fn publish(&mut self, id: &str, version: &str) -> DateTime<Utc> {
        if self.is_live(id, version) {
            let time = self.next_time();
            self.push_event(id, version, time, true);
        }

        let time = self.next_time();
        self.push_event(id, version, time, false);
        self.write_nupkg(id, version);
        self.write_registration_leaf(id, version, true);
        self.write_flatcontainer_indexes();
        self.write_catalog();
        time
    }

    /// Append a delete event for `(id, version)`
    pub fn delete(&mut self, id: &str, version: &str) -> DateTime<Utc> {
        let time = self.next_time();
        self.push_event(id, version, time, true);
        self.write_flatcontainer_indexes();
        self.write_catalog();
        time
    }

    /// Drop the archive from the flat container (leaves the catalog alone)
    pub fn remove_nupkg(&self, id: &str, version: &str) {
        std::fs::remove_file(self.nupkg_path(id, version)).unwrap();
    }

    pub fn nupkg_path(&self, id: &str, version: &str) -> PathBuf {
        let id = id.to_lowercase();
        let version = version.to_lowercase();
        self.dir
            .path()
            .join("flatcontainer")
            .join(&id)
            .join(&version)
            .join(format!("{id}.{version}.nupkg"))
    }

    fn is_live(&self, id: &str, version: &str) -> bool {
        let mut live = false;
        for event in &self.events {
            if event.id.eq_ignore_ascii_case(id) && event.version == version {
                live = !event.delete;
            }
        }
        live
    }

    fn push_event(&mut self, id: &str, version: &str, time: DateTime<Utc>, delete: bool) {
        let seq = self.events.len();
        self.events.push(Event {
            id: id.to_string(),
            version: version.to_string(),
            time,
            delete,
            seq,
        });
    }

    fn write_json(&self, relative: &str, doc: &serde_json::Value) {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_vec_pretty(doc).unwrap()).unwrap();
    }

    fn write_service_index(&self) {
        self.write_json(
            "index.json",
            &json!({
                "version": "3.0.0",
                "resources": [
                    { "@id": format!("{BASE_URI}/catalog/index.json"), "@type": "Catalog/3.0.0" },
                    { "@id": format!("{BASE_URI}/flatcontainer/"), "@type": "PackageBaseAddress/3.0.0" },
                    { "@id": format!("{BASE_URI}/registration/"), "@type": "RegistrationsBaseUrl/3.6.0" }
                ]
            }),
        );
    }

    fn write_catalog(&self) {
        let pages: Vec<&[Event]> = self.events.chunks(self.page_size).collect();

        let mut page_items = Vec::new();
        for (n, page) in pages.iter().enumerate() {
            let commit_time = page.iter().map(|e| e.time).max().unwrap();
            page_items.push(json!({
                "@id": format!("{BASE_URI}/catalog/page{n}.json"),
                "@type": "CatalogPage",
                "commitId": format!("commit-{}", page.last().unwrap().seq),
                "commitTimeStamp": commit_time.to_rfc3339()
            }));

            let items: Vec<_> = page
                .iter()
                .map(|e| {
                    json!({
                        "@id": format!(
                            "{BASE_URI}/catalog/data/{}/{}.{}.json",
                            e.seq,
                            e.id.to_lowercase(),
                            e.version.to_lowercase()
                        ),
                        "@type": if e.delete { "nuget:PackageDelete" } else { "nuget:PackageDetails" },
                        "commitId": format!("commit-{}", e.seq),
                        "commitTimeStamp": e.time.to_rfc3339(),
                        "nuget:id": e.id,
                        "nuget:version": e.version
                    })
                })
                .collect();

            self.write_json(
                &format!("catalog/page{n}.json"),
                &json!({
                    "@id": format!("{BASE_URI}/catalog/page{n}.json"),
                    "commitId": format!("commit-{}", page.last().unwrap().seq),
                    "commitTimeStamp": commit_time.to_rfc3339(),
                    "items": items
                }),
            );
        }

        self.write_json(
            "catalog/index.json",
            &json!({
                "@id": format!("{BASE_URI}/catalog/index.json"),
                "@type": "CatalogRoot",
                "items": page_items
            }),
        );
    }

    fn write_nupkg(&self, id: &str, version: &str) {
        let path = self.nupkg_path(id, version);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let nuspec = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>{id}</id>
    <version>{version}</version>
    <authors>testFeed</authors>
    <description>test package {id}</description>
  </metadata>
</package>"#
        );

        let file = std::fs::File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        zip.start_file(format!("{id}.nuspec"), options).unwrap();
        zip.write_all(nuspec.as_bytes()).unwrap();
        zip.start_file("lib/netstandard2.0/placeholder.dll", options)
            .unwrap();
        zip.write_all(format!("{id} {version}").as_bytes()).unwrap();
        zip.finish().unwrap();

        // The flat container also serves the manifest on its own
        let nuspec_path = path
            .parent()
            .unwrap()
            .join(format!("{}.nuspec", id.to_lowercase()));
        std::fs::write(nuspec_path, nuspec.as_bytes()).unwrap();
    }

    fn write_registration_leaf(&self, id: &str, version: &str, listed: bool) {
        self.write_json(
            &format!(
                "registration/{}/{}.json",
                id.to_lowercase(),
                version.to_lowercase()
            ),
            &json!({ "listed": listed }),
        );
    }

    fn write_flatcontainer_indexes(&self) {
        let mut by_id: std::collections::BTreeMap<String, Vec<String>> = Default::default();
        for event in &self.events {
            let versions = by_id.entry(event.id.to_lowercase()).or_default();
            let lower = event.version.to_lowercase();
            if event.delete {
                versions.retain(|v| *v != lower);
            } else if !versions.contains(&lower) {
                versions.push(lower);
            }
        }

        for (id, versions) in by_id {
            self.write_json(
                &format!("flatcontainer/{id}/index.json"),
                &json!({ "versions": versions }),
            );
        }
    }
}

/// A service index without a catalog resource
pub fn catalog_less_index(dir: &TempDir) {
    let doc = json!({
        "version": "3.0.0",
        "resources": [
            { "@id": format!("{BASE_URI}/flatcontainer/"), "@type": "PackageBaseAddress/3.0.0" }
        ]
    });
    std::fs::write(
        dir.path().join("index.json"),
        serde_json::to_vec_pretty(&doc).unwrap(),
    )
    .unwrap();
}

