// tests/catalog.rs

//! Catalog traversal, flattening, and windowing against a local feed.

mod common;

use common::{BASE_URI, TestFeed};
use feedmirror::catalog::min_time;
use feedmirror::{FeedContext, FeedReader};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

#[tokio::test]
async fn empty_catalog_yields_nothing() {
    let feed = TestFeed::new(2);
    let reader = feed.reader().await;

    let entries = reader.all_entries(&cancel()).await.unwrap();
    assert!(entries.is_empty());

    let flat = reader
        .flattened_entries(min_time(), chrono::Utc::now(), &cancel())
        .await
        .unwrap();
    assert!(flat.is_empty());

    let set = reader
        .package_set(min_time(), chrono::Utc::now(), &cancel())
        .await
        .unwrap();
    assert!(set.is_empty());
}

#[tokio::test]
async fn single_publish_round_trips() {
    let mut feed = TestFeed::new(2);
    feed.publish("a", "1.0.0");
    let reader = feed.reader().await;

    let entries = reader.all_entries(&cancel()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id.as_ref(), "a");
    assert_eq!(entries[0].version.normalized(), "1.0.0");

    let flat = reader
        .flattened_entries(min_time(), chrono::Utc::now(), &cancel())
        .await
        .unwrap();
    assert_eq!(flat.len(), 1);

    let set = reader
        .package_set(min_time(), chrono::Utc::now(), &cancel())
        .await
        .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set["a"].len(), 1);
}

#[tokio::test]
async fn three_republishes_collapse_to_one() {
    let mut feed = TestFeed::new(2);
    feed.publish("a", "1.0.0");
    feed.publish("a", "1.0.0");
    feed.publish("a", "1.0.0");
    let reader = feed.reader().await;

    // 3 adds plus 2 implicit deletes for the superseded edits
    let entries = reader.all_entries(&cancel()).await.unwrap();
    assert_eq!(entries.len(), 5);

    let flat = reader
        .flattened_entries(min_time(), chrono::Utc::now(), &cancel())
        .await
        .unwrap();
    assert_eq!(flat.len(), 1);
    assert!(flat[0].is_add_or_update());

    let set = reader
        .package_set(min_time(), chrono::Utc::now(), &cancel())
        .await
        .unwrap();
    assert_eq!(set.len(), 1);
    let versions: Vec<_> = set["a"].iter().map(|v| v.normalized()).collect();
    assert_eq!(versions, vec!["1.0.0"]);
}

#[tokio::test]
async fn entry_fields_and_uris() {
    let mut feed = TestFeed::new(2);
    feed.publish("a", "1.0.0.1-RC.1.2.b0.1+meta.blah.1");
    let reader = feed.reader().await;
    let ctx = reader.context();

    let entries = reader.all_entries(&cancel()).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];

    assert_eq!(entry.id.as_ref(), "a");
    assert_eq!(entry.version.normalized(), "1.0.0.1-RC.1.2.b0.1");
    assert!(!entry.commit_id.is_empty());
    assert!(entry.commit_time > min_time());
    assert!(entry.is_add_or_update());
    assert!(!entry.is_delete());
    assert!(
        entry
            .types
            .iter()
            .any(|t| t.as_ref() == "nuget:PackageDetails")
    );

    assert_eq!(
        entry.nupkg_uri(ctx).unwrap(),
        format!(
            "{BASE_URI}/flatcontainer/a/1.0.0.1-rc.1.2.b0.1/a.1.0.0.1-rc.1.2.b0.1.nupkg"
        )
    );
    assert_eq!(
        entry.nuspec_uri(ctx).unwrap(),
        format!("{BASE_URI}/flatcontainer/a/1.0.0.1-rc.1.2.b0.1/a.nuspec")
    );
    assert_eq!(
        entry.registration_index_uri(ctx).unwrap(),
        format!("{BASE_URI}/registration/a/index.json")
    );
}

#[tokio::test]
async fn window_excludes_start_includes_end() {
    let mut feed = TestFeed::new(2);
    let times: Vec<_> = (0..10)
        .map(|n| feed.publish(&format!("pkg{n}"), "1.0.0"))
        .collect();
    let reader = feed.reader().await;

    let entries = reader
        .entries(times[2], times[7], &cancel())
        .await
        .unwrap();
    assert_eq!(entries.len(), 5);

    let ids: HashSet<String> = entries.iter().map(|e| e.id.to_string()).collect();
    for n in 3..=7 {
        assert!(ids.contains(&format!("pkg{n}")), "pkg{n} missing");
    }
    assert!(!ids.contains("pkg2"));
    assert!(!ids.contains("pkg8"));
}

#[tokio::test]
async fn traversal_splits_at_any_point() {
    let mut feed = TestFeed::new(2);
    let times: Vec<_> = (0..8)
        .map(|n| feed.publish(&format!("pkg{n}"), "1.0.0"))
        .collect();
    feed.publish("pkg3", "1.0.0");
    let reader = feed.reader().await;

    let key = |e: &feedmirror::CatalogEntry| {
        (
            e.id.to_string(),
            e.version.normalized(),
            e.commit_id.to_string(),
        )
    };

    let end = chrono::Utc::now();
    let whole: Vec<_> = reader
        .entries(min_time(), end, &cancel())
        .await
        .unwrap()
        .iter()
        .map(key)
        .collect();

    for split in [times[0], times[3], times[7]] {
        let mut joined: Vec<_> = reader
            .entries(min_time(), split, &cancel())
            .await
            .unwrap()
            .iter()
            .map(key)
            .collect();
        joined.extend(
            reader
                .entries(split, end, &cancel())
                .await
                .unwrap()
                .iter()
                .map(key),
        );

        let mut left = whole.clone();
        left.sort();
        joined.sort();
        assert_eq!(left, joined, "resume at {split} loses or duplicates events");
    }
}

#[tokio::test]
async fn delete_removes_from_flattened_view() {
    let mut feed = TestFeed::new(2);
    feed.publish("keep", "1.0.0");
    feed.publish("gone", "1.0.0");
    feed.delete("gone", "1.0.0");
    let reader = feed.reader().await;

    let flat = reader
        .flattened_entries(min_time(), chrono::Utc::now(), &cancel())
        .await
        .unwrap();
    assert_eq!(flat.len(), 1);
    assert_eq!(flat[0].id.as_ref(), "keep");
}

#[tokio::test]
async fn flattened_never_larger_than_raw() {
    let mut feed = TestFeed::new(2);
    for n in 0..5 {
        feed.publish(&format!("p{n}"), "1.0.0");
    }
    feed.publish("p0", "1.0.0");
    feed.delete("p1", "1.0.0");
    let reader = feed.reader().await;

    let raw = reader.all_entries(&cancel()).await.unwrap();
    let flat = reader
        .flattened_entries(min_time(), chrono::Utc::now(), &cancel())
        .await
        .unwrap();
    assert!(flat.len() <= raw.len());
    assert_eq!(flat.len(), 4);
}

#[tokio::test]
async fn registration_leaf_answers_listed() {
    let mut feed = TestFeed::new(2);
    feed.publish("a", "1.0.0");
    let reader = feed.reader().await;
    let ctx = reader.context();

    let entries = reader.all_entries(&cancel()).await.unwrap();
    assert!(entries[0].is_listed(ctx, &cancel()).await.unwrap());
}

#[tokio::test]
async fn nuspec_fetch_parses_manifest() {
    let mut feed = TestFeed::new(2);
    feed.publish("Some.Package", "2.1.0");
    let reader = feed.reader().await;
    let ctx = reader.context();

    let entries = reader.all_entries(&cancel()).await.unwrap();
    let nuspec = entries[0].fetch_nuspec(ctx, &cancel()).await.unwrap();
    assert_eq!(nuspec.id, "Some.Package");
    assert_eq!(nuspec.version.normalized(), "2.1.0");
}

#[tokio::test]
async fn entry_download_writes_canonical_file_name() {
    let mut feed = TestFeed::new(2);
    feed.publish("Mixed.Case", "1.0.0-Beta");
    let reader = feed.reader().await;
    let ctx = reader.context();
    let out = tempfile::tempdir().unwrap();

    let entries = reader.all_entries(&cancel()).await.unwrap();
    let path = entries[0]
        .download_nupkg(ctx, out.path(), &cancel())
        .await
        .unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "mixed.case.1.0.0-beta.nupkg"
    );
    assert!(path.is_file());
}

#[tokio::test]
async fn feed_reader_enumerates_versions_without_catalog() {
    let mut feed = TestFeed::new(2);
    feed.publish("multi", "1.0.0");
    feed.publish("multi", "2.0.0-beta");
    feed.publish("multi", "2.0.0");
    common::catalog_less_index(&feed.dir);

    let c = cancel();
    let ctx = Arc::new(
        FeedContext::connect(feed.fetcher(), &feed.index_uri(), &c)
            .await
            .unwrap(),
    );
    let reader = FeedReader::new(ctx);

    // Catalog absence is a successful negative
    assert!(!reader.has_catalog());

    let versions = reader.versions("multi", &c).await.unwrap();
    let normalized: Vec<_> = versions.iter().map(|v| v.normalized()).collect();
    assert_eq!(normalized, vec!["1.0.0", "2.0.0-beta", "2.0.0"]);

    let entries = reader.entries_for("multi", &c).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.is_add_or_update()));

    assert!(reader.versions("absent", &c).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_traversal_surfaces_as_error() {
    let mut feed = TestFeed::new(2);
    feed.publish("a", "1.0.0");
    let reader = feed.reader().await;

    let c = cancel();
    c.cancel();
    let err = reader.all_entries(&c).await.unwrap_err();
    assert!(matches!(err, feedmirror::Error::Cancelled));
}
