#![forbid(unsafe_code)]

use serde_json::json;
use vg_core::ids::SnapshotId;
use vg_core::tags::TagName;
use vg_storage::{SqliteStore, StoreError};
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("vg_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn tag_name(value: &str) -> TagName {
    TagName::try_new(value).expect("valid tag name")
}

#[test]
fn tag_resolves_to_its_snapshot() {
    let dir = temp_dir("tag_resolves_to_its_snapshot");
    let mut store = SqliteStore::open(&dir).expect("open store");

    let tree = store.create_tree("tagged").expect("create tree");
    let snap = store.create_snapshot(tree.id, None).expect("snapshot");
    store
        .insert_node(snap.id, &json!({"k": "v"}))
        .expect("node");

    let tag = store
        .create_tag(snap.id, &tag_name("release-v1.0"), "first cut")
        .expect("create tag");
    assert_eq!(tag.snapshot_id, snap.id);
    assert_eq!(tag.name, "release-v1.0");

    let resolved = store.resolve_tag("release-v1.0").expect("resolve");
    assert_eq!(resolved.snapshot_id, snap.id);
    assert_eq!(resolved.description, "first cut");
}

#[test]
fn tag_names_are_unique_across_trees() {
    let dir = temp_dir("tag_names_are_unique_across_trees");
    let mut store = SqliteStore::open(&dir).expect("open store");

    let tree_a = store.create_tree("tree-a").expect("tree a");
    let tree_b = store.create_tree("tree-b").expect("tree b");
    let snap_a = store.create_snapshot(tree_a.id, None).expect("snapshot a");
    let snap_b = store.create_snapshot(tree_b.id, None).expect("snapshot b");

    store
        .create_tag(snap_a.id, &tag_name("v1"), "")
        .expect("first v1");

    // Uniqueness is global, not per-tree.
    let err = store
        .create_tag(snap_b.id, &tag_name("v1"), "")
        .expect_err("duplicate tag name must fail");
    assert!(matches!(err, StoreError::TagAlreadyExists));

    let resolved = store.resolve_tag("v1").expect("resolve");
    assert_eq!(resolved.snapshot_id, snap_a.id);
}

#[test]
fn unknown_tag_is_not_found() {
    let dir = temp_dir("unknown_tag_is_not_found");
    let store = SqliteStore::open(&dir).expect("open store");

    let err = store
        .resolve_tag("never-created")
        .expect_err("unknown tag must fail");
    assert!(matches!(err, StoreError::UnknownTag));
}

#[test]
fn tag_requires_existing_snapshot() {
    let dir = temp_dir("tag_requires_existing_snapshot");
    let mut store = SqliteStore::open(&dir).expect("open store");

    let err = store
        .create_tag(SnapshotId::new(42), &tag_name("ghost"), "")
        .expect_err("tag on missing snapshot must fail");
    assert!(matches!(err, StoreError::UnknownSnapshot));
    assert!(store.list_tags().expect("list").is_empty());
}

#[test]
fn list_tags_returns_all_registered_tags() {
    let dir = temp_dir("list_tags_returns_all_registered_tags");
    let mut store = SqliteStore::open(&dir).expect("open store");

    let tree = store.create_tree("listing").expect("create tree");
    let snap = store.create_snapshot(tree.id, None).expect("snapshot");

    store
        .create_tag(snap.id, &tag_name("v1"), "one")
        .expect("v1");
    store
        .create_tag(snap.id, &tag_name("v2"), "two")
        .expect("v2");

    let tags = store.list_tags().expect("list");
    assert_eq!(tags.len(), 2);
    let names: Vec<&str> = tags.iter().map(|tag| tag.name.as_str()).collect();
    assert!(names.contains(&"v1"));
    assert!(names.contains(&"v2"));
}
