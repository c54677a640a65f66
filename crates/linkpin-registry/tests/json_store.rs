use std::fs;

use linkpin_registry::{JsonStateStore, LinkEntry, StateStore, StoreError};
use tempfile::tempdir;

fn store_in(dir: &std::path::Path) -> JsonStateStore {
    JsonStateStore::new(
        dir.join("links.json"),
        dir.join("pin.json"),
        dir.join("offset.json"),
    )
}

fn sample() -> Vec<LinkEntry> {
    vec![
        LinkEntry {
            submitter: "alice".to_string(),
            content: "https://x.com/a".to_string(),
            recorded_at: "07:00:00 18/10/2026".to_string(),
        },
        LinkEntry {
            submitter: "bob".to_string(),
            content: "https://x.com/b".to_string(),
            recorded_at: "07:01:00 18/10/2026".to_string(),
        },
    ]
}

#[test]
fn missing_files_load_as_empty_state() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(tmp.path());
    assert!(store.load_entries().expect("entries").is_empty());
    assert_eq!(store.load_pin_ref().expect("pin"), None);
}

#[test]
fn blank_files_load_as_empty_state() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(tmp.path());
    fs::write(store.entries_path(), "  \n").expect("write");
    fs::write(store.pin_path(), "").expect("write");
    assert!(store.load_entries().expect("entries").is_empty());
    assert_eq!(store.load_pin_ref().expect("pin"), None);
}

#[test]
fn malformed_entries_are_a_parse_error() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(tmp.path());
    fs::write(store.entries_path(), "{not json").expect("write");
    let err = store.load_entries().expect_err("malformed");
    assert!(matches!(err, StoreError::Parse { .. }));
}

#[test]
fn save_then_load_reproduces_entries() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(tmp.path());
    store.save_entries(&sample()).expect("save");

    let loaded = store.load_entries().expect("load");
    assert_eq!(loaded, sample());

    store.save_entries(&loaded).expect("save again");
    assert_eq!(store.load_entries().expect("reload"), sample());
}

#[test]
fn every_save_overwrites_prior_content() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(tmp.path());
    store.save_entries(&sample()).expect("save");
    store.save_entries(&sample()[..1]).expect("shrink");
    assert_eq!(store.load_entries().expect("load").len(), 1);

    store.save_entries(&[]).expect("clear");
    let raw = fs::read_to_string(store.entries_path()).expect("read");
    assert_eq!(raw.trim(), "[]");
}

#[test]
fn entries_file_uses_documented_field_names() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(tmp.path());
    store.save_entries(&sample()).expect("save");
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.entries_path()).expect("read"))
            .expect("json");
    let first = &raw[0];
    assert_eq!(first["submitter"], "alice");
    assert_eq!(first["content"], "https://x.com/a");
    assert_eq!(first["recordedAt"], "07:00:00 18/10/2026");
}

#[test]
fn pin_ref_is_a_bare_scalar_independent_of_entries() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(tmp.path());
    store.save_pin_ref(4242).expect("save pin");
    assert_eq!(
        fs::read_to_string(store.pin_path()).expect("read").trim(),
        "4242"
    );
    assert_eq!(store.load_pin_ref().expect("pin"), Some(4242));
    assert!(store.load_entries().expect("entries").is_empty());

    store.save_pin_ref(4243).expect("overwrite");
    assert_eq!(store.load_pin_ref().expect("pin"), Some(4243));
}

#[test]
fn creates_missing_data_directory_on_save() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(&tmp.path().join("nested").join("data"));
    store.save_entries(&sample()).expect("save");
    assert_eq!(store.load_entries().expect("load").len(), 2);
}

#[test]
fn update_offset_survives_reopen() {
    let tmp = tempdir().expect("tempdir");
    let store = store_in(tmp.path());
    assert_eq!(store.load_update_offset().expect("offset"), None);

    store.save_update_offset(42).expect("save offset");
    assert_eq!(
        fs::read_to_string(store.offset_path()).expect("read").trim(),
        "42"
    );

    let reopened = store_in(tmp.path());
    assert_eq!(reopened.load_update_offset().expect("offset"), Some(42));
    assert_eq!(reopened.load_pin_ref().expect("pin"), None);
}
