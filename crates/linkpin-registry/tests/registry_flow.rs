use std::sync::Arc;

use linkpin_registry::{
    InMemoryStateStore, JsonStateStore, Listing, Registry, RegistryError, RegistryPolicy,
    Requester, ResetOrigin, StateStore, format_summary,
};

const ADMIN_ID: i64 = 487_606_557;

fn open_registry() -> (Arc<InMemoryStateStore>, Registry) {
    let store = Arc::new(InMemoryStateStore::new());
    let registry = Registry::open(
        store.clone(),
        RegistryPolicy {
            allowed_prefix: Some("https://x.com".to_string()),
            admin_id: Some(ADMIN_ID),
            ..RegistryPolicy::default()
        },
    );
    (store, registry)
}

#[test]
fn distinct_adds_grow_and_duplicates_never_do() {
    let (store, mut registry) = open_registry();
    for i in 0..25 {
        registry
            .add("alice", &format!("https://x.com/post/{i}"))
            .expect("distinct add");
    }
    assert_eq!(registry.len(), 25);

    let err = registry
        .add("bob", "https://x.com/post/7")
        .expect_err("duplicate");
    assert_eq!(
        err,
        RegistryError::Duplicate {
            content: "https://x.com/post/7".to_string()
        }
    );
    assert_eq!(registry.len(), 25);
    assert_eq!(store.saved_entries().len(), 25);
}

#[test]
fn duplicate_check_is_case_sensitive() {
    let (_store, mut registry) = open_registry();
    registry.add("alice", "https://x.com/Post").expect("add");
    registry
        .add("alice", "https://x.com/post")
        .expect("different case is a different link");
    assert_eq!(registry.len(), 2);
}

#[test]
fn prefix_violation_never_mutates() {
    let (store, mut registry) = open_registry();
    let err = registry
        .add("alice", "https://example.com/a")
        .expect_err("wrong domain");
    assert!(matches!(err, RegistryError::Validation { .. }));
    assert!(err.to_string().contains("https://x.com"));
    assert!(registry.is_empty());
    assert!(store.saved_entries().is_empty());
}

#[test]
fn out_of_range_removal_reports_range_error() {
    let (_store, mut registry) = open_registry();
    registry.add("alice", "https://x.com/a").expect("add");
    let admin = Requester::new(ADMIN_ID, "admin");

    for position in [0, 2, 99] {
        let err = registry.remove_at(position, &admin).expect_err("range");
        assert_eq!(err, RegistryError::Range { position, len: 1 });
    }
    assert_eq!(registry.len(), 1);
}

#[test]
fn removal_positions_follow_flat_insertion_order() {
    let (_store, mut registry) = open_registry();
    registry.add("alice", "https://x.com/a1").expect("add");
    registry.add("bob", "https://x.com/b1").expect("add");
    registry.add("alice", "https://x.com/a2").expect("add");

    // Grouped view shows alice's second link before bob's, but position 2 is still bob's.
    let removed = registry
        .remove_at(2, &Requester::new(20, "bob"))
        .expect("owner removes");
    assert_eq!(removed.content, "https://x.com/b1");
    let left: Vec<&str> = registry
        .entries()
        .iter()
        .map(|entry| entry.content.as_str())
        .collect();
    assert_eq!(left, vec!["https://x.com/a1", "https://x.com/a2"]);
}

#[test]
fn admin_may_remove_anyone_and_strangers_may_not() {
    let (_store, mut registry) = open_registry();
    registry.add("alice", "https://x.com/a").expect("add");
    registry.add("alice", "https://x.com/b").expect("add");

    let err = registry
        .remove_at(1, &Requester::new(99, "mallory"))
        .expect_err("stranger");
    assert!(matches!(err, RegistryError::Authorization { .. }));
    assert_eq!(registry.len(), 2);

    registry
        .remove_at(1, &Requester::new(ADMIN_ID, "admin"))
        .expect("admin removes");
    assert_eq!(registry.len(), 1);
}

#[test]
fn reset_requires_admin_interactively_but_not_on_schedule() {
    let (store, mut registry) = open_registry();
    for i in 0..4 {
        registry
            .add("alice", &format!("https://x.com/{i}"))
            .expect("add");
    }

    let alice = Requester::new(10, "alice");
    let err = registry
        .reset(ResetOrigin::Interactive(&alice))
        .expect_err("not admin");
    assert!(matches!(err, RegistryError::Authorization { .. }));
    assert_eq!(registry.len(), 4);

    let cleared = registry.reset(ResetOrigin::Scheduled).expect("scheduled");
    assert_eq!(cleared, 4);
    assert!(registry.is_empty());
    assert!(store.saved_entries().is_empty());
    assert_eq!(registry.list(), Listing::Empty);

    let admin = Requester::new(ADMIN_ID, "admin");
    let cleared = registry
        .reset(ResetOrigin::Interactive(&admin))
        .expect("idempotent reset");
    assert_eq!(cleared, 0);
    assert!(registry.is_empty());
}

#[test]
fn add_list_remove_scenario() {
    let (_store, mut registry) = open_registry();
    registry.add("alice", "https://x.com/a").expect("add");

    match registry.list() {
        Listing::Grouped(groups) => {
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].submitter, "alice");
            assert_eq!(groups[0].entries.len(), 1);
        }
        Listing::Empty => panic!("expected one group"),
    }

    assert!(matches!(
        registry.add("alice", "https://x.com/a"),
        Err(RegistryError::Duplicate { .. })
    ));
    assert_eq!(registry.len(), 1);

    assert!(matches!(
        registry.remove_at(1, &Requester::new(2, "bob")),
        Err(RegistryError::Authorization { .. })
    ));
    assert_eq!(registry.len(), 1);

    let removed = registry
        .remove_at(1, &Requester::new(3, "alice"))
        .expect("owner removes");
    assert_eq!(removed.content, "https://x.com/a");
    assert!(registry.is_empty());
    assert!(format_summary(registry.entries()).is_empty());
}

#[test]
fn reopening_restores_previous_state() {
    let (store, mut registry) = open_registry();
    registry.add("alice", "https://x.com/a").expect("add");
    registry.add("bob", "https://x.com/b").expect("add");
    let before = registry.entries().to_vec();
    drop(registry);

    let reopened = Registry::open(store, RegistryPolicy::default());
    assert_eq!(reopened.entries(), before.as_slice());
}

#[test]
fn malformed_saved_links_leave_an_empty_usable_registry() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let entries_path = tmp.path().join("links.json");
    std::fs::write(&entries_path, "{nope").expect("write");
    let store = Arc::new(JsonStateStore::new(
        entries_path.clone(),
        tmp.path().join("pin.json"),
        tmp.path().join("offset.json"),
    ));

    let mut registry = Registry::open(store.clone(), RegistryPolicy::default());
    assert!(registry.is_empty());

    registry.add("alice", "https://x.com/a").expect("add after recovery");
    let saved = store.load_entries().expect("file parses again");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].content, "https://x.com/a");
}

#[test]
fn unreadable_store_starts_empty_and_keeps_accepting_links() {
    let store = Arc::new(InMemoryStateStore::new());
    store.set_fail_reads(true);
    let mut registry = Registry::open(store.clone(), RegistryPolicy::default());
    assert!(registry.is_empty());
    assert!(matches!(registry.list(), Listing::Empty));

    registry.add("bob", "https://x.com/b").expect("add");
    assert_eq!(store.saved_entries().len(), 1);
}
