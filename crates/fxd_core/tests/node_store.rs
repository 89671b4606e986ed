use fxd_core::{GraphError, NodeStore, NodeValue, SnippetSpec, WatchKind};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn set_then_get_returns_the_value() {
    let mut store = NodeStore::new();
    store.set("config.ui.theme", "dark").unwrap();

    assert_eq!(
        store.get("config.ui.theme").unwrap(),
        Some(NodeValue::Text("dark".to_string()))
    );
}

#[test]
fn missing_and_internal_nodes_read_as_none() {
    let mut store = NodeStore::new();
    store.set("a.b", 1i64).unwrap();

    assert_eq!(store.get("a.b.c").unwrap(), None);
    assert_eq!(store.get("zzz").unwrap(), None);
    // `a` is internal, so it has no value of its own.
    assert_eq!(store.get("a").unwrap(), None);
}

#[test]
fn deep_write_promotes_intermediate_leaf_destructively() {
    let mut store = NodeStore::new();
    store.set("a", 1i64).unwrap();
    store.set("a.b", 2i64).unwrap();

    assert_eq!(store.get("a").unwrap(), None);
    assert_eq!(store.get("a.b").unwrap(), Some(NodeValue::Int(2)));
}

#[test]
fn value_write_demotes_internal_node() {
    let mut store = NodeStore::new();
    store.set("a.b.c", true).unwrap();
    store.set("a.b", "leaf now").unwrap();

    assert_eq!(store.get("a.b.c").unwrap(), None);
    assert_eq!(
        store.get("a.b").unwrap(),
        Some(NodeValue::Text("leaf now".to_string()))
    );
}

#[test]
fn versions_start_at_zero_and_bump_per_mutation() {
    let mut store = NodeStore::new();
    assert_eq!(store.set("k", 1i64).unwrap(), 0);
    assert_eq!(store.set("k", 2i64).unwrap(), 1);
    assert_eq!(store.set("k", 3i64).unwrap(), 2);
    assert_eq!(store.version("k").unwrap(), Some(2));
    assert_eq!(store.version("missing").unwrap(), None);
}

#[test]
fn remove_drops_subtree_but_keeps_parent() {
    let mut store = NodeStore::new();
    store.set("p.a", 1i64).unwrap();
    store.set("p.b", 2i64).unwrap();
    store.remove("p.a").unwrap();

    assert_eq!(store.get("p.a").unwrap(), None);
    assert_eq!(store.get("p.b").unwrap(), Some(NodeValue::Int(2)));
    assert!(store.version("p").unwrap().is_some());
}

#[test]
fn remove_missing_path_is_a_noop() {
    let mut store = NodeStore::new();
    store.set("a", 1i64).unwrap();
    store.remove("no.such.node").unwrap();
    assert_eq!(store.get("a").unwrap(), Some(NodeValue::Int(1)));
}

#[test]
fn invalid_paths_are_rejected() {
    let mut store = NodeStore::new();
    assert_eq!(store.get("").unwrap_err(), GraphError::EmptyPath);
    assert!(matches!(
        store.set("a..b", 1i64).unwrap_err(),
        GraphError::EmptySegment { .. }
    ));
}

#[test]
fn watcher_fires_after_set_with_committed_value() {
    let mut store = NodeStore::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    store
        .watch("watched.path", move |event| {
            sink.borrow_mut().push(event.clone());
        })
        .unwrap();

    store.set("watched.path", 7i64).unwrap();
    store.set("watched.path", 8i64).unwrap();
    store.set("other.path", 9i64).unwrap();

    let events = events.borrow();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, WatchKind::Set);
    assert_eq!(events[0].value, Some(NodeValue::Int(7)));
    assert_eq!(events[0].version, Some(0));
    assert_eq!(events[1].value, Some(NodeValue::Int(8)));
    assert_eq!(events[1].version, Some(1));
}

#[test]
fn watcher_fires_on_removal_with_no_value() {
    let mut store = NodeStore::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    store.set("gone", 1i64).unwrap();
    store
        .watch("gone", move |event| {
            sink.borrow_mut().push(event.clone());
        })
        .unwrap();

    store.remove("gone").unwrap();

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, WatchKind::Removed);
    assert_eq!(events[0].value, None);
    assert_eq!(events[0].version, None);
}

#[test]
fn proxy_survives_removal_and_recreation() {
    let mut store = NodeStore::new();
    let proxy = store.proxy("slot.x").unwrap();

    proxy.set(&mut store, 1i64).unwrap();
    assert_eq!(proxy.get(&store), Some(NodeValue::Int(1)));

    proxy.remove(&mut store).unwrap();
    assert_eq!(proxy.get(&store), None);

    proxy.set(&mut store, 2i64).unwrap();
    assert_eq!(proxy.get(&store), Some(NodeValue::Int(2)));
}

#[test]
fn create_snippet_registers_id_and_checksum() {
    let mut store = NodeStore::new();
    let spec = SnippetSpec::new("greet").lang("js").order(1);
    let path = store.create_snippet(&spec, "function greet() {}").unwrap();

    assert_eq!(path.as_str(), "snippets.greet");
    assert_eq!(store.snippet_path("greet"), Some(&path));
    let metadata = store.metadata(path.as_str()).unwrap().unwrap();
    assert_eq!(metadata.get("id").map(String::as_str), Some("greet"));
    assert_eq!(metadata.get("lang").map(String::as_str), Some("js"));
    assert_eq!(metadata.get("order").map(String::as_str), Some("1"));
    assert!(metadata.contains_key("checksum"));
}

#[test]
fn snippet_id_with_dots_is_sanitized_in_the_path() {
    let mut store = NodeStore::new();
    let path = store
        .create_snippet(&SnippetSpec::new("a.b c"), "body")
        .unwrap();

    assert_eq!(path.as_str(), "snippets.a_b_c");
    // The original id survives in metadata and the index.
    assert!(store.snippet_path("a.b c").is_some());
}

#[test]
fn duplicate_snippet_id_at_another_path_is_rejected() {
    let mut store = NodeStore::new();
    store
        .create_snippet(&SnippetSpec::new("dup"), "first")
        .unwrap();

    let other = fxd_core::NodePath::parse("elsewhere.dup").unwrap();
    let err = store
        .upsert_snippet_at(&other, &SnippetSpec::new("dup"), "second")
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateSnippetId { .. }));
}

#[test]
fn removing_a_snippet_node_unregisters_its_id() {
    let mut store = NodeStore::new();
    let path = store
        .create_snippet(&SnippetSpec::new("temp"), "body")
        .unwrap();

    store.remove(path.as_str()).unwrap();
    assert_eq!(store.snippet_path("temp"), None);
}

#[test]
fn removing_an_ancestor_unregisters_snippets_below_it() {
    let mut store = NodeStore::new();
    store
        .create_snippet(&SnippetSpec::new("child"), "body")
        .unwrap();

    store.remove("snippets").unwrap();
    assert_eq!(store.snippet_path("child"), None);
}

#[test]
fn reset_clears_tree_index_and_watchers() {
    let mut store = NodeStore::new();
    store.set("a.b", 1i64).unwrap();
    store
        .create_snippet(&SnippetSpec::new("s"), "body")
        .unwrap();

    store.reset();
    assert!(store.is_empty());
    assert_eq!(store.get("a.b").unwrap(), None);
    assert_eq!(store.snippet_path("s"), None);
}

#[test]
fn set_metadata_creates_the_node_when_missing() {
    let mut store = NodeStore::new();
    let version = store.set_metadata("tagged", "color", "red").unwrap();
    assert_eq!(version, 0);

    let metadata = store.metadata("tagged").unwrap().unwrap();
    assert_eq!(metadata.get("color").map(String::as_str), Some("red"));
}
