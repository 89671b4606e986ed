use fxd_core::graph::NodePath;
use fxd_core::{select, select_from, NodeStore, SelectorError, SnippetSpec};

fn store_with_snippets() -> NodeStore {
    let mut store = NodeStore::new();
    for (id, lang, path) in [
        ("alpha", "js", "src.alpha"),
        ("beta", "py", "src.beta"),
        ("gamma", "js", "src.nested.gamma"),
        ("delta", "js", "lib.delta"),
    ] {
        let target = NodePath::parse(path).unwrap();
        store
            .upsert_snippet_at(&target, &SnippetSpec::new(id).lang(lang), "body")
            .unwrap();
    }
    store
}

fn paths(result: &[NodePath]) -> Vec<&str> {
    result.iter().map(NodePath::as_str).collect()
}

#[test]
fn id_selector_matches_one_snippet() {
    let store = store_with_snippets();
    let result = select(&store, "#beta").unwrap();
    assert_eq!(paths(&result), vec!["src.beta"]);
}

#[test]
fn attribute_selector_matches_all_with_that_metadata() {
    let store = store_with_snippets();
    let result = select(&store, "[lang=js]").unwrap();
    assert_eq!(
        paths(&result),
        vec!["lib.delta", "src.alpha", "src.nested.gamma"]
    );
}

#[test]
fn quoted_attribute_values_are_supported() {
    let mut store = NodeStore::new();
    store.set_metadata("doc", "file", "main file.js").unwrap();
    let result = select(&store, "[file=\"main file.js\"]").unwrap();
    assert_eq!(paths(&result), vec!["doc"]);
}

#[test]
fn compound_selector_requires_all_parts() {
    let store = store_with_snippets();
    let result = select(&store, "#alpha[lang=js]").unwrap();
    assert_eq!(paths(&result), vec!["src.alpha"]);

    assert!(select(&store, "#alpha[lang=py]").unwrap().is_empty());
}

#[test]
fn wildcard_matches_every_node_in_preorder() {
    let mut store = NodeStore::new();
    store.set("b.y", 1i64).unwrap();
    store.set("a.x", 2i64).unwrap();

    let result = select(&store, "*").unwrap();
    assert_eq!(paths(&result), vec!["a", "a.x", "b", "b.y"]);
}

#[test]
fn descendant_combinator_matches_any_depth() {
    let mut store = NodeStore::new();
    store.set_metadata("mod", "kind", "module").unwrap();
    store
        .upsert_snippet_at(
            &NodePath::parse("mod.deep.inner").unwrap(),
            &SnippetSpec::new("inner").lang("js"),
            "body",
        )
        .unwrap();

    let result = select(&store, "[kind=module] [lang=js]").unwrap();
    assert_eq!(paths(&result), vec!["mod.deep.inner"]);
}

#[test]
fn child_combinator_matches_immediate_children_only() {
    let mut store = NodeStore::new();
    store.set_metadata("mod", "kind", "module").unwrap();
    store
        .upsert_snippet_at(
            &NodePath::parse("mod.direct").unwrap(),
            &SnippetSpec::new("direct").lang("js"),
            "body",
        )
        .unwrap();
    store
        .upsert_snippet_at(
            &NodePath::parse("mod.deep.inner").unwrap(),
            &SnippetSpec::new("inner").lang("js"),
            "body",
        )
        .unwrap();

    let result = select(&store, "[kind=module] > [lang=js]").unwrap();
    assert_eq!(paths(&result), vec!["mod.direct"]);
}

#[test]
fn each_match_appears_once_at_first_encounter() {
    let mut store = NodeStore::new();
    store.set_metadata("a", "k", "v").unwrap();
    store.set_metadata("a.b", "k", "v").unwrap();
    store.set_metadata("a.b.c", "k", "v").unwrap();

    // `a.b.c` is reachable as a descendant through both `a` and `a.b`.
    let result = select(&store, "[k=v] [k=v]").unwrap();
    assert_eq!(paths(&result), vec!["a.b", "a.b.c"]);
}

#[test]
fn empty_result_is_ok_not_an_error() {
    let store = store_with_snippets();
    assert!(select(&store, "#nope").unwrap().is_empty());
}

#[test]
fn syntax_errors_are_reported_with_context() {
    let store = store_with_snippets();
    assert_eq!(select(&store, "  ").unwrap_err(), SelectorError::Empty);
    assert!(matches!(
        select(&store, "#a @").unwrap_err(),
        SelectorError::UnexpectedToken { .. }
    ));
    assert!(matches!(
        select(&store, "#a >").unwrap_err(),
        SelectorError::DanglingCombinator { .. }
    ));
}

#[test]
fn scoped_select_searches_only_the_subtree() {
    let store = store_with_snippets();
    let scope = NodePath::parse("src").unwrap();
    let result = select_from(&store, &scope, "[lang=js]").unwrap();
    assert_eq!(paths(&result), vec!["src.alpha", "src.nested.gamma"]);
}

#[test]
fn scope_node_itself_can_match() {
    let mut store = NodeStore::new();
    store.set_metadata("root", "kind", "module").unwrap();
    let scope = NodePath::parse("root").unwrap();
    let result = select_from(&store, &scope, "[kind=module]").unwrap();
    assert_eq!(paths(&result), vec!["root"]);
}

#[test]
fn missing_scope_is_an_error() {
    let store = NodeStore::new();
    let scope = NodePath::parse("absent").unwrap();
    assert!(matches!(
        select_from(&store, &scope, "*").unwrap_err(),
        SelectorError::ScopeNotFound { .. }
    ));
}
