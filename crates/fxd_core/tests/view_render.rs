use fxd_core::model::view::EndOfLine;
use fxd_core::{
    render, render_selector, Membership, NodeStore, RenderError, RenderOptions, SnippetSpec, View,
};

fn store_with(snippets: &[(&str, &str, Option<&str>, Option<i64>)]) -> NodeStore {
    let mut store = NodeStore::new();
    for (id, body, lang, order) in snippets {
        let mut spec = SnippetSpec::new(*id);
        if let Some(lang) = lang {
            spec = spec.lang(*lang);
        }
        if let Some(order) = order {
            spec = spec.order(*order);
        }
        store.create_snippet(&spec, body).unwrap();
    }
    store
}

#[test]
fn renders_selector_members_in_order_metadata_order() {
    let store = store_with(&[
        ("second", "two", Some("js"), Some(2)),
        ("first", "one", Some("js"), Some(1)),
    ]);
    let view = View::new("main", Membership::Selector("[lang=js]".to_string()));

    assert_eq!(render(&store, &view).unwrap(), "one\n\ntwo");
}

#[test]
fn snippets_without_order_sort_after_keyed_ones() {
    let store = store_with(&[
        ("loose", "unkeyed", Some("js"), None),
        ("keyed", "keyed", Some("js"), Some(10)),
    ]);
    let view = View::new("main", Membership::Selector("[lang=js]".to_string()));

    assert_eq!(render(&store, &view).unwrap(), "keyed\n\nunkeyed");
}

#[test]
fn order_ties_keep_traversal_order() {
    let store = store_with(&[
        ("b_tie", "bee", Some("js"), Some(1)),
        ("a_tie", "ay", Some("js"), Some(1)),
    ]);
    let view = View::new("main", Membership::Selector("[lang=js]".to_string()));

    // Traversal order is sorted path order; the stable sort keeps it.
    assert_eq!(render(&store, &view).unwrap(), "ay\n\nbee");
}

#[test]
fn explicit_membership_resolves_ids_in_list_order() {
    let store = store_with(&[
        ("x", "body-x", None, None),
        ("y", "body-y", None, None),
    ]);
    let view = View::new(
        "picked",
        Membership::Explicit(vec![
            "y".to_string(),
            "missing".to_string(),
            "x".to_string(),
        ]),
    );

    // Unknown ids are skipped; order metadata is absent so the frozen list
    // order survives the stable sort.
    assert_eq!(render(&store, &view).unwrap(), "body-y\n\nbody-x");
}

#[test]
fn custom_separator_is_honored() {
    let store = store_with(&[
        ("a", "one", None, Some(1)),
        ("b", "two", None, Some(2)),
    ]);
    let options = RenderOptions {
        separator: "\n// ----\n".to_string(),
        ..RenderOptions::default()
    };

    assert_eq!(
        render_selector(&store, "*", &options).unwrap(),
        "one\n// ----\ntwo"
    );
}

#[test]
fn crlf_mode_converts_every_newline() {
    let store = store_with(&[("a", "line1\nline2", None, Some(1))]);
    let options = RenderOptions {
        end_of_line: EndOfLine::Crlf,
        ..RenderOptions::default()
    };

    assert_eq!(
        render_selector(&store, "#a", &options).unwrap(),
        "line1\r\nline2"
    );
}

#[test]
fn bodies_with_mixed_line_endings_are_normalized() {
    let store = store_with(&[("m", "a\r\nb\rc", None, Some(1))]);
    assert_eq!(
        render_selector(&store, "#m", &RenderOptions::default()).unwrap(),
        "a\nb\nc"
    );
}

#[test]
fn empty_view_renders_empty_string() {
    let store = NodeStore::new();
    let view = View::new("empty", Membership::Selector("*".to_string()));
    assert_eq!(render(&store, &view).unwrap(), "");
}

#[test]
fn rendering_is_deterministic_without_mutation() {
    let store = store_with(&[
        ("a", "one", Some("js"), Some(1)),
        ("b", "two", Some("js"), Some(2)),
    ]);
    let view = View::new("main", Membership::Selector("[lang=js]".to_string()));

    let first = render(&store, &view).unwrap();
    let second = render(&store, &view).unwrap();
    assert_eq!(first, second);
}

#[test]
fn invalid_membership_selector_is_reported() {
    let store = NodeStore::new();
    let view = View::new("broken", Membership::Selector("#a @".to_string()));
    assert!(matches!(
        render(&store, &view).unwrap_err(),
        RenderError::Selector(_)
    ));
}

#[test]
fn hoisting_moves_imports_to_the_top_deduplicated() {
    let store = store_with(&[
        (
            "a",
            "import { x } from './x';\nuse_x();",
            Some("js"),
            Some(1),
        ),
        (
            "b",
            "import { x } from './x';\nimport y from './y';\nuse_y();",
            Some("js"),
            Some(2),
        ),
    ]);
    let mut options = RenderOptions::default();
    options.hoist_imports = true;

    let output = render_selector(&store, "[lang=js]", &options).unwrap();
    assert_eq!(
        output,
        "import { x } from './x';\nimport y from './y';\n\nuse_x();\n\nuse_y();"
    );
}

#[test]
fn hoisting_is_skipped_when_a_non_js_snippet_is_included() {
    let store = store_with(&[
        ("a", "import { x } from './x';\nuse_x();", Some("js"), Some(1)),
        ("b", "x = 1", Some("py"), Some(2)),
    ]);
    let mut options = RenderOptions::default();
    options.hoist_imports = true;

    let output = render_selector(&store, "*", &options).unwrap();
    assert!(output.starts_with("import { x } from './x';\nuse_x();"));
}

#[test]
fn hoisting_needs_at_least_one_js_tagged_snippet() {
    let store = store_with(&[("a", "import something", None, Some(1))]);
    let mut options = RenderOptions::default();
    options.hoist_imports = true;

    // Untagged snippets alone never enable hoisting.
    assert_eq!(
        render_selector(&store, "*", &options).unwrap(),
        "import something"
    );
}

#[test]
fn structural_nodes_matched_by_a_selector_contribute_nothing() {
    let mut store = NodeStore::new();
    store.set_metadata("group", "kind", "module").unwrap();
    let snippet_path = store
        .create_snippet(&SnippetSpec::new("s").order(1), "body")
        .unwrap();
    store
        .set_metadata(snippet_path.as_str(), "kind", "module")
        .unwrap();

    let output =
        render_selector(&store, "[kind=module]", &RenderOptions::default()).unwrap();
    assert_eq!(output, "body");
}
