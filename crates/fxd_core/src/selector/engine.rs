//! Selector evaluation over the node tree.
//!
//! # Responsibility
//! - Match parsed selectors with descendant/child semantics.
//! - Keep result order equal to pre-order traversal order.
//!
//! # Invariants
//! - Each matching node appears once, at its first-encounter position.
//! - Evaluation never mutates the store; results are recomputed per call.

use crate::graph::path::NodePath;
use crate::graph::store::{Node, NodeStore};
use crate::model::snippet::meta;
use crate::selector::parse::{Combinator, Compound, Selector, SelectorError, SelectorResult};
use std::collections::HashSet;

/// Evaluates `query` against the whole store.
pub fn select(store: &NodeStore, query: &str) -> SelectorResult<Vec<NodePath>> {
    let selector = Selector::parse(query)?;
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    visit(
        store.root(),
        None,
        &[0],
        &selector,
        &mut results,
        &mut seen,
    );
    Ok(results)
}

/// Evaluates `query` against the subtree rooted at `scope`. The scope node
/// itself participates in matching.
pub fn select_from(
    store: &NodeStore,
    scope: &NodePath,
    query: &str,
) -> SelectorResult<Vec<NodePath>> {
    let selector = Selector::parse(query)?;
    let scope_node = store.node(scope).ok_or_else(|| SelectorError::ScopeNotFound {
        path: scope.as_str().to_string(),
    })?;
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    visit(
        scope_node,
        Some(scope.clone()),
        &[0],
        &selector,
        &mut results,
        &mut seen,
    );
    Ok(results)
}

/// Pre-order walk carrying active match states.
///
/// A state `i` means "compound `i` may match at this node". States whose
/// preceding combinator is descendant persist down the subtree; child
/// states apply to one level only. A match of the final compound records
/// the node.
fn visit(
    node: &Node,
    path: Option<NodePath>,
    states: &[usize],
    selector: &Selector,
    results: &mut Vec<NodePath>,
    seen: &mut HashSet<String>,
) {
    let mut child_states: Vec<usize> = Vec::new();

    // The anonymous store root has no address and never matches; it only
    // seeds states for its children.
    if let Some(path) = &path {
        for &state in states {
            if !compound_matches(node, selector.compound(state)) {
                continue;
            }
            if state + 1 == selector.len() {
                if seen.insert(path.as_str().to_string()) {
                    results.push(path.clone());
                }
            } else {
                child_states.push(state + 1);
            }
        }
    }

    for &state in states {
        if selector.combinator(state) == Combinator::Descendant && !child_states.contains(&state) {
            child_states.push(state);
        }
    }
    child_states.sort_unstable();
    child_states.dedup();

    for (segment, child) in node.children() {
        let child_path = match &path {
            Some(parent) => parent.child(segment),
            None => NodePath::parse(segment),
        };
        // Segments come from the tree, so path derivation cannot fail.
        if let Ok(child_path) = child_path {
            visit(child, Some(child_path), &child_states, selector, results, seen);
        }
    }
}

/// Whether one compound matches one node's metadata.
fn compound_matches(node: &Node, compound: &Compound) -> bool {
    if let Some(id) = &compound.id {
        if node.meta(meta::ID) != Some(id.as_str()) {
            return false;
        }
    }
    for (key, value) in &compound.attrs {
        if node.meta(key) != Some(value.as_str()) {
            return false;
        }
    }
    // `universal` adds no constraint beyond existing, which holds here.
    true
}
