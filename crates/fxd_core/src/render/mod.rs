//! View rendering: snippets to one text blob.
//!
//! # Responsibility
//! - Resolve view membership (live selector or frozen id list) to snippets.
//! - Order, join, normalize line endings and optionally hoist imports.
//!
//! # Invariants
//! - Ordering is a stable sort on numeric `order` metadata; missing order
//!   sorts last; ties keep traversal order.
//! - Rendering is read-only: two renders without intervening mutation
//!   produce identical output.

use crate::graph::path::NodePath;
use crate::graph::store::NodeStore;
use crate::model::snippet::meta;
use crate::model::view::{EndOfLine, Membership, RenderOptions, View};
use crate::selector::engine::select;
use crate::selector::parse::SelectorError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for rendering.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors from view rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Live membership selector failed to parse.
    Selector(SelectorError),
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Selector(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Selector(err) => Some(err),
        }
    }
}

impl From<SelectorError> for RenderError {
    fn from(value: SelectorError) -> Self {
        Self::Selector(value)
    }
}

/// Single-line import statement. Line-based on purpose: multi-line import
/// statements are not recognized, split or merged.
static IMPORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*import\b.*$").expect("import pattern is valid"));

const JS_FAMILY: [&str; 6] = ["js", "jsx", "ts", "tsx", "mjs", "cjs"];

struct Included {
    order: i64,
    lang: Option<String>,
    body: String,
}

/// Renders a view against the current store state.
pub fn render(store: &NodeStore, view: &View) -> RenderResult<String> {
    let paths = member_paths(store, &view.membership)?;
    Ok(render_paths(store, &paths, &view.options))
}

/// Renders the snippets matched by a selector query with explicit options.
pub fn render_selector(
    store: &NodeStore,
    query: &str,
    options: &RenderOptions,
) -> RenderResult<String> {
    let paths = select(store, query)?;
    Ok(render_paths(store, &paths, options))
}

fn member_paths(store: &NodeStore, membership: &Membership) -> RenderResult<Vec<NodePath>> {
    match membership {
        Membership::Selector(query) => Ok(select(store, query)?),
        // Frozen list: ids resolve through the index in list order; ids
        // with no registered snippet are skipped.
        Membership::Explicit(ids) => Ok(ids
            .iter()
            .filter_map(|id| store.snippet_path(id).cloned())
            .collect()),
    }
}

fn render_paths(store: &NodeStore, paths: &[NodePath], options: &RenderOptions) -> String {
    let mut included: Vec<Included> = paths
        .iter()
        .filter_map(|path| {
            let node = store.node(path)?;
            // Only text leaves render; structural matches contribute nothing.
            let body = node.value()?.as_text()?.to_string();
            Some(Included {
                order: node
                    .meta(meta::ORDER)
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(i64::MAX),
                lang: node.meta(meta::LANG).map(str::to_string),
                body: normalize_newlines(&body),
            })
        })
        .collect();

    included.sort_by_key(|snippet| snippet.order);

    let mut bodies: Vec<String> = included.iter().map(|s| s.body.clone()).collect();
    let mut hoisted: Vec<String> = Vec::new();

    if options.hoist_imports && aggregate_is_js_family(&included) {
        hoisted = hoist_import_lines(&mut bodies);
    }

    let mut output = String::new();
    if !hoisted.is_empty() {
        output.push_str(&hoisted.join("\n"));
        output.push_str("\n\n");
    }
    output.push_str(&bodies.join(&options.separator));

    match options.end_of_line {
        EndOfLine::Lf => output,
        EndOfLine::Crlf => output.replace('\n', "\r\n"),
    }
}

/// The hoisting gate: at least one snippet tagged JS/TS family and no
/// snippet tagged anything else. Untagged snippets neither enable nor veto.
fn aggregate_is_js_family(included: &[Included]) -> bool {
    let mut any_js = false;
    for snippet in included {
        match snippet.lang.as_deref() {
            Some(lang) if JS_FAMILY.contains(&lang.to_ascii_lowercase().as_str()) => {
                any_js = true;
            }
            Some(_) => return false,
            None => {}
        }
    }
    any_js
}

/// Removes single-line imports from each body and returns them deduplicated
/// (on trimmed text) in first-seen order.
fn hoist_import_lines(bodies: &mut [String]) -> Vec<String> {
    let mut hoisted: Vec<String> = Vec::new();

    for body in bodies.iter_mut() {
        let mut kept: Vec<&str> = Vec::new();
        for line in body.split('\n') {
            if IMPORT_LINE.is_match(line) {
                if !hoisted.iter().any(|seen| seen.trim() == line.trim()) {
                    hoisted.push(line.to_string());
                }
            } else {
                kept.push(line);
            }
        }
        *body = kept.join("\n");
    }
    hoisted
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
