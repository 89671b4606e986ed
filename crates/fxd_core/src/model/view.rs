//! View model: named, ordered projections of snippets.
//!
//! # Responsibility
//! - Define view identity, membership and rendering options.
//! - Keep the shapes serde-serializable for the views table columns.
//!
//! # Invariants
//! - View names are unique within one registry.
//! - A selector membership is re-evaluated on every render; an explicit
//!   membership is a frozen id list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable view identifier.
pub type ViewId = Uuid;

/// How a view selects its member snippets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    /// Live selector query, re-evaluated each render.
    Selector(String),
    /// Frozen, ordered list of snippet ids.
    Explicit(Vec<String>),
}

/// Line ending applied to rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfLine {
    Lf,
    Crlf,
}

/// Rendering options for one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Text inserted between adjacent snippet bodies.
    pub separator: String,
    /// Line-ending mode applied after newline normalization.
    pub end_of_line: EndOfLine,
    /// Hoist single-line `import` statements to the top of the output.
    /// Only honored when the included snippets are JS/TS family.
    pub hoist_imports: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            separator: "\n\n".to_string(),
            end_of_line: EndOfLine::Lf,
            hoist_imports: false,
        }
    }
}

/// One named projection of snippets into a single text blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// Stable identity, survives renames.
    pub uuid: ViewId,
    /// Unique user-facing name.
    pub name: String,
    /// Snippet selection strategy.
    pub membership: Membership,
    /// Rendering options.
    pub options: RenderOptions,
}

impl View {
    /// Creates a view with a fresh uuid and default options.
    pub fn new(name: impl Into<String>, membership: Membership) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            membership,
            options: RenderOptions::default(),
        }
    }
}

/// In-memory collection of views, keyed by name.
///
/// Owns view lifecycle explicitly instead of hiding it in module state; the
/// persistence layer saves and reloads the registry wholesale.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: BTreeMap<String, View>,
}

impl ViewRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a view under its name. Returns the previous view
    /// with that name, if any.
    pub fn upsert(&mut self, view: View) -> Option<View> {
        self.views.insert(view.name.clone(), view)
    }

    /// Looks up a view by name.
    pub fn get(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// Removes a view by name.
    pub fn remove(&mut self, name: &str) -> Option<View> {
        self.views.remove(name)
    }

    /// Iterates views in name order.
    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    /// Number of registered views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether the registry holds no views.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Drops all views.
    pub fn reset(&mut self) {
        self.views.clear();
    }
}
