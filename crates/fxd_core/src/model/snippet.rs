//! Snippet and patch records.
//!
//! # Responsibility
//! - Define the reserved metadata keys that make a graph node a snippet.
//! - Define the snippet descriptor used by creation and marker wrapping.
//! - Define the ephemeral patch record produced by the marker parser.
//!
//! # Invariants
//! - `meta::ID` is globally unique across snippets in one store.
//! - A patch never outlives the apply call that consumes it.

use serde::{Deserialize, Serialize};

/// Reserved snippet metadata keys on graph nodes.
pub mod meta {
    /// Stable snippet identity, unique per store.
    pub const ID: &str = "id";
    /// Source language tag; drives marker comment syntax.
    pub const LANG: &str = "lang";
    /// Logical destination filename.
    pub const FILE: &str = "file";
    /// Numeric sort key among siblings in a view.
    pub const ORDER: &str = "order";
    /// FNV-1a 64 hex digest of the last-known-good body.
    pub const CHECKSUM: &str = "checksum";
}

/// Descriptor for creating or wrapping one snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetSpec {
    /// Stable snippet id. Must be unique within one store.
    pub id: String,
    /// Source language tag (`js`, `py`, `css`, `html`, ...).
    pub lang: Option<String>,
    /// Logical destination filename.
    pub file: Option<String>,
    /// Sort key among view siblings. Missing sorts after all keyed snippets.
    pub order: Option<i64>,
}

impl SnippetSpec {
    /// Creates a descriptor with only the mandatory id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lang: None,
            file: None,
            order: None,
        }
    }

    /// Sets the language tag.
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Sets the destination filename.
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the view sort key.
    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }
}

/// One parsed create-or-update instruction extracted from marked text.
///
/// Patches are ephemeral by contract: the marker parser produces them and the
/// patch applier consumes them in the same call chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Target snippet id.
    pub id: String,
    /// Replacement body, byte-exact as found between the markers.
    pub body: String,
    /// Checksum carried by the begin marker, if any. Compared against the
    /// live snippet checksum to detect concurrent edits.
    pub checksum_at_parse: Option<String>,
    /// Language tag carried by the begin marker.
    pub lang: Option<String>,
    /// Destination filename carried by the begin marker.
    pub file: Option<String>,
    /// Sort key carried by the begin marker.
    pub order: Option<i64>,
}

impl Patch {
    /// Creates a minimal patch with id and body only.
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            checksum_at_parse: None,
            lang: None,
            file: None,
            order: None,
        }
    }
}
