//! Dotted node paths and their validation.
//!
//! # Responsibility
//! - Parse and validate dot-delimited path strings.
//! - Provide segment navigation for proxies and the store walker.
//!
//! # Invariants
//! - A valid path has at least one segment and no empty segments.
//! - `NodePath` is immutable after parse; derived paths re-validate.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for graph-layer operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors from path validation and graph mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Path string is empty.
    EmptyPath,
    /// Path contains an empty segment (leading, trailing or doubled dot).
    EmptySegment { path: String },
    /// Snippet id is already registered for another path.
    DuplicateSnippetId { id: String, existing_path: String },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "node path must not be empty"),
            Self::EmptySegment { path } => {
                write!(f, "node path `{path}` contains an empty segment")
            }
            Self::DuplicateSnippetId { id, existing_path } => write!(
                f,
                "snippet id `{id}` is already registered at `{existing_path}`"
            ),
        }
    }
}

impl Error for GraphError {}

/// Validated dot-delimited node address.
///
/// Holds only the path text; never a reference into the tree, so outstanding
/// paths stay valid across arbitrary store mutation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath {
    raw: String,
}

impl NodePath {
    /// Parses and validates a dotted path string.
    pub fn parse(raw: impl Into<String>) -> GraphResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(GraphError::EmptyPath);
        }
        if raw.split('.').any(|segment| segment.is_empty()) {
            return Err(GraphError::EmptySegment { path: raw });
        }
        Ok(Self { raw })
    }

    /// Path text as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Iterates the path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }

    /// Returns a new path with one more trailing segment.
    pub fn child(&self, segment: &str) -> GraphResult<Self> {
        Self::parse(format!("{}.{segment}", self.raw))
    }

    /// Returns the parent path, or `None` for a single-segment path.
    pub fn parent(&self) -> Option<Self> {
        self.raw.rsplit_once('.').map(|(head, _)| Self {
            raw: head.to_string(),
        })
    }

    /// Final path segment.
    pub fn leaf_segment(&self) -> &str {
        self.raw.rsplit('.').next().unwrap_or(&self.raw)
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
