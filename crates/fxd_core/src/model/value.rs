//! Leaf value representation for graph nodes.
//!
//! # Responsibility
//! - Provide the single primitive value shape held by leaf nodes.
//! - Keep a stable text encoding for the persistence layer.
//!
//! # Invariants
//! - `type_tag()` and `from_tagged_text()` round-trip every value.

use serde::{Deserialize, Serialize};

/// Primitive payload stored on a leaf node.
///
/// Structured data is represented by deeper paths, not by a nested value
/// type, so the leaf alphabet stays small.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl NodeValue {
    /// Stable tag written to the `nodes.value_type` column.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Text encoding written to the `nodes.value_text` column.
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    /// Decodes a `(value_type, value_text)` pair from storage.
    ///
    /// Returns `None` when the tag is unknown or the text does not parse
    /// under the tag, so callers can surface an invalid-data error with
    /// row context.
    pub fn from_tagged_text(tag: &str, text: &str) -> Option<Self> {
        match tag {
            "bool" => text.parse::<bool>().ok().map(Self::Bool),
            "int" => text.parse::<i64>().ok().map(Self::Int),
            "float" => text.parse::<f64>().ok().map(Self::Float),
            "text" => Some(Self::Text(text.to_string())),
            _ => None,
        }
    }

    /// Returns the text payload when this value is `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for NodeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for NodeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for NodeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for NodeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NodeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
