//! CSS-like selector queries over the node graph.
//!
//! # Responsibility
//! - Parse `#id`, `[key=value]`, `*`, descendant and child combinators.
//! - Evaluate queries as a pre-order walk over the node tree.
//!
//! # Invariants
//! - Result order is first-encounter pre-order; no secondary sort.
//! - An empty result set is valid; only unparseable queries error.

pub mod engine;
pub mod parse;

pub use engine::{select, select_from};
pub use parse::{Combinator, Compound, Selector, SelectorError, SelectorResult};
