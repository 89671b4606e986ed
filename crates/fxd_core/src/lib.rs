//! Core domain logic for FXD: a reactive node graph with snippet markers,
//! selector queries, view rendering, patch application and SQLite
//! persistence. This crate is the single source of truth for business
//! invariants.

pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod patch;
pub mod render;
pub mod repo;
pub mod selector;
pub mod snippet;

pub use graph::{GraphError, GraphResult, NodePath, NodeProxy, NodeStore, WatchEvent, WatchKind};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::snippet::{Patch, SnippetSpec};
pub use model::value::NodeValue;
pub use model::view::{Membership, RenderOptions, View, ViewRegistry};
pub use patch::{apply, detect_conflicts, ApplyError, ApplyOptions, ApplyReport, MissingPolicy};
pub use render::{render, render_selector, RenderError};
pub use repo::{GraphRepository, PersistError, PersistResult, SqliteGraphRepository};
pub use selector::{select, select_from, Selector, SelectorError};
pub use snippet::{parse, wrap, MarkerError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
