//! Persistence layer: graph and view round-trip to SQLite.
//!
//! # Responsibility
//! - Define the persistence contract consumed by embedding applications.
//! - Isolate SQL details from the in-memory graph.
//!
//! # Invariants
//! - Saving is replace-all within one SQLite transaction.
//! - Loading rejects rows it cannot decode instead of masking them.

pub mod graph_repo;

pub use graph_repo::{GraphRepository, PersistError, PersistResult, SqliteGraphRepository};
