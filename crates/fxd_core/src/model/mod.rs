//! Canonical domain records for the FXD node graph.
//!
//! # Responsibility
//! - Define the value, snippet, patch and view shapes shared by all layers.
//! - Keep one storage-neutral model so graph, renderer and persistence agree.
//!
//! # Invariants
//! - Snippet identity is the `id` metadata value, stable across renames.
//! - Patches are ephemeral: produced by the marker parser, consumed by the
//!   patch applier, never persisted.

pub mod snippet;
pub mod value;
pub mod view;
