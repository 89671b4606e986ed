//! Reactive node graph: dotted-path addressable tree with watchers.
//!
//! # Responsibility
//! - Own the node tree and all mutation paths through it.
//! - Expose path-only accessor handles that survive tree mutation.
//!
//! # Invariants
//! - A node is either a leaf (value, no children) or internal (children, no
//!   value); promotion and demotion are destructive and documented.
//! - All mutation is synchronous and single-threaded; watchers fire after
//!   the commit, never during it.

pub mod path;
pub mod proxy;
pub mod store;

pub use path::{GraphError, GraphResult, NodePath};
pub use proxy::NodeProxy;
pub use store::{Node, NodeStore, WatchEvent, WatchKind};
