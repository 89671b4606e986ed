//! Path-only accessor handles over the node store.
//!
//! # Responsibility
//! - Give callers an ergonomic handle for repeated access to one address.
//! - Guarantee handles cannot dangle: a proxy holds a path, never a node.
//!
//! # Invariants
//! - Tree mutation never invalidates an outstanding proxy; it only changes
//!   what the proxy's path currently resolves to.

use crate::graph::path::{GraphResult, NodePath};
use crate::graph::store::{NodeStore, WatchEvent};
use crate::model::value::NodeValue;
use std::collections::BTreeMap;

/// Accessor handle addressing one node by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProxy {
    path: NodePath,
}

impl NodeProxy {
    /// Creates a proxy after validating the path.
    pub fn new(path: &str) -> GraphResult<Self> {
        Ok(Self {
            path: NodePath::parse(path)?,
        })
    }

    /// Wraps an already-validated path.
    pub fn from_path(path: NodePath) -> Self {
        Self { path }
    }

    /// Addressed path.
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Derives a proxy one segment deeper. The target does not need to
    /// exist; like all graph addressing, creation is lazy on write.
    pub fn child(&self, segment: &str) -> GraphResult<Self> {
        Ok(Self {
            path: self.path.child(segment)?,
        })
    }

    /// Reads the current value at this proxy's path.
    pub fn get(&self, store: &NodeStore) -> Option<NodeValue> {
        store
            .node(&self.path)
            .and_then(|node| node.value().cloned())
    }

    /// Writes a value at this proxy's path. Returns the node version.
    pub fn set(&self, store: &mut NodeStore, value: impl Into<NodeValue>) -> GraphResult<u64> {
        store.set(self.path.as_str(), value)
    }

    /// Removes the node at this proxy's path. The proxy itself stays valid
    /// and can re-create the node with a later `set`.
    pub fn remove(&self, store: &mut NodeStore) -> GraphResult<()> {
        store.remove(self.path.as_str())
    }

    /// Current version of the addressed node, if it exists.
    pub fn version(&self, store: &NodeStore) -> Option<u64> {
        store.node(&self.path).map(|node| node.version())
    }

    /// Metadata snapshot of the addressed node, if it exists.
    pub fn metadata(&self, store: &NodeStore) -> Option<BTreeMap<String, String>> {
        store.node(&self.path).map(|node| node.metadata().clone())
    }

    /// Registers a watcher on this proxy's path.
    pub fn watch(
        &self,
        store: &mut NodeStore,
        callback: impl Fn(&WatchEvent) + 'static,
    ) -> GraphResult<()> {
        store.watch(self.path.as_str(), callback)
    }
}
