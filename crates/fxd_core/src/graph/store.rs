//! Node tree ownership and mutation.
//!
//! # Responsibility
//! - Own every node; hand out values and path handles, never node refs.
//! - Enforce leaf/internal exclusivity via destructive promotion/demotion.
//! - Own the snippet id index and the watcher table.
//!
//! # Invariants
//! - Node versions start at 0 on creation and bump by 1 per mutation.
//! - Removing a node leaves its parent in place, even when childless.
//! - Watchers fire synchronously after the mutation has committed.

use crate::graph::path::{GraphError, GraphResult, NodePath};
use crate::model::snippet::{meta, SnippetSpec};
use crate::model::value::NodeValue;
use crate::snippet::checksum::fnv1a_hex;
use std::collections::BTreeMap;

/// Default parent path for snippets created without an explicit placement.
pub const DEFAULT_SNIPPET_ROOT: &str = "snippets";

/// One addressable point in the graph.
///
/// Either a leaf (`value` set, no children) or an internal node (children,
/// no value). The store upholds the exclusivity; `Node` itself is a plain
/// data record so the transaction layer can fork the tree with `Clone`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    value: Option<NodeValue>,
    children: BTreeMap<String, Node>,
    version: u64,
    metadata: BTreeMap<String, String>,
}

impl Node {
    /// Leaf value, if this node is a leaf.
    pub fn value(&self) -> Option<&NodeValue> {
        self.value.as_ref()
    }

    /// Child nodes in stored (sorted segment) order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Mutation counter for this node.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Open metadata mapping.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Single metadata value lookup.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty() && self.metadata.is_empty()
    }
}

/// Kind of mutation reported to watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Set,
    Removed,
}

/// Snapshot delivered to watchers after a commit.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    pub path: String,
    pub kind: WatchKind,
    /// Value after the mutation; `None` after removal.
    pub value: Option<NodeValue>,
    /// Version after the mutation; `None` after removal.
    pub version: Option<u64>,
}

type WatchFn = Box<dyn Fn(&WatchEvent)>;

/// Owner of the node tree, the snippet index and the watcher table.
#[derive(Default)]
pub struct NodeStore {
    root: Node,
    snippet_paths: BTreeMap<String, NodePath>,
    watchers: BTreeMap<String, Vec<WatchFn>>,
}

impl NodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the value at `path`. Missing nodes and internal nodes read as
    /// `None`; reads never create nodes.
    pub fn get(&self, path: &str) -> GraphResult<Option<NodeValue>> {
        let path = NodePath::parse(path)?;
        Ok(self.node(&path).and_then(|node| node.value.clone()))
    }

    /// Writes `value` at `path`, creating missing intermediate nodes.
    ///
    /// An intermediate leaf on the way is promoted destructively: its old
    /// value is discarded, not merged. Writing onto an internal node is the
    /// mirror image and drops its children. Both are intentional behavior,
    /// not defects. Returns the node version after the write.
    pub fn set(&mut self, path: &str, value: impl Into<NodeValue>) -> GraphResult<u64> {
        let path = NodePath::parse(path)?;
        let version = self.write_value(&path, value.into());
        self.notify(path.as_str(), WatchKind::Set);
        Ok(version)
    }

    /// Removes the node at `path` together with its subtree.
    ///
    /// The parent stays in place even when this empties it, so watcher
    /// registrations on the parent remain meaningful. Removing a missing
    /// path is a no-op.
    pub fn remove(&mut self, path: &str) -> GraphResult<()> {
        let path = NodePath::parse(path)?;
        let removed = match path.parent() {
            Some(parent) => match self.node_mut(&parent) {
                Some(node) => node.children.remove(path.leaf_segment()).is_some(),
                None => false,
            },
            None => self.root.children.remove(path.as_str()).is_some(),
        };

        if removed {
            let prefix = format!("{}.", path.as_str());
            self.snippet_paths
                .retain(|_, p| p != &path && !p.as_str().starts_with(&prefix));
            self.notify(path.as_str(), WatchKind::Removed);
        }
        Ok(())
    }

    /// Version of the node at `path`, if it exists.
    pub fn version(&self, path: &str) -> GraphResult<Option<u64>> {
        let path = NodePath::parse(path)?;
        Ok(self.node(&path).map(Node::version))
    }

    /// Metadata mapping of the node at `path`, if it exists.
    pub fn metadata(&self, path: &str) -> GraphResult<Option<&BTreeMap<String, String>>> {
        let path = NodePath::parse(path)?;
        Ok(self.node(&path).map(|node| &node.metadata))
    }

    /// Writes one metadata entry, creating the node when missing.
    ///
    /// Counts as a mutation of the node (version bump on existing nodes).
    pub fn set_metadata(
        &mut self,
        path: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> GraphResult<u64> {
        let path = NodePath::parse(path)?;
        let (node, created) = ensure_node(&mut self.root, &path);
        node.metadata.insert(key.into(), value.into());
        if !created {
            node.version += 1;
        }
        let version = node.version;
        self.notify(path.as_str(), WatchKind::Set);
        Ok(version)
    }

    /// Returns a path-only accessor handle for `path`.
    pub fn proxy(&self, path: &str) -> GraphResult<crate::graph::proxy::NodeProxy> {
        crate::graph::proxy::NodeProxy::new(path)
    }

    /// Registers a watcher for the exact path. Fired synchronously after
    /// every committed mutation of that path.
    pub fn watch(
        &mut self,
        path: &str,
        callback: impl Fn(&WatchEvent) + 'static,
    ) -> GraphResult<()> {
        let path = NodePath::parse(path)?;
        self.watchers
            .entry(path.as_str().to_string())
            .or_default()
            .push(Box::new(callback));
        Ok(())
    }

    /// Drops the tree, the snippet index and all watchers.
    pub fn reset(&mut self) {
        self.root = Node::default();
        self.snippet_paths.clear();
        self.watchers.clear();
    }

    /// Tree root, for read-only traversal (selector engine, persistence).
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Node lookup by validated path.
    pub fn node(&self, path: &NodePath) -> Option<&Node> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = current.children.get(segment)?;
        }
        Some(current)
    }

    /// Creates a snippet under the default snippet root.
    ///
    /// The node path is `snippets.<sanitized id>`; the `id` metadata keeps
    /// the original id text.
    pub fn create_snippet(&mut self, spec: &SnippetSpec, body: &str) -> GraphResult<NodePath> {
        let path =
            NodePath::parse(format!("{DEFAULT_SNIPPET_ROOT}.{}", sanitize_segment(&spec.id)))?;
        self.upsert_snippet_at(&path, spec, body)?;
        Ok(path)
    }

    /// Creates or updates a snippet node at an explicit path.
    ///
    /// Body, reserved metadata and the index registration are committed as
    /// one mutation (single version bump). Fails when the id is already
    /// registered at a different path. Returns the node version.
    pub fn upsert_snippet_at(
        &mut self,
        path: &NodePath,
        spec: &SnippetSpec,
        body: &str,
    ) -> GraphResult<u64> {
        if let Some(existing) = self.snippet_paths.get(&spec.id) {
            if existing != path {
                return Err(GraphError::DuplicateSnippetId {
                    id: spec.id.clone(),
                    existing_path: existing.as_str().to_string(),
                });
            }
        }

        let (node, created) = ensure_node(&mut self.root, path);
        node.value = Some(NodeValue::Text(body.to_string()));
        node.children.clear();
        node.metadata
            .insert(meta::ID.to_string(), spec.id.clone());
        if let Some(lang) = &spec.lang {
            node.metadata.insert(meta::LANG.to_string(), lang.clone());
        }
        if let Some(file) = &spec.file {
            node.metadata.insert(meta::FILE.to_string(), file.clone());
        }
        if let Some(order) = spec.order {
            node.metadata
                .insert(meta::ORDER.to_string(), order.to_string());
        }
        node.metadata
            .insert(meta::CHECKSUM.to_string(), fnv1a_hex(body.as_bytes()));
        if !created {
            node.version += 1;
        }
        let version = node.version;

        self.snippet_paths.insert(spec.id.clone(), path.clone());
        self.notify(path.as_str(), WatchKind::Set);
        Ok(version)
    }

    /// Path registered for a snippet id.
    pub fn snippet_path(&self, id: &str) -> Option<&NodePath> {
        self.snippet_paths.get(id)
    }

    /// Registered snippet ids in sorted order.
    pub fn snippet_ids(&self) -> impl Iterator<Item = &str> {
        self.snippet_paths.keys().map(String::as_str)
    }

    /// Restores one index entry without touching the tree. Load-path helper;
    /// the caller is responsible for the node existing.
    pub(crate) fn register_snippet(&mut self, id: String, path: NodePath) {
        self.snippet_paths.insert(id, path);
    }

    /// Direct node placement without version bumps or watcher dispatch.
    /// Load-path helper for rebuilding a tree from persisted rows.
    pub(crate) fn restore_node(
        &mut self,
        path: &NodePath,
        value: Option<NodeValue>,
        version: u64,
        metadata: BTreeMap<String, String>,
    ) {
        let (node, _) = ensure_node(&mut self.root, path);
        node.value = value;
        node.version = version;
        node.metadata = metadata;
    }

    /// Clones tree and index into a detached scratch store (no watchers).
    pub(crate) fn fork(&self) -> NodeStore {
        NodeStore {
            root: self.root.clone(),
            snippet_paths: self.snippet_paths.clone(),
            watchers: BTreeMap::new(),
        }
    }

    /// Replaces tree and index with a scratch fork, then fires watchers for
    /// the touched paths. The commit itself is a plain swap, so either all
    /// of the fork's mutations land or none did.
    pub(crate) fn adopt(&mut self, fork: NodeStore, touched_paths: &[String]) {
        self.root = fork.root;
        self.snippet_paths = fork.snippet_paths;
        for path in touched_paths {
            self.notify(path, WatchKind::Set);
        }
    }

    /// Whether the tree holds nothing at all. Used by persistence logging.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.snippet_paths.is_empty()
    }

    fn write_value(&mut self, path: &NodePath, value: NodeValue) -> u64 {
        let (node, created) = ensure_node(&mut self.root, path);
        node.value = Some(value);
        // Demotion mirror of promotion: a value write turns an internal
        // node back into a leaf.
        node.children.clear();
        if !created {
            node.version += 1;
        }
        node.version
    }

    fn node_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            current = current.children.get_mut(segment)?;
        }
        Some(current)
    }

    fn notify(&self, path: &str, kind: WatchKind) {
        let Some(list) = self.watchers.get(path) else {
            return;
        };
        let node = NodePath::parse(path).ok().and_then(|p| self.node(&p));
        let event = WatchEvent {
            path: path.to_string(),
            kind,
            value: node.and_then(|n| n.value.clone()),
            version: node.map(Node::version),
        };
        for callback in list {
            callback(&event);
        }
    }
}

impl std::fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStore")
            .field("root", &self.root)
            .field("snippet_paths", &self.snippet_paths)
            .field("watcher_paths", &self.watchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Walks to `path`, creating missing nodes and promoting intermediate
/// leaves. Returns the target node and whether it was created by this walk.
fn ensure_node<'tree>(root: &'tree mut Node, path: &NodePath) -> (&'tree mut Node, bool) {
    let mut current = root;
    let mut created = false;
    for segment in path.segments() {
        // Destructive promotion: descending through a leaf discards its
        // value. The old leaf payload is not preserved anywhere.
        if current.value.is_some() {
            current.value = None;
            current.version += 1;
        }
        created = !current.children.contains_key(segment);
        current = current.children.entry(segment.to_string()).or_default();
    }
    (current, created)
}

/// Makes an arbitrary id safe to embed as one path segment.
///
/// Dots would split into extra segments and whitespace is rejected nowhere
/// else, so both map to `_`. The original id survives in `id` metadata.
pub fn sanitize_segment(id: &str) -> String {
    let sanitized: String = id
        .chars()
        .map(|c| if c == '.' || c.is_whitespace() { '_' } else { c })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}
