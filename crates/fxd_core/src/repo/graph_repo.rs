//! Graph repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Serialize the node tree, snippet index and view registry to the
//!   persistence file and rebuild them from it.
//! - Attach the failing operation name to storage errors.
//!
//! # Invariants
//! - `nodes.path` rows are written pre-order, so a parent path is always a
//!   proper prefix of its children and lexicographic load order suffices.
//! - Snippet rows must reference existing node rows.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::graph::path::NodePath;
use crate::graph::store::{Node, NodeStore};
use crate::model::snippet::meta;
use crate::model::value::NodeValue;
use crate::model::view::{Membership, RenderOptions, View, ViewRegistry};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors from graph persistence.
#[derive(Debug)]
pub enum PersistError {
    /// Underlying storage failure, tagged with the failing operation.
    Storage { op: &'static str, source: DbError },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted row cannot be decoded into a valid in-memory shape.
    InvalidData(String),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage { op, source } => {
                write!(f, "persistence operation `{op}` failed: {source}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "graph repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "graph repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted graph data: {message}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DbError> for PersistError {
    fn from(value: DbError) -> Self {
        Self::Storage {
            op: "sqlite",
            source: value,
        }
    }
}

impl From<rusqlite::Error> for PersistError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage {
            op: "sqlite",
            source: DbError::Sqlite(value),
        }
    }
}

impl PersistError {
    /// Replaces the generic storage op tag with the public entry point
    /// name, so callers see which operation failed.
    fn tag_op(self, op: &'static str) -> Self {
        match self {
            Self::Storage { source, .. } => Self::Storage { op, source },
            other => other,
        }
    }
}

/// Persistence contract for the node graph and view registry.
pub trait GraphRepository {
    fn save_graph(&self, store: &NodeStore) -> PersistResult<()>;
    fn load_graph(&self) -> PersistResult<NodeStore>;
    fn save_views(&self, views: &ViewRegistry) -> PersistResult<()>;
    fn load_views(&self) -> PersistResult<ViewRegistry>;
}

/// SQLite-backed graph repository.
#[derive(Debug)]
pub struct SqliteGraphRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGraphRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> PersistResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GraphRepository for SqliteGraphRepository<'_> {
    fn save_graph(&self, store: &NodeStore) -> PersistResult<()> {
        let started_at = Instant::now();
        let node_count =
            save_graph_tx(self.conn, store).map_err(|err| err.tag_op("graph_save"))?;
        info!(
            "event=graph_save module=repo status=ok nodes={node_count} snippets={} duration_ms={}",
            store.snippet_ids().count(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn load_graph(&self) -> PersistResult<NodeStore> {
        let started_at = Instant::now();
        let (store, node_count) =
            load_graph_rows(self.conn).map_err(|err| err.tag_op("graph_load"))?;
        info!(
            "event=graph_load module=repo status=ok nodes={node_count} snippets={} duration_ms={}",
            store.snippet_ids().count(),
            started_at.elapsed().as_millis()
        );
        Ok(store)
    }

    fn save_views(&self, views: &ViewRegistry) -> PersistResult<()> {
        save_views_tx(self.conn, views).map_err(|err| err.tag_op("views_save"))
    }

    fn load_views(&self) -> PersistResult<ViewRegistry> {
        load_view_rows(self.conn).map_err(|err| err.tag_op("views_load"))
    }
}

fn save_graph_tx(conn: &Connection, store: &NodeStore) -> PersistResult<usize> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM snippets;", [])?;
    tx.execute("DELETE FROM nodes;", [])?;

    let mut node_count = 0;
    save_subtree(&tx, store.root(), None, &mut node_count)?;

    for id in store.snippet_ids() {
        let path = store
            .snippet_path(id)
            .ok_or_else(|| PersistError::InvalidData(format!("unindexed snippet id `{id}`")))?;
        let node = store.node(path).ok_or_else(|| {
            PersistError::InvalidData(format!(
                "snippet id `{id}` points at missing node `{path}`"
            ))
        })?;
        tx.execute(
            "INSERT INTO snippets (id, path, lang, file, sort_order, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id,
                path.as_str(),
                node.meta(meta::LANG),
                node.meta(meta::FILE),
                node.meta(meta::ORDER).and_then(|v| v.parse::<i64>().ok()),
                node.meta(meta::CHECKSUM),
            ],
        )?;
    }

    tx.commit()?;
    Ok(node_count)
}

/// Pre-order walk emitting one row per named node. The anonymous root is
/// not stored.
fn save_subtree(
    tx: &Transaction<'_>,
    node: &Node,
    parent_path: Option<&str>,
    node_count: &mut usize,
) -> PersistResult<()> {
    for (segment, child) in node.children() {
        let path = match parent_path {
            Some(parent) => format!("{parent}.{segment}"),
            None => segment.to_string(),
        };
        let metadata_json = serde_json::to_string(child.metadata())
            .map_err(|err| PersistError::InvalidData(format!("metadata for `{path}`: {err}")))?;
        tx.execute(
            "INSERT INTO nodes (path, parent_path, value_type, value_text, version, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                path,
                parent_path,
                child.value().map(NodeValue::type_tag),
                child.value().map(NodeValue::to_text),
                child.version() as i64,
                metadata_json,
            ],
        )?;
        *node_count += 1;
        save_subtree(tx, child, Some(&path), node_count)?;
    }
    Ok(())
}

fn load_graph_rows(conn: &Connection) -> PersistResult<(NodeStore, usize)> {
    let mut store = NodeStore::new();
    let mut node_count = 0;

    let mut stmt = conn.prepare(
        "SELECT path, parent_path, value_type, value_text, version, metadata_json
         FROM nodes
         ORDER BY path ASC;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        restore_node_row(&mut store, row)?;
        node_count += 1;
    }

    let mut stmt = conn.prepare("SELECT id, path FROM snippets ORDER BY id ASC;")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let id: String = row.get("id")?;
        let path_text: String = row.get("path")?;
        let path = NodePath::parse(path_text.as_str()).map_err(|_| {
            PersistError::InvalidData(format!("invalid path `{path_text}` in snippets.path"))
        })?;
        if store.node(&path).is_none() {
            return Err(PersistError::InvalidData(format!(
                "snippet `{id}` references missing node `{path_text}`"
            )));
        }
        store.register_snippet(id, path);
    }

    Ok((store, node_count))
}

fn restore_node_row(store: &mut NodeStore, row: &Row<'_>) -> PersistResult<()> {
    let path_text: String = row.get("path")?;
    let path = NodePath::parse(path_text.as_str()).map_err(|_| {
        PersistError::InvalidData(format!("invalid path `{path_text}` in nodes.path"))
    })?;

    let value_type: Option<String> = row.get("value_type")?;
    let value_text: Option<String> = row.get("value_text")?;
    let value = match (value_type, value_text) {
        (None, None) => None,
        (Some(tag), Some(text)) => Some(NodeValue::from_tagged_text(&tag, &text).ok_or_else(
            || {
                PersistError::InvalidData(format!(
                    "value `{text}` does not parse as `{tag}` for node `{path_text}`"
                ))
            },
        )?),
        _ => {
            return Err(PersistError::InvalidData(format!(
                "value_type/value_text mismatch for node `{path_text}`"
            )));
        }
    };

    let version = row.get::<_, i64>("version")?;
    if version < 0 {
        return Err(PersistError::InvalidData(format!(
            "negative version for node `{path_text}`"
        )));
    }

    let metadata_json: String = row.get("metadata_json")?;
    let metadata: BTreeMap<String, String> =
        serde_json::from_str(&metadata_json).map_err(|err| {
            PersistError::InvalidData(format!("metadata for node `{path_text}`: {err}"))
        })?;

    store.restore_node(&path, value, version as u64, metadata);
    Ok(())
}

fn save_views_tx(conn: &Connection, views: &ViewRegistry) -> PersistResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM views;", [])?;
    for view in views.iter() {
        let membership_json = serde_json::to_string(&view.membership).map_err(|err| {
            PersistError::InvalidData(format!("membership for view `{}`: {err}", view.name))
        })?;
        let options_json = serde_json::to_string(&view.options).map_err(|err| {
            PersistError::InvalidData(format!("options for view `{}`: {err}", view.name))
        })?;
        tx.execute(
            "INSERT INTO views (view_uuid, name, membership_json, options_json)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                view.uuid.to_string(),
                view.name,
                membership_json,
                options_json
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn load_view_rows(conn: &Connection) -> PersistResult<ViewRegistry> {
    let mut registry = ViewRegistry::new();
    let mut stmt = conn.prepare(
        "SELECT view_uuid, name, membership_json, options_json
         FROM views
         ORDER BY name ASC;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("view_uuid")?;
        let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
            PersistError::InvalidData(format!("invalid uuid `{uuid_text}` in views.view_uuid"))
        })?;
        let name: String = row.get("name")?;
        let membership_json: String = row.get("membership_json")?;
        let membership: Membership = serde_json::from_str(&membership_json).map_err(|err| {
            PersistError::InvalidData(format!("membership for view `{name}`: {err}"))
        })?;
        let options_json: String = row.get("options_json")?;
        let options: RenderOptions = serde_json::from_str(&options_json).map_err(|err| {
            PersistError::InvalidData(format!("options for view `{name}`: {err}"))
        })?;
        registry.upsert(View {
            uuid,
            name,
            membership,
            options,
        });
    }
    Ok(registry)
}

fn ensure_connection_ready(conn: &Connection) -> PersistResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(PersistError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["nodes", "snippets", "views"] {
        if !table_exists(conn, table)? {
            return Err(PersistError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> PersistResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
