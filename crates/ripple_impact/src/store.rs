//! `SQLite` graph persistence.
//!
//! Stores a dependency graph snapshot so runs can skip full rebuilds. Only
//! nodes and forward edges are persisted; reverse adjacency is recomputed
//! while loading rather than trusted from storage, which re-establishes the
//! mutual-inverse property defensively. Edges whose endpoints are unknown
//! are skipped with a warning.

use crate::impact::classify::FileType;
use crate::impact::graph::{DependencyGraph, FileNode};
use refinery::embed_migrations;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

embed_migrations!("migrations");

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),
}

/// Initializes the `SQLite` database at `<cache_dir>/graph.sqlite`.
///
/// # Errors
/// Fails when the directory is missing or the database cannot be migrated.
pub fn init_storage(cache_dir: &Path) -> Result<(), StoreError> {
    let db_path = cache_dir.join("graph.sqlite");
    let mut conn = Connection::open(&db_path)?;
    migrations::runner().run(&mut conn)?;
    Ok(())
}

/// Opens a connection to the database.
///
/// # Errors
/// Fails when the database cannot be opened.
pub fn open_connection(cache_dir: &Path) -> Result<Connection, StoreError> {
    let db_path = cache_dir.join("graph.sqlite");
    Ok(Connection::open(db_path)?)
}

/// Replaces the stored snapshot with `graph`, atomically.
///
/// # Errors
/// Fails when any statement inside the transaction fails; the previous
/// snapshot stays intact in that case.
pub fn save_graph(conn: &mut Connection, graph: &DependencyGraph) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM edges", [])?;
    tx.execute("DELETE FROM nodes", [])?;

    {
        let mut node_stmt = tx.prepare(
            "INSERT INTO nodes (path, file_type, last_modified, content_hash) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut edge_stmt = tx.prepare("INSERT INTO edges (src, dst) VALUES (?1, ?2)")?;

        for path in graph.paths() {
            if let Some(node) = graph.node(&path) {
                node_stmt.execute(params![
                    node.path,
                    node.file_type.as_str(),
                    node.last_modified,
                    node.content_hash
                ])?;
            }
            for dst in graph.dependencies_of(&path) {
                edge_stmt.execute(params![path, dst])?;
            }
        }
    }

    tx.commit()?;
    Ok(())
}

/// Restores the stored snapshot.
///
/// # Errors
/// Fails when the snapshot cannot be queried.
pub fn load_graph(conn: &Connection) -> Result<DependencyGraph, StoreError> {
    let mut graph = DependencyGraph::new();

    let mut node_stmt =
        conn.prepare("SELECT path, file_type, last_modified, content_hash FROM nodes")?;
    let rows = node_stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;
    for row in rows {
        let (path, file_type, last_modified, content_hash) = row?;
        let mut node = FileNode::new(path, FileType::from_str_lossy(&file_type), last_modified);
        node.content_hash = content_hash;
        graph.add_node(node);
    }

    let mut edge_stmt = conn.prepare("SELECT src, dst FROM edges ORDER BY src")?;
    let rows = edge_stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut forward: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let (src, dst) = row?;
        if !graph.contains(&src) || !graph.contains(&dst) {
            warn!(%src, %dst, "skipping persisted edge with unknown endpoint");
            continue;
        }
        forward.entry(src).or_default().push(dst);
    }
    for (src, dsts) in forward {
        graph.set_dependencies(&src, &dsts);
    }

    debug_assert!(graph.check_invariants());
    Ok(graph)
}

/// Whether the store already holds a snapshot.
///
/// # Errors
/// Fails when the database cannot be queried.
pub fn has_snapshot(conn: &Connection) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
    Ok(count > 0)
}
