//! Dependency graph using petgraph.
//!
//! Stores file dependencies as a directed graph where edge A→B means
//! "A depends on (imports) B". Forward and reverse adjacency are views of
//! the same edge list, so the mutual-inverse property (`q` in `edges[p]` iff
//! `p` in `reverse_edges[q]`) holds by construction;
//! [`DependencyGraph::check_invariants`] verifies the path index and edge
//! endpoints on top of that.

use crate::impact::classify::FileType;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Maximum number of nodes before the graph stops accepting files and the
/// caller must fall back to selecting everything.
const MAX_GRAPH_NODES: usize = 50_000;

/// Per-file metadata carried as the node weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Repo-relative, normalized path; the node's unique key.
    pub path: String,
    /// Category assigned at classification time. Changes only when the file
    /// is reclassified on rebuild.
    pub file_type: FileType,
    /// Unix timestamp used only for incremental-rebuild decisions.
    pub last_modified: i64,
    /// BLAKE3 hex digest of the content as of the last extraction.
    pub content_hash: Option<String>,
}

impl FileNode {
    pub fn new(path: impl Into<String>, file_type: FileType, last_modified: i64) -> Self {
        Self {
            path: path.into(),
            file_type,
            last_modified,
            content_hash: None,
        }
    }
}

/// Bidirectional file dependency graph.
pub struct DependencyGraph {
    graph: StableDiGraph<FileNode, ()>,
    path_to_idx: HashMap<String, NodeIndex>,
    overflow: bool,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            path_to_idx: HashMap::new(),
            overflow: false,
        }
    }

    /// Adds a file node. Idempotent: an existing node has its type and
    /// timestamp refreshed in place (reclassification on rebuild), keeping
    /// its edges and content hash. Returns `None` once the node cap is hit.
    pub fn add_node(&mut self, node: FileNode) -> Option<NodeIndex> {
        if let Some(&idx) = self.path_to_idx.get(&node.path) {
            if let Some(existing) = self.graph.node_weight_mut(idx) {
                existing.file_type = node.file_type;
                existing.last_modified = node.last_modified;
            }
            return Some(idx);
        }

        if self.graph.node_count() >= MAX_GRAPH_NODES {
            if !self.overflow {
                warn!("graph exceeded {MAX_GRAPH_NODES} nodes, callers must select everything");
                self.overflow = true;
            }
            return None;
        }

        let path = node.path.clone();
        let idx = self.graph.add_node(node);
        self.path_to_idx.insert(path, idx);
        Some(idx)
    }

    /// Replaces the outgoing edges of `from` atomically: all existing
    /// outgoing edges are removed before the new ones are added. Duplicate
    /// targets collapse to one edge; targets not present as nodes are
    /// skipped. Self-references are allowed.
    pub fn set_dependencies(&mut self, from: &str, dependencies: &[String]) {
        let Some(&from_idx) = self.path_to_idx.get(from) else {
            return;
        };

        let stale: Vec<_> = self
            .graph
            .edges_directed(from_idx, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge_id in stale {
            self.graph.remove_edge(edge_id);
        }

        let unique: BTreeSet<&String> = dependencies.iter().collect();
        for dep in unique {
            if let Some(&to_idx) = self.path_to_idx.get(dep.as_str()) {
                self.graph.add_edge(from_idx, to_idx, ());
            }
        }
    }

    /// Records the content digest observed for a file.
    pub fn set_content_hash(&mut self, path: &str, hash: Option<String>) {
        if let Some(&idx) = self.path_to_idx.get(path) {
            if let Some(node) = self.graph.node_weight_mut(idx) {
                node.content_hash = hash;
            }
        }
    }

    /// Files `path` directly depends on (forward adjacency).
    pub fn dependencies_of(&self, path: &str) -> BTreeSet<String> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Files that directly depend on `path` (reverse adjacency).
    pub fn dependents_of(&self, path: &str) -> BTreeSet<String> {
        self.neighbors(path, Direction::Incoming)
    }

    fn neighbors(&self, path: &str, direction: Direction) -> BTreeSet<String> {
        let Some(&idx) = self.path_to_idx.get(path) else {
            return BTreeSet::new();
        };
        self.graph
            .edges_directed(idx, direction)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.graph.node_weight(other).map(|n| n.path.clone())
            })
            .collect()
    }

    pub fn node(&self, path: &str) -> Option<&FileNode> {
        self.path_to_idx
            .get(path)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn file_type_of(&self, path: &str) -> Option<FileType> {
        self.node(path).map(|n| n.file_type)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.path_to_idx.contains_key(path)
    }

    /// Removes a file and all edges touching it.
    pub fn remove_node(&mut self, path: &str) {
        if let Some(idx) = self.path_to_idx.remove(path) {
            self.graph.remove_node(idx);
        }
    }

    /// All node paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.path_to_idx.keys().cloned().collect();
        paths.sort_unstable();
        paths
    }

    /// All node weights, in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.graph.node_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_overflow(&self) -> bool {
        self.overflow
    }

    /// Structural soundness check, for tests and debug assertions.
    ///
    /// Verifies the path index and node weights agree in both directions and
    /// that every edge connects indexed nodes, which together re-establish
    /// the mutual-inverse property of forward and reverse adjacency. A
    /// `false` here is a defect in this module, never an input condition.
    pub fn check_invariants(&self) -> bool {
        if self.path_to_idx.len() != self.graph.node_count() {
            return false;
        }
        for (path, &idx) in &self.path_to_idx {
            match self.graph.node_weight(idx) {
                Some(node) if node.path == *path => {}
                _ => return false,
            }
        }
        for &from_idx in self.path_to_idx.values() {
            for edge in self.graph.edges_directed(from_idx, Direction::Outgoing) {
                let target_indexed = self
                    .graph
                    .node_weight(edge.target())
                    .is_some_and(|n| self.path_to_idx.get(&n.path) == Some(&edge.target()));
                if !target_indexed {
                    return false;
                }
            }
        }
        for path in self.path_to_idx.keys() {
            for dep in self.dependencies_of(path) {
                if !self.dependents_of(&dep).contains(path) {
                    return false;
                }
            }
        }
        true
    }
}
