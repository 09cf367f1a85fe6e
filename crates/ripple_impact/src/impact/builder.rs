//! Dependency graph construction.
//!
//! Two-pass build: first every file becomes a node, then every file's
//! specifiers are extracted and resolved into edges. The passes never
//! interleave, so every edge target is a known node and no partial graph is
//! observable. Per-file failures degrade to "no outgoing edges" and are
//! surfaced as structured diagnostics, never as build failures.

use crate::fileset::FileSet;
use crate::impact::classify::classify;
use crate::impact::extract::extract;
use crate::impact::graph::{DependencyGraph, FileNode};
use crate::impact::resolve::{PathResolver, Resolution, ResolverOptions};
use crate::normalize::normalize_path;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// A recoverable per-file condition observed during a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An in-repo-looking specifier had no matching file.
    UnresolvedSpecifier { file: String, specifier: String },
    /// The structured parse failed and the regex fallback ran.
    ParseFallback { file: String },
    /// Content could not be read; the file contributes no edges.
    UnreadableFile { file: String, error: String },
    /// The per-file specifier cap truncated extraction.
    SpecifierOverflow { file: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnresolvedSpecifier { file, specifier } => {
                write!(f, "cannot resolve '{specifier}' from {file}")
            }
            Diagnostic::ParseFallback { file } => {
                write!(f, "parse failed for {file}, used fallback scan")
            }
            Diagnostic::UnreadableFile { file, error } => {
                write!(f, "cannot read {file}: {error}")
            }
            Diagnostic::SpecifierOverflow { file } => {
                write!(f, "specifier cap hit in {file}, extraction truncated")
            }
        }
    }
}

/// A built graph plus everything worth telling the caller about.
pub struct BuildOutcome {
    pub graph: DependencyGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Private per-file result of the edge pass, merged into the graph after the
/// parallel fan-out completes.
struct EdgeBuffer {
    path: String,
    resolved: Vec<String>,
    content_hash: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

/// Builds the dependency graph for a file set with default resolver options.
pub fn build(files: &FileSet) -> BuildOutcome {
    build_with_options(files, ResolverOptions::default())
}

/// Builds the dependency graph for a file set.
pub fn build_with_options(files: &FileSet, options: ResolverOptions) -> BuildOutcome {
    let mut graph = DependencyGraph::new();

    // Node pass: every file is a known node before any edge exists.
    for (path, mtime) in files.entries() {
        debug_assert!(!graph.contains(path), "file sets cannot repeat keys");
        if graph
            .add_node(FileNode::new(path, classify(path), mtime))
            .is_none()
        {
            warn!("node cap hit during build, graph is overflowed");
            break;
        }
    }

    // Edge pass: reads and extraction fan out across the thread pool, each
    // worker filling a private buffer; merging is sequential.
    let index = files.index();
    let resolver = PathResolver::with_options(&index, options);
    let paths: Vec<&str> = files.paths().filter(|p| graph.contains(p)).collect();

    let buffers: Vec<EdgeBuffer> = paths
        .par_iter()
        .map(|path| scan_file(files, &resolver, path))
        .collect();

    let mut diagnostics = Vec::new();
    for buffer in buffers {
        graph.set_content_hash(&buffer.path, buffer.content_hash);
        graph.set_dependencies(&buffer.path, &buffer.resolved);
        diagnostics.extend(buffer.diagnostics);
    }

    debug_assert!(graph.check_invariants());
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        diagnostics = diagnostics.len(),
        "graph build complete"
    );

    BuildOutcome { graph, diagnostics }
}

/// Re-scans a single file and patches the graph in place.
///
/// - absent from the file set: the node and its edges are removed
/// - unchanged content hash: no-op
/// - otherwise: reclassified, re-extracted, stale edges swapped for new ones
pub fn refresh_file(graph: &mut DependencyGraph, files: &FileSet, path: &str) -> Vec<Diagnostic> {
    let path = normalize_path(path);

    if !files.contains(&path) {
        debug!(%path, "file gone, removing node");
        graph.remove_node(&path);
        return Vec::new();
    }

    let mtime = files.last_modified(&path).unwrap_or(0);
    if graph
        .add_node(FileNode::new(path.clone(), classify(&path), mtime))
        .is_none()
    {
        return Vec::new();
    }

    let content = match files.read(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!(%path, error = %e, "cannot read file, it contributes no edges");
            graph.set_content_hash(&path, None);
            graph.set_dependencies(&path, &[]);
            return vec![Diagnostic::UnreadableFile {
                file: path,
                error: e.to_string(),
            }];
        }
    };

    let hash = content_digest(&content);
    if graph.node(&path).and_then(|n| n.content_hash.as_deref()) == Some(hash.as_str()) {
        debug!(%path, "content unchanged, skipping edge refresh");
        return Vec::new();
    }

    let index = files.index();
    let resolver = PathResolver::new(&index);
    let (resolved, diagnostics) = scan_content(&content, &resolver, &path);

    graph.set_content_hash(&path, Some(hash));
    graph.set_dependencies(&path, &resolved);
    debug_assert!(graph.check_invariants());
    diagnostics
}

fn content_digest(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Reads, extracts, and resolves one file into a private buffer.
fn scan_file(files: &FileSet, resolver: &PathResolver<'_>, path: &str) -> EdgeBuffer {
    let content = match files.read(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path, error = %e, "cannot read file, it contributes no edges");
            return EdgeBuffer {
                path: path.to_string(),
                resolved: Vec::new(),
                content_hash: None,
                diagnostics: vec![Diagnostic::UnreadableFile {
                    file: path.to_string(),
                    error: e.to_string(),
                }],
            };
        }
    };

    let content_hash = Some(content_digest(&content));
    let (resolved, diagnostics) = scan_content(&content, resolver, path);

    EdgeBuffer {
        path: path.to_string(),
        resolved,
        content_hash,
        diagnostics,
    }
}

/// Extracts and resolves one file's content.
fn scan_content(
    content: &str,
    resolver: &PathResolver<'_>,
    path: &str,
) -> (Vec<String>, Vec<Diagnostic>) {
    let extraction = extract(content, path);

    let mut diagnostics = Vec::new();
    if extraction.downgraded {
        diagnostics.push(Diagnostic::ParseFallback {
            file: path.to_string(),
        });
    }
    if extraction.truncated {
        diagnostics.push(Diagnostic::SpecifierOverflow {
            file: path.to_string(),
        });
    }

    let mut resolved = Vec::new();
    for spec in extraction.specifiers {
        match resolver.resolve(&spec.specifier, path) {
            Resolution::Resolved(target) => resolved.push(target),
            Resolution::External => {}
            Resolution::NotFound => {
                warn!(path, specifier = %spec.specifier, "unresolved specifier dropped");
                diagnostics.push(Diagnostic::UnresolvedSpecifier {
                    file: path.to_string(),
                    specifier: spec.specifier,
                });
            }
        }
    }

    (resolved, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::classify::FileType;
    use std::collections::BTreeSet;

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn builds_nodes_and_edges() {
        let files = FileSet::in_memory([
            ("src/a.ts", "import { b } from './b';"),
            ("src/b.ts", "export const b = 1;"),
        ]);
        let outcome = build(&files);

        assert_eq!(outcome.graph.node_count(), 2);
        assert_eq!(outcome.graph.dependencies_of("src/a.ts"), set(&["src/b.ts"]));
        assert_eq!(outcome.graph.dependents_of("src/b.ts"), set(&["src/a.ts"]));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn mutual_inverse_holds_for_built_graph() {
        let files = FileSet::in_memory([
            ("src/a.ts", "import './b';\nimport './c';"),
            ("src/b.ts", "import './c';"),
            ("src/c.ts", ""),
        ]);
        let outcome = build(&files);
        assert!(outcome.graph.check_invariants());
    }

    #[test]
    fn build_is_idempotent() {
        let files = FileSet::in_memory([
            ("src/a.ts", "import { b } from './b';\nimport x from 'react';"),
            ("src/b.ts", "export * from './c';"),
            ("src/c.ts", ""),
        ]);
        let first = build(&files);
        let second = build(&files);

        assert_eq!(first.graph.paths(), second.graph.paths());
        for path in first.graph.paths() {
            assert_eq!(
                first.graph.dependencies_of(&path),
                second.graph.dependencies_of(&path)
            );
            assert_eq!(
                first.graph.dependents_of(&path),
                second.graph.dependents_of(&path)
            );
        }
    }

    #[test]
    fn external_import_produces_no_edge_and_no_diagnostic() {
        let files = FileSet::in_memory([("src/a.ts", "import React from 'react';")]);
        let outcome = build(&files);

        assert!(outcome.graph.dependencies_of("src/a.ts").is_empty());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn unresolved_relative_import_is_dropped_with_diagnostic() {
        let files = FileSet::in_memory([("src/a.ts", "import { x } from './missing';")]);
        let outcome = build(&files);

        assert!(outcome.graph.dependencies_of("src/a.ts").is_empty());
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::UnresolvedSpecifier {
                file: "src/a.ts".into(),
                specifier: "./missing".into(),
            }]
        );
    }

    #[test]
    fn unreadable_file_contributes_no_edges() {
        let files = FileSet::with_loader(
            [("src/bad.ts", 0), ("src/ok.ts", 0)],
            Box::new(|path| {
                if path.contains("bad") {
                    Err(std::io::Error::other("boom"))
                } else {
                    Ok("import './bad';".to_string())
                }
            }),
        );
        let outcome = build(&files);

        // The unreadable file is still a node and can be depended on.
        assert_eq!(outcome.graph.node_count(), 2);
        assert!(outcome.graph.dependencies_of("src/bad.ts").is_empty());
        assert_eq!(
            outcome.graph.dependencies_of("src/ok.ts"),
            set(&["src/bad.ts"])
        );
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnreadableFile { file, .. } if file == "src/bad.ts")));
    }

    #[test]
    fn parse_failure_downgrades_and_diagnoses() {
        let files = FileSet::in_memory([
            ("src/broken.ts", "import { oops from './dep';"),
            ("src/dep.ts", ""),
        ]);
        let outcome = build(&files);

        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ParseFallback { file } if file == "src/broken.ts")));
        // The fallback scan still finds the dependency.
        assert_eq!(
            outcome.graph.dependencies_of("src/broken.ts"),
            set(&["src/dep.ts"])
        );
    }

    #[test]
    fn classifies_nodes_during_node_pass() {
        let files = FileSet::in_memory([
            ("src/a.ts", ""),
            ("src/a.test.ts", "import './a';"),
            ("package.json", "{}"),
            ("logo.svg", "<svg/>"),
        ]);
        let outcome = build(&files);

        assert_eq!(
            outcome.graph.file_type_of("src/a.ts"),
            Some(FileType::Source)
        );
        assert_eq!(
            outcome.graph.file_type_of("src/a.test.ts"),
            Some(FileType::Test)
        );
        assert_eq!(
            outcome.graph.file_type_of("package.json"),
            Some(FileType::Config)
        );
        assert_eq!(outcome.graph.file_type_of("logo.svg"), Some(FileType::Asset));
    }

    #[test]
    fn self_import_builds_self_edge() {
        let files = FileSet::in_memory([("src/loop.ts", "import './loop';")]);
        let outcome = build(&files);
        assert_eq!(
            outcome.graph.dependencies_of("src/loop.ts"),
            set(&["src/loop.ts"])
        );
    }

    #[test]
    fn refresh_file_swaps_stale_edges() {
        let files = FileSet::in_memory([
            ("src/a.ts", "import './b';"),
            ("src/b.ts", ""),
            ("src/c.ts", ""),
        ]);
        let mut outcome = build(&files);
        assert_eq!(outcome.graph.dependencies_of("src/a.ts"), set(&["src/b.ts"]));

        let updated = FileSet::in_memory([
            ("src/a.ts", "import './c';"),
            ("src/b.ts", ""),
            ("src/c.ts", ""),
        ]);
        refresh_file(&mut outcome.graph, &updated, "src/a.ts");

        assert_eq!(outcome.graph.dependencies_of("src/a.ts"), set(&["src/c.ts"]));
        assert!(outcome.graph.dependents_of("src/b.ts").is_empty());
        assert_eq!(outcome.graph.dependents_of("src/c.ts"), set(&["src/a.ts"]));
    }

    #[test]
    fn refresh_file_removes_deleted_node() {
        let files = FileSet::in_memory([("src/a.ts", "import './b';"), ("src/b.ts", "")]);
        let mut outcome = build(&files);

        let without_b = FileSet::in_memory([("src/a.ts", "import './b';")]);
        refresh_file(&mut outcome.graph, &without_b, "src/b.ts");

        assert!(!outcome.graph.contains("src/b.ts"));
        assert!(outcome.graph.dependencies_of("src/a.ts").is_empty());
    }

    #[test]
    fn refresh_file_short_circuits_on_unchanged_hash() {
        let files = FileSet::in_memory([("src/a.ts", "import './b';"), ("src/b.ts", "")]);
        let mut outcome = build(&files);
        let hash_before = outcome
            .graph
            .node("src/a.ts")
            .and_then(|n| n.content_hash.clone());
        assert!(hash_before.is_some());

        let diags = refresh_file(&mut outcome.graph, &files, "src/a.ts");
        assert!(diags.is_empty());
        assert_eq!(outcome.graph.dependencies_of("src/a.ts"), set(&["src/b.ts"]));
    }

    #[test]
    fn refresh_file_adds_previously_unknown_file() {
        let files = FileSet::in_memory([("src/a.ts", "")]);
        let mut outcome = build(&files);

        let grown = FileSet::in_memory([("src/a.ts", ""), ("src/new.ts", "import './a';")]);
        refresh_file(&mut outcome.graph, &grown, "src/new.ts");

        assert!(outcome.graph.contains("src/new.ts"));
        assert_eq!(
            outcome.graph.dependencies_of("src/new.ts"),
            set(&["src/a.ts"])
        );
    }

    #[test]
    fn refresh_file_reclassifies() {
        let files = FileSet::in_memory([("src/a.ts", "")]);
        let mut outcome = build(&files);
        assert_eq!(
            outcome.graph.file_type_of("src/a.ts"),
            Some(FileType::Source)
        );

        // Same path cannot change type, but a renamed file enters fresh.
        let renamed = FileSet::in_memory([("src/a.test.ts", "")]);
        refresh_file(&mut outcome.graph, &renamed, "src/a.test.ts");
        assert_eq!(
            outcome.graph.file_type_of("src/a.test.ts"),
            Some(FileType::Test)
        );
    }
}
