//! Impact analysis over the dependency graph.
//!
//! Computes which files, and crucially which test files, are affected by a
//! set of changed files, using reverse BFS with a visited set so dependency
//! cycles terminate. Deterministic, no hidden state, and it never fails:
//! unknown changed paths simply have no dependents.

use crate::impact::classify::FileType;
use crate::impact::discovery::companion_tests;
use crate::impact::graph::DependencyGraph;
use crate::normalize::normalize_path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// The result of one impact analysis.
///
/// `changed_files`, `directly_affected_files`, and
/// `transitively_affected_files` are pairwise disjoint by construction.
/// Ordered collections keep the serialized form deterministic and
/// duplicate-free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    pub changed_files: BTreeSet<String>,
    pub directly_affected_files: BTreeSet<String>,
    pub transitively_affected_files: BTreeSet<String>,
    pub affected_test_files: BTreeSet<String>,
    /// Test file → the source files it directly imports. Intentionally
    /// non-transitive: a test "covers" what it imports, nothing more.
    pub test_coverage: BTreeMap<String, BTreeSet<String>>,
}

impl ImpactAnalysis {
    /// Every affected file: changed ∪ direct ∪ transitive.
    pub fn all_affected(&self) -> BTreeSet<String> {
        self.changed_files
            .iter()
            .chain(&self.directly_affected_files)
            .chain(&self.transitively_affected_files)
            .cloned()
            .collect()
    }
}

/// Computes the impact of `changed` on `graph`.
pub fn analyze<I, P>(graph: &DependencyGraph, changed: I) -> ImpactAnalysis
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let changed_files: BTreeSet<String> = changed
        .into_iter()
        .map(|p| normalize_path(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect();

    let directly_affected_files = direct_dependents(graph, &changed_files);
    let transitively_affected_files =
        transitive_dependents(graph, &changed_files, &directly_affected_files);
    let affected_test_files = affected_tests(
        graph,
        &changed_files,
        &directly_affected_files,
        &transitively_affected_files,
    );
    let test_coverage = coverage_of(graph, &affected_test_files);

    ImpactAnalysis {
        changed_files,
        directly_affected_files,
        transitively_affected_files,
        affected_test_files,
        test_coverage,
    }
}

/// Files with a direct edge into a changed file, minus the changed files
/// themselves (self-imports would otherwise leak in).
fn direct_dependents(graph: &DependencyGraph, changed: &BTreeSet<String>) -> BTreeSet<String> {
    let mut direct = BTreeSet::new();
    for path in changed {
        for dependent in graph.dependents_of(path) {
            if !changed.contains(&dependent) {
                direct.insert(dependent);
            }
        }
    }
    direct
}

/// Reverse BFS from the direct set. The visited set makes cycles terminate
/// and keeps the three result sets disjoint.
fn transitive_dependents(
    graph: &DependencyGraph,
    changed: &BTreeSet<String>,
    direct: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut transitive = BTreeSet::new();
    let mut visited: HashSet<String> = changed.iter().chain(direct).cloned().collect();
    let mut queue: VecDeque<String> = direct.iter().cloned().collect();

    while let Some(current) = queue.pop_front() {
        for dependent in graph.dependents_of(&current) {
            if visited.insert(dependent.clone()) {
                transitive.insert(dependent.clone());
                queue.push_back(dependent);
            }
        }
    }

    transitive
}

/// Test files among the affected set, plus companion tests of changed source
/// files found by naming convention and by reverse-edge lookup.
fn affected_tests(
    graph: &DependencyGraph,
    changed: &BTreeSet<String>,
    direct: &BTreeSet<String>,
    transitive: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut tests = BTreeSet::new();

    for path in changed.iter().chain(direct).chain(transitive) {
        if graph.file_type_of(path) == Some(FileType::Test) {
            tests.insert(path.clone());
        }
    }

    for path in changed {
        if graph.file_type_of(path) != Some(FileType::Source) {
            continue;
        }
        tests.extend(companion_tests(path, graph));
        for dependent in graph.dependents_of(path) {
            if graph.file_type_of(&dependent) == Some(FileType::Test) {
                tests.insert(dependent);
            }
        }
    }

    tests
}

/// Direct source coverage of each affected test.
fn coverage_of(
    graph: &DependencyGraph,
    tests: &BTreeSet<String>,
) -> BTreeMap<String, BTreeSet<String>> {
    tests
        .iter()
        .map(|test| {
            let sources = graph
                .dependencies_of(test)
                .into_iter()
                .filter(|dep| graph.file_type_of(dep) == Some(FileType::Source))
                .collect();
            (test.clone(), sources)
        })
        .collect()
}
