//! Companion test discovery.
//!
//! Maps a source file to its test files by naming convention, independent of
//! import edges. This catches tests that exercise a module indirectly, for
//! example through a public API re-export, and would otherwise be missed.

use crate::impact::classify::{FileType, SOURCE_EXTENSIONS, TEST_SUFFIXES};
use crate::impact::graph::DependencyGraph;
use crate::normalize::{file_name, parent_dir};
use std::collections::BTreeSet;

/// Finds test files paired with `source` by convention.
///
/// Three conventions are checked, all against graph membership:
/// - co-located: `src/foo.ts` → `src/foo.test.ts`
/// - `__tests__` subdirectory: `src/foo.ts` → `src/__tests__/foo.test.ts`
/// - mirrored test tree: `src/lib/foo.ts` → `test/lib/foo.test.ts`
///
/// Candidates must exist as `Test` nodes; a same-named source file never
/// qualifies.
pub fn companion_tests(source: &str, graph: &DependencyGraph) -> BTreeSet<String> {
    let Some(stem) = source_stem(source) else {
        return BTreeSet::new();
    };
    let parent = parent_dir(source);

    let mut candidates = Vec::new();
    push_test_names(&mut candidates, parent, stem);
    push_test_names(&mut candidates, &subdir(parent, "__tests__"), stem);
    for mirror in mirrored_test_dirs(parent) {
        push_test_names(&mut candidates, &mirror, stem);
    }

    candidates
        .into_iter()
        .filter(|c| graph.file_type_of(c) == Some(FileType::Test))
        .collect()
}

/// The file name without its source extension; `None` for files that are not
/// source-shaped (no point pairing `styles.css` with `styles.test.ts`).
fn source_stem(path: &str) -> Option<&str> {
    let name = file_name(path);
    for ext in SOURCE_EXTENSIONS {
        if let Some(stem) = name.strip_suffix(&format!(".{ext}")) {
            if !stem.is_empty() {
                return Some(stem);
            }
        }
    }
    None
}

fn push_test_names(out: &mut Vec<String>, dir: &str, stem: &str) {
    for suffix in TEST_SUFFIXES {
        for ext in SOURCE_EXTENSIONS {
            out.push(join(dir, &format!("{stem}{suffix}.{ext}")));
        }
    }
}

/// Mirror directories for a source directory: `src/lib` maps to `test/lib`
/// and `tests/lib`; a path without a leading `src/` maps under the test
/// roots unchanged.
fn mirrored_test_dirs(parent: &str) -> Vec<String> {
    let rel = parent.strip_prefix("src/").unwrap_or(match parent {
        "src" => "",
        other => other,
    });
    ["test", "tests"]
        .iter()
        .map(|root| subdir_path(root, rel))
        .collect()
}

fn subdir(dir: &str, child: &str) -> String {
    join(dir, child)
}

fn subdir_path(root: &str, rel: &str) -> String {
    if rel.is_empty() {
        root.to_string()
    } else {
        format!("{root}/{rel}")
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::classify::classify;
    use crate::impact::graph::FileNode;

    fn graph_with(paths: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for p in paths {
            graph.add_node(FileNode::new(*p, classify(p), 0));
        }
        graph
    }

    #[test]
    fn finds_colocated_test() {
        let graph = graph_with(&["src/foo.ts", "src/foo.test.ts"]);
        let tests = companion_tests("src/foo.ts", &graph);
        assert_eq!(tests, BTreeSet::from(["src/foo.test.ts".to_string()]));
    }

    #[test]
    fn finds_colocated_spec() {
        let graph = graph_with(&["src/bar.ts", "src/bar.spec.ts"]);
        let tests = companion_tests("src/bar.ts", &graph);
        assert_eq!(tests, BTreeSet::from(["src/bar.spec.ts".to_string()]));
    }

    #[test]
    fn finds_tests_subdirectory() {
        let graph = graph_with(&["src/foo.ts", "src/__tests__/foo.test.ts"]);
        let tests = companion_tests("src/foo.ts", &graph);
        assert_eq!(
            tests,
            BTreeSet::from(["src/__tests__/foo.test.ts".to_string()])
        );
    }

    #[test]
    fn finds_mirrored_test_tree() {
        let graph = graph_with(&["src/lib/foo.ts", "test/lib/foo.test.ts"]);
        let tests = companion_tests("src/lib/foo.ts", &graph);
        assert_eq!(
            tests,
            BTreeSet::from(["test/lib/foo.test.ts".to_string()])
        );
    }

    #[test]
    fn finds_mirror_for_top_level_src_file() {
        let graph = graph_with(&["src/foo.ts", "test/foo.test.ts"]);
        let tests = companion_tests("src/foo.ts", &graph);
        assert_eq!(tests, BTreeSet::from(["test/foo.test.ts".to_string()]));
    }

    #[test]
    fn collects_all_matching_conventions() {
        let graph = graph_with(&[
            "src/foo.ts",
            "src/foo.test.ts",
            "src/__tests__/foo.spec.ts",
        ]);
        let tests = companion_tests("src/foo.ts", &graph);
        assert_eq!(tests.len(), 2);
    }

    #[test]
    fn no_companion_returns_empty() {
        let graph = graph_with(&["src/foo.ts", "src/bar.test.ts"]);
        assert!(companion_tests("src/foo.ts", &graph).is_empty());
    }

    #[test]
    fn candidate_absent_from_graph_is_not_invented() {
        // The convention matches, but no such file exists in the workspace.
        let graph = graph_with(&["src/foo.ts"]);
        assert!(companion_tests("src/foo.ts", &graph).is_empty());
    }

    #[test]
    fn non_source_shaped_files_have_no_companions() {
        let graph = graph_with(&["src/styles.css", "src/styles.test.ts"]);
        assert!(companion_tests("src/styles.css", &graph).is_empty());
    }

    #[test]
    fn works_for_jsx_and_module_variants() {
        let graph = graph_with(&["src/widget.tsx", "src/widget.test.tsx"]);
        let tests = companion_tests("src/widget.tsx", &graph);
        assert_eq!(tests, BTreeSet::from(["src/widget.test.tsx".to_string()]));
    }
}
