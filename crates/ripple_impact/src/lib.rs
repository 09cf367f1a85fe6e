//! Test impact analysis.
//!
//! Builds a static dependency graph of a workspace from syntactic
//! import/export edges and computes which test files must re-run after a set
//! of source files changes. The graph is an explicit value owned by the
//! caller and can be persisted between runs.
//!
//! Typical flow:
//!
//! ```
//! use ripple_impact::{analyze, build, FileSet};
//!
//! let files = FileSet::in_memory([
//!     ("src/math.ts", "export const add = (a: number, b: number) => a + b;"),
//!     ("src/math.test.ts", "import { add } from './math';"),
//! ]);
//! let outcome = build(&files);
//! let impact = analyze(&outcome.graph, ["src/math.ts"]);
//! assert!(impact.affected_test_files.contains("src/math.test.ts"));
//! ```

pub mod changeset;
pub mod fileset;
pub mod impact;
pub mod normalize;
pub mod store;

pub use changeset::{changed_paths, parse_name_status, ChangeOp, ChangedFile};
pub use fileset::{FileSet, PathIndex};
pub use impact::{
    analyze, build, build_with_options, classify, refresh_file, BuildOutcome, DependencyGraph,
    Diagnostic, FileNode, FileType, ImpactAnalysis, PathResolver, Resolution, ResolverOptions,
};
pub use store::{init_storage, load_graph, open_connection, save_graph, StoreError};
