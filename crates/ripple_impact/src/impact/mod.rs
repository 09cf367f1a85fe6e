//! Test impact analysis core.
//!
//! Provides file classification, specifier extraction, path resolution,
//! dependency graph construction, and affected-test computation. The graph is
//! an explicit value owned by the caller; nothing here holds global state, so
//! parallel analyses over different branches cannot cross-contaminate.

pub mod analyze;
pub mod builder;
pub mod classify;
pub mod discovery;
pub mod extract;
pub mod graph;
pub mod resolve;

pub use analyze::{analyze, ImpactAnalysis};
pub use builder::{build, build_with_options, refresh_file, BuildOutcome, Diagnostic};
pub use classify::{classify, FileType};
pub use extract::{extract, Extraction, RawSpecifier, SpecifierKind};
pub use graph::{DependencyGraph, FileNode};
pub use resolve::{PathResolver, Resolution, ResolverOptions};
