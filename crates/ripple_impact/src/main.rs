//! CLI entry point.
//!
//! Reads a `git diff --name-status` change list on stdin, builds or
//! incrementally refreshes the cached dependency graph for a workspace, and
//! prints the resulting impact analysis as JSON on stdout. Logs go to stderr.
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use ripple_impact::{
    analyze, build, changed_paths, parse_name_status, refresh_file, store, ChangeOp, FileSet,
    ImpactAnalysis,
};
use std::env;
use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ripple_impact=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Builds or refreshes the cached graph and analyzes the change list.
fn run_analysis(
    cache_dir: &Path,
    workspace_root: &Path,
    change_input: &str,
) -> Result<ImpactAnalysis, Box<dyn Error>> {
    let changes = parse_name_status(change_input);
    let files = FileSet::from_dir(workspace_root)?;

    store::init_storage(cache_dir)?;
    let mut conn = store::open_connection(cache_dir)?;

    let graph = if store::has_snapshot(&conn)? {
        let mut graph = store::load_graph(&conn)?;
        info!(
            nodes = graph.node_count(),
            changed = changes.len(),
            "refreshing cached graph"
        );
        for change in &changes {
            // A deleted path is gone from the file set; refresh removes it.
            let diagnostics = refresh_file(&mut graph, &files, &change.path);
            if change.op == ChangeOp::Deleted && graph.contains(&change.path) {
                warn!(path = %change.path, "deleted file still present in workspace scan");
            }
            for diagnostic in diagnostics {
                warn!(%diagnostic, "refresh diagnostic");
            }
        }
        graph
    } else {
        info!(files = files.len(), "no cached graph, building from scratch");
        let outcome = build(&files);
        for diagnostic in &outcome.diagnostics {
            warn!(%diagnostic, "build diagnostic");
        }
        outcome.graph
    };

    if graph.is_overflow() {
        warn!("graph overflowed its node cap; results may under-select, run everything");
    }

    store::save_graph(&mut conn, &graph)?;

    let paths = changed_paths(&changes);
    Ok(analyze(&graph, paths))
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: ripple_impact <cache_dir> <workspace_root> < name-status-diff");
        std::process::exit(1);
    }

    let cache_dir = PathBuf::from(&args[1]);
    let workspace_root = PathBuf::from(&args[2]);

    let mut change_input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut change_input) {
        eprintln!("Error reading change list from stdin: {e}");
        std::process::exit(1);
    }

    match run_analysis(&cache_dir, &workspace_root, &change_input) {
        Ok(impact) => match serde_json::to_string_pretty(&impact) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing result: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
