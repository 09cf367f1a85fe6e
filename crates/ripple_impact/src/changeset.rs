//! Changed-file list input.
//!
//! The change detector is an external collaborator (typically a VCS diff
//! tool); this module parses its `git diff --name-status` style output into
//! `(path, operation)` records. Parsing is best-effort: malformed lines are
//! skipped with a warning, never rejected wholesale, because an empty impact
//! result is a safe default.

use crate::normalize::normalize_path;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What happened to a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// One record from the change detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub op: ChangeOp,
}

/// Parses `git diff --name-status` output.
///
/// Recognized statuses: `A`, `M`, `T` (treated as modified), `D`,
/// `R<score>` (the new path is reported), `C<score>` (the copy is an added
/// file). Anything else is skipped with a warning.
pub fn parse_name_status(input: &str) -> Vec<ChangedFile> {
    let mut changes = Vec::new();

    for line in input.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(change) => changes.push(change),
            None => warn!(line, "skipping unrecognized change record"),
        }
    }

    changes
}

fn parse_line(line: &str) -> Option<ChangedFile> {
    let mut fields = line.split('\t');
    let status = fields.next()?;
    let first_path = fields.next()?;
    let second_path = fields.next();

    let (op, raw_path) = match status.chars().next()? {
        'A' => (ChangeOp::Added, first_path),
        'M' | 'T' => (ChangeOp::Modified, first_path),
        'D' => (ChangeOp::Deleted, first_path),
        'R' => (ChangeOp::Renamed, second_path?),
        'C' => (ChangeOp::Added, second_path?),
        _ => return None,
    };

    let path = normalize_path(raw_path);
    if path.is_empty() {
        return None;
    }
    Some(ChangedFile { path, op })
}

/// The plain path list the analyzer consumes. The operation tag stays with
/// the caller (e.g. for dropping a deleted file's node).
pub fn changed_paths(changes: &[ChangedFile]) -> Vec<String> {
    changes.iter().map(|c| c.path.clone()).collect()
}
