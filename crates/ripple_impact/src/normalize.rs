//! Path normalization utilities for cross-platform consistency.
//!
//! All graph keys are repo-relative paths with forward slashes and no dot
//! segments. Every path that enters the crate from outside goes through
//! [`normalize_path`] first.

/// Normalizes a path to use forward slashes only.
///
/// - Converts backslashes to forward slashes
/// - Collapses consecutive slashes
pub fn normalize_slashes(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut last_was_slash = false;

    for c in path.chars() {
        let is_slash = c == '/' || c == '\\';
        if is_slash {
            if !last_was_slash {
                result.push('/');
            }
            last_was_slash = true;
        } else {
            result.push(c);
            last_was_slash = false;
        }
    }
    result
}

/// Normalizes a path to canonical repo-relative form.
///
/// Forward slashes, no leading `/` or `./`, no trailing slash, and `.`/`..`
/// segments resolved lexically. `..` segments that would climb above the
/// repo root are preserved so callers can detect the escape.
pub fn normalize_path(path: &str) -> String {
    let slashed = normalize_slashes(path);
    let mut segments: Vec<&str> = Vec::new();

    for segment in slashed.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), None | Some(&"..")) {
                    segments.push("..");
                } else {
                    segments.pop();
                }
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Joins a relative specifier onto a base directory and normalizes.
///
/// Returns `None` when the joined path escapes the repo root (a leading `..`
/// survives normalization).
pub fn join_relative(base_dir: &str, specifier: &str) -> Option<String> {
    let joined = if base_dir.is_empty() {
        normalize_path(specifier)
    } else {
        normalize_path(&format!("{base_dir}/{specifier}"))
    };

    if joined == ".." || joined.starts_with("../") {
        return None;
    }
    Some(joined)
}

/// The directory part of a repo-relative path (`""` for top-level files).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// The file name part of a repo-relative path.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// The extension of a path's file name, without the dot.
pub fn extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx + 1..],
        _ => "",
    }
}
