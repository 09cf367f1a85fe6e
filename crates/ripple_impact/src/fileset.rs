//! Workspace file set input.
//!
//! A [`FileSet`] is the flat collection of repo-relative paths the builder
//! operates on, together with modification timestamps and a content source.
//! Content may be held eagerly in memory (tests, small sets) or read lazily
//! through a callback so a full workspace scan does not front-load all I/O.

use crate::normalize::normalize_path;
use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::warn;

type Loader = Box<dyn Fn(&str) -> io::Result<String> + Send + Sync>;

enum ContentSource {
    Memory(HashMap<String, String>),
    Lazy(Loader),
}

/// The set of files an analysis session covers.
pub struct FileSet {
    entries: BTreeMap<String, i64>,
    source: ContentSource,
}

impl FileSet {
    /// Builds an in-memory file set from `(path, content)` pairs.
    ///
    /// Paths are normalized; timestamps are unknown (`0`).
    pub fn in_memory<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let mut entries = BTreeMap::new();
        let mut contents = HashMap::new();
        for (path, content) in files {
            let path = normalize_path(&path.into());
            entries.insert(path.clone(), 0);
            contents.insert(path, content.into());
        }
        Self {
            entries,
            source: ContentSource::Memory(contents),
        }
    }

    /// Builds a file set whose content is read on demand through `loader`.
    pub fn with_loader<I, P>(paths: I, loader: Loader) -> Self
    where
        I: IntoIterator<Item = (P, i64)>,
        P: Into<String>,
    {
        let entries = paths
            .into_iter()
            .map(|(path, mtime)| (normalize_path(&path.into()), mtime))
            .collect();
        Self {
            entries,
            source: ContentSource::Lazy(loader),
        }
    }

    /// Scans a workspace directory into a lazy file set.
    ///
    /// The walk respects `.gitignore`, skips hidden directories' ignore rules
    /// the way the `ignore` crate does, and always skips `node_modules`.
    /// Unreadable directory entries are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error when `root` itself cannot be read.
    pub fn from_dir(root: &Path) -> io::Result<Self> {
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("workspace root {} is not a directory", root.display()),
            ));
        }

        let mut entries = BTreeMap::new();
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable walk entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || in_node_modules(path) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_secs() as i64);
            entries.insert(normalize_path(&relative.to_string_lossy()), mtime);
        }

        let base: PathBuf = root.to_path_buf();
        let loader: Loader = Box::new(move |rel| std::fs::read_to_string(base.join(rel)));
        Ok(Self {
            entries,
            source: ContentSource::Lazy(loader),
        })
    }

    /// Reads one file's content.
    ///
    /// # Errors
    /// Returns an error when the path is unknown to the set or the underlying
    /// read fails.
    pub fn read(&self, path: &str) -> io::Result<String> {
        if !self.entries.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{path} is not in the file set"),
            ));
        }
        match &self.source {
            ContentSource::Memory(map) => map.get(path).cloned().ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{path} has no content"))
            }),
            ContentSource::Lazy(loader) => loader(path),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn last_modified(&self, path: &str) -> Option<i64> {
        self.entries.get(path).copied()
    }

    /// All paths in the set, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(path, last_modified)` pairs, in sorted order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(p, m)| (p.as_str(), *m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the path set for resolver existence checks.
    pub fn index(&self) -> PathIndex {
        PathIndex {
            paths: self.entries.keys().cloned().collect(),
        }
    }
}

/// Sorted set of known paths; the resolver's view of "what files exist".
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    paths: BTreeSet<String>,
}

impl PathIndex {
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| normalize_path(&p.into()))
                .collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// True when some indexed file lives under `path/`, i.e. `path` denotes
    /// a directory.
    pub fn contains_dir(&self, path: &str) -> bool {
        if path.is_empty() {
            return !self.paths.is_empty();
        }
        let prefix = format!("{path}/");
        self.paths
            .range(prefix.clone()..)
            .next()
            .is_some_and(|p| p.starts_with(&prefix))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn in_node_modules(path: &Path) -> bool {
    path.components().any(|c| c.as_os_str() == "node_modules")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn in_memory_normalizes_paths() {
        let files = FileSet::in_memory([("./src//foo.ts", "export const x = 1;")]);
        assert!(files.contains("src/foo.ts"));
        assert_eq!(files.read("src/foo.ts").unwrap(), "export const x = 1;");
    }

    #[test]
    fn read_unknown_path_errors() {
        let files = FileSet::in_memory([("src/foo.ts", "")]);
        assert!(files.read("src/bar.ts").is_err());
    }

    #[test]
    fn lazy_loader_is_called_on_read() {
        let files = FileSet::with_loader(
            [("src/foo.ts", 42)],
            Box::new(|path| Ok(format!("// {path}"))),
        );
        assert_eq!(files.last_modified("src/foo.ts"), Some(42));
        assert_eq!(files.read("src/foo.ts").unwrap(), "// src/foo.ts");
    }

    #[test]
    fn from_dir_collects_relative_paths() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("foo.ts"), "export const x = 1;").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let files = FileSet::from_dir(dir.path()).unwrap();
        assert!(files.contains("src/foo.ts"));
        assert!(files.contains("package.json"));
        assert_eq!(files.read("src/foo.ts").unwrap(), "export const x = 1;");
    }

    #[test]
    fn from_dir_skips_node_modules() {
        let dir = tempdir().unwrap();
        let nm = dir.path().join("node_modules/react");
        fs::create_dir_all(&nm).unwrap();
        fs::write(nm.join("index.js"), "module.exports = {};").unwrap();
        fs::write(dir.path().join("main.ts"), "").unwrap();

        let files = FileSet::from_dir(dir.path()).unwrap();
        assert!(files.contains("main.ts"));
        assert!(!files.contains("node_modules/react/index.js"));
    }

    #[test]
    fn from_dir_respects_gitignore() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "dist/\n").unwrap();
        let dist = dir.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("bundle.js"), "").unwrap();
        fs::write(dir.path().join("main.ts"), "").unwrap();

        let files = FileSet::from_dir(dir.path()).unwrap();
        assert!(files.contains("main.ts"));
        assert!(!files.contains("dist/bundle.js"));
    }

    #[test]
    fn from_dir_missing_root_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(FileSet::from_dir(&missing).is_err());
    }

    #[test]
    fn index_contains_dir_detection() {
        let index = PathIndex::from_paths(["src/lib/index.ts", "src/foo.ts"]);
        assert!(index.contains_dir("src"));
        assert!(index.contains_dir("src/lib"));
        assert!(!index.contains_dir("src/lib/index.ts"));
        assert!(!index.contains_dir("sr"));
    }

    #[test]
    fn index_dir_prefix_is_component_aware() {
        // "src-extra" must not read as a directory named "src".
        let index = PathIndex::from_paths(["src-extra/foo.ts"]);
        assert!(!index.contains_dir("src"));
        assert!(index.contains_dir("src-extra"));
    }
}
