//! Specifier-to-path resolution.
//!
//! Maps a raw specifier to a concrete in-repo file, by membership in the
//! workspace path index. Anything that cannot be pinned to a file inside the
//! repo root (bare package names, aliases we do not understand, typos) is
//! not an error; it simply produces no edge.

use crate::fileset::PathIndex;
use crate::impact::classify::SOURCE_EXTENSIONS;
use crate::normalize::{join_relative, normalize_path, parent_dir};

/// Knobs for candidate generation.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Extensions appended to extensionless candidates, in priority order
    /// (leading dot included).
    pub extensions: Vec<String>,
    /// Index file stems tried when a candidate denotes a directory.
    pub index_names: Vec<String>,
    /// Alias prefixes rewritten to repo-root-relative bases, e.g.
    /// `("@/", "src/")`.
    pub root_aliases: Vec<(String, String)>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            extensions: SOURCE_EXTENSIONS.iter().map(|e| format!(".{e}")).collect(),
            index_names: vec!["index".to_string()],
            root_aliases: vec![("@/".to_string(), "src/".to_string())],
        }
    }
}

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Resolved to an in-repo file.
    Resolved(String),
    /// An external package reference; never an edge.
    External,
    /// Looked like an in-repo reference but no candidate file exists.
    NotFound,
}

impl Resolution {
    /// The resolved path, if any.
    pub fn into_path(self) -> Option<String> {
        match self {
            Resolution::Resolved(path) => Some(path),
            Resolution::External | Resolution::NotFound => None,
        }
    }
}

/// Resolves specifiers against a fixed path index.
pub struct PathResolver<'a> {
    index: &'a PathIndex,
    options: ResolverOptions,
}

impl<'a> PathResolver<'a> {
    pub fn new(index: &'a PathIndex) -> Self {
        Self::with_options(index, ResolverOptions::default())
    }

    pub fn with_options(index: &'a PathIndex, options: ResolverOptions) -> Self {
        Self { index, options }
    }

    /// Resolves `specifier` as written in `from_file`.
    ///
    /// Candidate order: the literal path, the path with each configured
    /// extension appended, then, if the path denotes a directory, an index
    /// file with each extension. First existing candidate wins.
    pub fn resolve(&self, specifier: &str, from_file: &str) -> Resolution {
        let Some(base) = self.candidate_base(specifier, from_file) else {
            return Resolution::External;
        };

        if base.is_empty() {
            return Resolution::NotFound;
        }

        if self.index.contains(&base) {
            return Resolution::Resolved(base);
        }

        for ext in &self.options.extensions {
            let candidate = format!("{base}{ext}");
            if self.index.contains(&candidate) {
                return Resolution::Resolved(candidate);
            }
        }

        if self.index.contains_dir(&base) {
            for stem in &self.options.index_names {
                for ext in &self.options.extensions {
                    let candidate = format!("{base}/{stem}{ext}");
                    if self.index.contains(&candidate) {
                        return Resolution::Resolved(candidate);
                    }
                }
            }
        }

        Resolution::NotFound
    }

    /// The repo-relative base path a specifier points at, or `None` for
    /// external package references. A relative specifier that escapes the
    /// repo root is treated as external.
    fn candidate_base(&self, specifier: &str, from_file: &str) -> Option<String> {
        if specifier.starts_with('.') {
            return join_relative(parent_dir(from_file), specifier);
        }
        if specifier.starts_with('/') {
            return Some(normalize_path(specifier));
        }
        for (prefix, target) in &self.options.root_aliases {
            if let Some(rest) = specifier.strip_prefix(prefix.as_str()) {
                return Some(normalize_path(&format!("{target}{rest}")));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(paths: &[&str]) -> PathIndex {
        PathIndex::from_paths(paths.iter().copied())
    }

    #[test]
    fn resolves_literal_path() {
        let idx = index(&["src/foo.ts", "src/bar.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("./foo.ts", "src/bar.ts"),
            Resolution::Resolved("src/foo.ts".into())
        );
    }

    #[test]
    fn resolves_with_extension_priority() {
        // .ts is tried before .js.
        let idx = index(&["src/foo.ts", "src/foo.js"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("./foo", "src/main.ts"),
            Resolution::Resolved("src/foo.ts".into())
        );
    }

    #[test]
    fn resolves_parent_relative() {
        let idx = index(&["src/util.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("../util", "src/lib/deep.ts"),
            Resolution::Resolved("src/util.ts".into())
        );
    }

    #[test]
    fn resolves_directory_index() {
        let idx = index(&["src/lib/index.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("./lib", "src/main.ts"),
            Resolution::Resolved("src/lib/index.ts".into())
        );
    }

    #[test]
    fn literal_file_wins_over_directory_index() {
        let idx = index(&["src/lib.ts", "src/lib/index.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("./lib", "src/main.ts"),
            Resolution::Resolved("src/lib.ts".into())
        );
    }

    #[test]
    fn bare_specifier_is_external() {
        let idx = index(&["src/main.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(resolver.resolve("react", "src/main.ts"), Resolution::External);
        assert_eq!(
            resolver.resolve("lodash/merge", "src/main.ts"),
            Resolution::External
        );
    }

    #[test]
    fn missing_relative_is_not_found() {
        let idx = index(&["src/main.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("./missing", "src/main.ts"),
            Resolution::NotFound
        );
    }

    #[test]
    fn escape_above_repo_root_is_external() {
        let idx = index(&["src/main.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("../../../etc/passwd", "src/main.ts"),
            Resolution::External
        );
    }

    #[test]
    fn repo_root_slash_specifier_resolves() {
        let idx = index(&["src/foo.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("/src/foo", "apps/web/main.ts"),
            Resolution::Resolved("src/foo.ts".into())
        );
    }

    #[test]
    fn root_alias_resolves_into_src() {
        let idx = index(&["src/lib/api.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("@/lib/api", "apps/web/main.ts"),
            Resolution::Resolved("src/lib/api.ts".into())
        );
    }

    #[test]
    fn self_import_resolves_to_self() {
        let idx = index(&["src/loop.ts"]);
        let resolver = PathResolver::new(&idx);
        assert_eq!(
            resolver.resolve("./loop", "src/loop.ts"),
            Resolution::Resolved("src/loop.ts".into())
        );
    }

    #[test]
    fn into_path_maps_outcomes() {
        assert_eq!(
            Resolution::Resolved("a.ts".into()).into_path(),
            Some("a.ts".into())
        );
        assert_eq!(Resolution::External.into_path(), None);
        assert_eq!(Resolution::NotFound.into_path(), None);
    }
}
