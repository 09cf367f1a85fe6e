//! File classification by path pattern.
//!
//! Assigns every file in the workspace one of four categories. Classification
//! is a pure function over the path string; it never touches the filesystem
//! and never fails (unknown files are `Source`).

use crate::normalize::{extension, file_name};

/// Source extensions the extractor and resolver understand, in resolution
/// priority order.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "mjs", "cts", "cjs"];

/// Test file name infixes, applied before a source extension.
pub const TEST_SUFFIXES: &[&str] = &[".test", ".spec"];

/// Directory components that mark everything below them as test code.
const TEST_DIR_COMPONENTS: &[&str] = &["__tests__", "test", "tests"];

/// Exact basenames of build/tooling configuration files.
const CONFIG_BASENAMES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lock",
    "bun.lockb",
    "jsconfig.json",
];

/// Extensions of non-code resources.
const ASSET_EXTENSIONS: &[&str] = &[
    "css", "scss", "sass", "less", "styl", "svg", "png", "jpg", "jpeg", "gif", "webp", "avif",
    "ico", "bmp", "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "webm", "pdf", "md", "mdx",
    "html", "htm", "txt", "csv", "json", "yaml", "yml", "toml", "xml",
];

/// Category assigned to a file at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Source,
    Test,
    Config,
    Asset,
}

impl FileType {
    /// Stable textual form used by the graph store.
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Source => "source",
            FileType::Test => "test",
            FileType::Config => "config",
            FileType::Asset => "asset",
        }
    }

    /// Parses the textual form; unknown values come back as `Source`, the
    /// same default the classifier uses for unknown files.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "test" => FileType::Test,
            "config" => FileType::Config,
            "asset" => FileType::Asset,
            _ => FileType::Source,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a repo-relative path.
///
/// Priority: test naming conventions and test directories win over config
/// basenames, which win over asset extensions. Everything else is `Source`.
pub fn classify(path: &str) -> FileType {
    if is_test_path(path) {
        return FileType::Test;
    }
    if is_config_file(path) {
        return FileType::Config;
    }
    if ASSET_EXTENSIONS.contains(&extension(path)) {
        return FileType::Asset;
    }
    FileType::Source
}

/// Checks the test/spec naming convention and conventional test directories.
pub fn is_test_path(path: &str) -> bool {
    let name = file_name(path);

    for suffix in TEST_SUFFIXES {
        for ext in SOURCE_EXTENSIONS {
            if name.ends_with(&format!("{suffix}.{ext}")) {
                return true;
            }
        }
    }

    path.split('/')
        .any(|component| TEST_DIR_COMPONENTS.contains(&component))
}

/// Checks whether a basename matches a known build/tooling config pattern.
pub fn is_config_file(path: &str) -> bool {
    let name = file_name(path);

    CONFIG_BASENAMES.contains(&name)
        || name.starts_with("tsconfig.")
        || name.starts_with(".babelrc")
        || name.starts_with(".eslintrc")
        || name.starts_with(".prettierrc")
        || name.contains(".config.")
}
