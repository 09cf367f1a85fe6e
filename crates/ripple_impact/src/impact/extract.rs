//! Module specifier extraction.
//!
//! Pulls the raw import specifiers out of one file's source text. Two
//! strategies behind a single entry point: a tree-sitter parse for extensions
//! with a registered grammar, and a regex scan for everything else or when
//! the parse fails. Extraction is purely syntactic; code is never evaluated.

use crate::impact::classify::SOURCE_EXTENSIONS;
use crate::normalize::extension;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;
use tree_sitter::{Parser, Query, QueryCursor, StreamingIterator};

/// Maximum number of specifiers to extract per file.
const MAX_SPECIFIERS_PER_FILE: usize = 500;

/// Syntactic shape a specifier was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    /// `import ... from './path'` or `import './path'`
    Import,
    /// `export ... from './path'`
    ReExport,
    /// `import('./path')`
    DynamicImport,
    /// `require('./path')`
    Require,
}

/// A raw specifier as written in source, before path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpecifier {
    pub specifier: String,
    pub kind: SpecifierKind,
}

/// Which strategy produced an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Structured,
    Fallback,
}

/// Result of extracting one file.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub specifiers: Vec<RawSpecifier>,
    pub strategy: Strategy,
    /// A grammar was registered but the parse failed, so the fallback ran.
    pub downgraded: bool,
    /// The per-file specifier cap was hit.
    pub truncated: bool,
}

/// Extracts the module specifiers a file references.
///
/// Strategy is selected by a capability check on the file extension: if a
/// grammar is registered, parse structurally; on parse failure, downgrade to
/// the regex fallback for this file only. Never fails.
pub fn extract(content: &str, path: &str) -> Extraction {
    let mut extraction = match grammar_for(path) {
        Some(language) => match extract_structured(content, path, &language) {
            Some(specifiers) => Extraction {
                specifiers,
                strategy: Strategy::Structured,
                downgraded: false,
                truncated: false,
            },
            None => Extraction {
                specifiers: extract_fallback(content),
                strategy: Strategy::Fallback,
                downgraded: true,
                truncated: false,
            },
        },
        None => Extraction {
            specifiers: extract_fallback(content),
            strategy: Strategy::Fallback,
            downgraded: false,
            truncated: false,
        },
    };

    if extraction.specifiers.len() > MAX_SPECIFIERS_PER_FILE {
        warn!(
            path,
            count = extraction.specifiers.len(),
            "specifier cap hit, truncating to {MAX_SPECIFIERS_PER_FILE}"
        );
        extraction.specifiers.truncate(MAX_SPECIFIERS_PER_FILE);
        extraction.truncated = true;
    }

    extraction
}

/// The registered grammar for a path, if any.
fn grammar_for(path: &str) -> Option<tree_sitter::Language> {
    let ext = extension(path);
    if !SOURCE_EXTENSIONS.contains(&ext) {
        return None;
    }
    match ext {
        "tsx" | "jsx" => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        _ => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
    }
}

/// Structured extraction. `None` means the parse failed and the caller
/// should downgrade to the fallback.
fn extract_structured(
    content: &str,
    path: &str,
    language: &tree_sitter::Language,
) -> Option<Vec<RawSpecifier>> {
    let mut parser = Parser::new();
    if parser.set_language(language).is_err() {
        warn!(path, "failed to set parser language");
        return None;
    }

    let tree = parser.parse(content, None)?;
    let root = tree.root_node();
    if root.has_error() {
        warn!(path, "syntax errors in file, downgrading to fallback scan");
        return None;
    }

    // Import declarations, re-export declarations, require() calls, and
    // dynamic import() expressions.
    let query_str = r#"
        (import_statement source: (string) @source)
        (export_statement source: (string) @source)
        (call_expression
            function: (identifier) @func (#eq? @func "require")
            arguments: (arguments (string) @source))
        (call_expression
            function: (import)
            arguments: (arguments (string) @source))
    "#;

    let Ok(query) = Query::new(language, query_str) else {
        warn!(path, "specifier query failed to compile");
        return None;
    };
    let source_index = query.capture_index_for_name("source")?;

    let mut specifiers = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, content.as_bytes());

    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index != source_index {
                continue;
            }
            if let Some(spec) = specifier_from_node(content, &capture.node) {
                specifiers.push(spec);
            }
        }
    }

    Some(specifiers)
}

fn specifier_from_node(content: &str, string_node: &tree_sitter::Node) -> Option<RawSpecifier> {
    let text = string_node.utf8_text(content.as_bytes()).ok()?;
    let specifier = text
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string();
    if specifier.is_empty() {
        return None;
    }

    let parent = string_node.parent()?;
    let kind = match parent.kind() {
        "import_statement" => SpecifierKind::Import,
        "export_statement" => SpecifierKind::ReExport,
        "arguments" => call_kind(&parent),
        _ => SpecifierKind::Import,
    };

    Some(RawSpecifier { specifier, kind })
}

/// Distinguishes `import(...)` from `require(...)` for a string found in a
/// call's argument list.
fn call_kind(arguments: &tree_sitter::Node) -> SpecifierKind {
    let call = arguments.parent();
    let function = call.and_then(|c| c.child_by_field_name("function"));
    match function.map(|f| f.kind()) {
        Some("import") => SpecifierKind::DynamicImport,
        _ => SpecifierKind::Require,
    }
}

#[allow(clippy::unwrap_used)] // callers pass literal patterns, verified by tests
fn literal_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static STATIC_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r#"(?m)^\s*import\s+(?:[^'"`;]+?\s+from\s+)?['"]([^'"\n]+)['"]"#)
});

static RE_EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r#"(?m)^\s*export\s+(?:\*|\{[^}]*\}|[^'"`;]+?)\s*from\s+['"]([^'"\n]+)['"]"#)
});

static DYNAMIC_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]"#));

static REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]"#));

/// Regex scan for the four specifier shapes.
///
/// Known gaps, accepted as a trade-off and pinned by tests: specifiers inside
/// block comments or template literals over-match, and computed specifiers
/// (`require(name)`) under-match. The structured strategy has neither gap.
fn extract_fallback(content: &str) -> Vec<RawSpecifier> {
    let mut specifiers = Vec::new();

    for (re, kind) in [
        (&STATIC_IMPORT_RE, SpecifierKind::Import),
        (&RE_EXPORT_RE, SpecifierKind::ReExport),
        (&DYNAMIC_IMPORT_RE, SpecifierKind::DynamicImport),
        (&REQUIRE_RE, SpecifierKind::Require),
    ] {
        for captures in re.captures_iter(content) {
            if let Some(m) = captures.get(1) {
                specifiers.push(RawSpecifier {
                    specifier: m.as_str().to_string(),
                    kind,
                });
            }
        }
    }

    specifiers
}
