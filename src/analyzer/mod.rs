//! Host adapters and the codebase scanner.
//!
//! Each supported file type has an adapter turning file contents into
//! [`HostNode`]s with their position in the file:
//! - Rust: every string literal, via `syn` (macro arguments included)
//! - SQL / text: the whole file is one node
//! - YAML: every scalar in every document

mod provenance;
pub mod rust_ast;
mod scanner;
pub mod text;
pub mod yaml;

use std::fs;
use std::ops::Range;
use std::path::Path;

use crate::error::{SqlSpotError, SqlSpotResult};
use crate::parser::SqlDialect;
use crate::query::{Detection, HostNode, view_of};
use crate::render::{ExpressionRewrite, Rendered};

pub use provenance::commit_hash;
pub use scanner::{CodebaseScanner, FileAnalysis, QueryMatch, ScanResult, SkippedCandidate};

/// A host node and where it sits in its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    pub node: HostNode,
    /// 1-based line the node starts on, when known.
    pub line: Option<usize>,
    /// Byte range of the node's source text, when known.
    pub range: Option<Range<usize>>,
}

/// Which adapter handles a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostLanguage {
    Rust,
    PlainText,
    Yaml,
}

impl HostLanguage {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Some(HostLanguage::Rust),
            "sql" | "txt" => Some(HostLanguage::PlainText),
            "yaml" | "yml" => Some(HostLanguage::Yaml),
            _ => None,
        }
    }

    pub fn for_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            HostLanguage::Rust => "rust",
            HostLanguage::PlainText => "text",
            HostLanguage::Yaml => "yaml",
        }
    }
}

/// Run the adapter for `language` over `content`.
pub fn extract_nodes(
    path: &Path,
    language: HostLanguage,
    content: &str,
) -> SqlSpotResult<Vec<SourceNode>> {
    match language {
        HostLanguage::Rust => rust_ast::string_literals(content)
            .map_err(|e| SqlSpotError::host_syntax(path, language.name(), e.to_string())),
        HostLanguage::PlainText => Ok(text::text_nodes(content)),
        HostLanguage::Yaml => yaml::document_scalars(content)
            .map_err(|e| SqlSpotError::host_syntax(path, language.name(), e.to_string())),
    }
}

/// Apply `rewrite` to every query detected in one file.
///
/// Returns the new file contents, or `None` when nothing changed. Only hosts
/// with byte positions for their nodes (Rust, SQL, text) can be rewritten.
pub fn rewrite_file(
    path: &Path,
    dialect: SqlDialect,
    rewrite: &mut dyn ExpressionRewrite,
) -> SqlSpotResult<Option<String>> {
    let language = HostLanguage::for_path(path).ok_or_else(|| SqlSpotError::Unsupported {
        operation: "rewrite",
        path: path.to_path_buf(),
    })?;
    if language == HostLanguage::Yaml {
        return Err(SqlSpotError::Unsupported {
            operation: "rewrite",
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| SqlSpotError::io(path, e))?;
    let nodes = extract_nodes(path, language, &content)?;

    let mut edits = Vec::new();
    for source in nodes {
        let Some(range) = source.range else { continue };
        let Detection::Query(view) = view_of(&source.node, dialect) else {
            continue;
        };
        match view.try_render(rewrite) {
            Ok(Rendered::Changed(sql)) => {
                let replacement = match source.node.with_text(&sql) {
                    HostNode::StringLiteral(lit) => lit.source,
                    HostNode::PlainText(text) => text.text,
                    HostNode::DocumentScalar(_) => continue,
                };
                edits.push((range, replacement));
            }
            Ok(Rendered::Unchanged) => {}
            Err(e) => tracing::warn!(
                "{}:{}: leaving query unchanged: {}",
                path.display(),
                source.line.unwrap_or(0),
                e
            ),
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }
    edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    let mut out = content;
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    Ok(Some(out))
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())].matches('\n').count() + 1
}

/// Byte offset of a 1-based line and 0-based char column.
pub(crate) fn offset_of(content: &str, line: usize, column: usize) -> Option<usize> {
    let line_start = if line == 1 {
        0
    } else {
        content.match_indices('\n').nth(line.checked_sub(2)?)?.0 + 1
    };
    let rest = &content[line_start..];
    rest.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(rest.len()))
        .nth(column)
        .map(|i| line_start + i)
}
