//! Host nodes and the query view bound to them.
//!
//! A host hands over one node at a time. Every recognized node shape knows
//! how to produce its text payload; from there detection is the same for all
//! of them:
//!
//! ```text
//! HostNode → text → probably_sql → parse → QueryView
//!                        │            │
//!                  NotApplicable   Failed
//! ```

use std::fmt;
use std::ops::Range;

use serde::Serialize;
use sqlparser::ast::Statement;
use uuid::Uuid;

use crate::detect::probably_sql;
use crate::parser::{self, ParseFailure, SqlDialect};
use crate::render::{self, ExpressionRewrite, RenderError, Rendered, common_affixes};
use crate::table::{Provenance, QueryTextRow, UsageRow};
use crate::usage::{self, TableUsage};

/// Opaque identity of a host node. Only ever compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A string literal in program source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub id: NodeId,
    /// Decoded value of the literal.
    pub value: String,
    /// The literal token as written, quotes and prefixes included.
    pub source: String,
}

/// A free-standing block of text, e.g. a whole `.sql` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainText {
    pub id: NodeId,
    pub text: String,
}

/// A scalar inside a structured document (YAML mapping value, sequence item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentScalar {
    pub id: NodeId,
    /// Mapping key the scalar sits under, if any.
    pub key: Option<String>,
    /// String payload; `None` for non-string scalars.
    pub value: Option<String>,
}

/// The closed set of host node shapes that may carry SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNode {
    StringLiteral(StringLiteral),
    PlainText(PlainText),
    DocumentScalar(DocumentScalar),
}

impl HostNode {
    pub fn string_literal(value: impl Into<String>, source: impl Into<String>) -> Self {
        HostNode::StringLiteral(StringLiteral {
            id: NodeId::random(),
            value: value.into(),
            source: source.into(),
        })
    }

    pub fn plain_text(text: impl Into<String>) -> Self {
        HostNode::PlainText(PlainText {
            id: NodeId::random(),
            text: text.into(),
        })
    }

    pub fn document_scalar(key: Option<String>, value: Option<String>) -> Self {
        HostNode::DocumentScalar(DocumentScalar {
            id: NodeId::random(),
            key,
            value,
        })
    }

    pub fn id(&self) -> NodeId {
        match self {
            HostNode::StringLiteral(lit) => lit.id,
            HostNode::PlainText(text) => text.id,
            HostNode::DocumentScalar(scalar) => scalar.id,
        }
    }

    /// The text payload a SQL query could hide in.
    pub fn text(&self) -> Option<&str> {
        match self {
            HostNode::StringLiteral(lit) => Some(&lit.value),
            HostNode::PlainText(text) => Some(&text.text),
            HostNode::DocumentScalar(scalar) => scalar.value.as_deref(),
        }
    }

    /// Copy of this node carrying `sql` as its payload. Identity is kept.
    pub fn with_text(&self, sql: &str) -> HostNode {
        match self {
            HostNode::StringLiteral(lit) => HostNode::StringLiteral(StringLiteral {
                id: lit.id,
                value: sql.to_string(),
                source: requote_literal(&lit.source, &lit.value, sql),
            }),
            HostNode::PlainText(text) => HostNode::PlainText(PlainText {
                id: text.id,
                text: sql.to_string(),
            }),
            HostNode::DocumentScalar(scalar) => HostNode::DocumentScalar(DocumentScalar {
                id: scalar.id,
                key: scalar.key.clone(),
                value: Some(sql.to_string()),
            }),
        }
    }
}

/// Rebuild a string literal token around a new value.
///
/// Raw strings (`r"…"`, `r#"…"#`) stay raw when the value cannot terminate
/// them early. An escaped `"…"` literal keeps its own escapes and line
/// continuations; only the part of `old` that changed is re-escaped.
/// Anything else becomes a freshly escaped `"…"` literal.
pub fn requote_literal(token: &str, old: &str, new: &str) -> String {
    let raw = token.strip_prefix('b').unwrap_or(token);
    if let Some(after_r) = raw.strip_prefix('r') {
        let hashes = after_r.chars().take_while(|c| *c == '#').count();
        let terminator = format!("\"{}", "#".repeat(hashes));
        if !new.contains(&terminator) {
            let prefix = &token[..token.len() - raw.len()];
            return format!(
                "{}r{}\"{}\"{}",
                prefix,
                "#".repeat(hashes),
                new,
                "#".repeat(hashes)
            );
        }
    }
    if let Some(spliced) = splice_escaped(token, old, new) {
        return spliced;
    }

    let mut quoted = String::with_capacity(new.len() + 2);
    quoted.push('"');
    escape_into(&mut quoted, new);
    quoted.push('"');
    quoted
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
}

/// One decoded char of an escaped literal body.
struct DecodedChar {
    /// Byte offset in the decoded value.
    at: usize,
    /// Bytes of the body that produced it.
    source: Range<usize>,
}

/// Replace the changed region of an escaped `"…"` token, leaving the body's
/// text on either side as written.
fn splice_escaped(token: &str, old: &str, new: &str) -> Option<String> {
    let body = token.strip_prefix('"')?.strip_suffix('"')?;
    let (decoded, chars) = decode_escaped(body)?;
    if decoded != old {
        return None;
    }
    let (prefix, suffix) = common_affixes(old, new);
    let tail_at = old.len() - suffix;
    let head = chars
        .iter()
        .find(|c| c.at >= prefix)
        .map_or(body.len(), |c| c.source.start);
    let tail = chars
        .iter()
        .rev()
        .find(|c| c.at < tail_at)
        .map_or(0, |c| c.source.end)
        .max(head);

    let mut out = String::with_capacity(token.len() + new.len());
    out.push('"');
    out.push_str(&body[..head]);
    escape_into(&mut out, &new[prefix..new.len() - suffix]);
    out.push_str(&body[tail..]);
    out.push('"');
    Some(out)
}

/// Decode a Rust string literal body, remembering where each char came from.
fn decode_escaped(body: &str) -> Option<(String, Vec<DecodedChar>)> {
    let mut decoded = String::with_capacity(body.len());
    let mut chars = Vec::new();
    let mut iter = body.char_indices().peekable();
    while let Some((start, ch)) = iter.next() {
        let value = match ch {
            '\\' => match iter.next()?.1 {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '0' => '\0',
                '\\' => '\\',
                '\'' => '\'',
                '"' => '"',
                'x' => {
                    let hi = iter.next()?.1.to_digit(16)?;
                    let lo = iter.next()?.1.to_digit(16)?;
                    char::from_u32(hi * 16 + lo).filter(|c| c.is_ascii())?
                }
                'u' => {
                    if iter.next()?.1 != '{' {
                        return None;
                    }
                    let mut code = 0u32;
                    loop {
                        match iter.next()?.1 {
                            '}' => break,
                            '_' => {}
                            digit => code = code.checked_mul(16)?.checked_add(digit.to_digit(16)?)?,
                        }
                    }
                    char::from_u32(code)?
                }
                // Line continuation: the newline and leading whitespace vanish.
                '\n' => {
                    while iter.peek().is_some_and(|(_, c)| matches!(c, ' ' | '\t' | '\n' | '\r')) {
                        iter.next();
                    }
                    continue;
                }
                _ => return None,
            },
            '\r' => return None,
            other => other,
        };
        let end = iter.peek().map_or(body.len(), |(i, _)| *i);
        chars.push(DecodedChar {
            at: decoded.len(),
            source: start..end,
        });
        decoded.push(value);
    }
    Some((decoded, chars))
}

/// Top-level kind of a parsed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Update,
    Delete,
    Insert,
    Other,
}

impl StatementKind {
    pub fn of(statement: &Statement) -> Self {
        match statement {
            Statement::Query(_) => StatementKind::Select,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
            Statement::Insert(_) => StatementKind::Insert,
            _ => StatementKind::Other,
        }
    }
}

/// The heuristic accepted a node's text but the parser did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionFailure {
    pub node: NodeId,
    pub failure: ParseFailure,
}

impl DetectionFailure {
    pub fn message(&self) -> &str {
        &self.failure.message
    }
}

/// Outcome of looking at one host node.
#[derive(Debug, Clone)]
pub enum Detection {
    /// The text does not look like SQL at all.
    NotApplicable,
    /// The text looked like SQL but did not parse.
    Failed(DetectionFailure),
    Query(QueryView),
}

impl Detection {
    pub fn into_view(self) -> Option<QueryView> {
        match self {
            Detection::Query(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Detection::Query(_))
    }
}

/// A detected, parsed SQL statement bound to the host node it came from.
///
/// Never built from text that fails to parse, and never changed afterwards:
/// rewrites produce new text.
#[derive(Debug, Clone)]
pub struct QueryView {
    node: NodeId,
    sql: String,
    statement: Statement,
    dialect: SqlDialect,
}

impl QueryView {
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// The query text exactly as it appeared in the host.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn kind(&self) -> StatementKind {
        StatementKind::of(&self.statement)
    }

    /// Table and columns the statement reads or writes.
    pub fn usage(&self) -> Option<TableUsage> {
        usage::extract(&self.statement)
    }

    /// One usage row per referenced column, stamped with `provenance`.
    pub fn usage_rows<'a>(
        &'a self,
        provenance: &'a Provenance,
    ) -> impl Iterator<Item = UsageRow> + 'a {
        self.usage()
            .into_iter()
            .flat_map(move |usage| usage.into_rows(provenance))
    }

    pub fn query_text_row(&self, source_path: Option<&str>) -> QueryTextRow {
        QueryTextRow {
            source_path: source_path.map(str::to_string),
            query: self.sql.clone(),
        }
    }

    /// Apply `rewrite` and return the new text, or the original text when
    /// nothing changed or the change could not be applied safely.
    pub fn render(&self, rewrite: &mut dyn ExpressionRewrite) -> String {
        render::render(self, rewrite)
    }

    /// Like [`QueryView::render`], without the fallback.
    pub fn try_render(&self, rewrite: &mut dyn ExpressionRewrite) -> Result<Rendered, RenderError> {
        render::try_render(self, rewrite)
    }
}

/// Detect SQL in a host node.
pub fn view_of(node: &HostNode, dialect: SqlDialect) -> Detection {
    view_of_text(node.id(), node.text(), dialect)
}

/// Detect SQL in `text` extracted from the node identified by `node`.
pub fn view_of_text(node: NodeId, text: Option<&str>, dialect: SqlDialect) -> Detection {
    let Some(sql) = text.filter(|t| probably_sql(Some(t))) else {
        return Detection::NotApplicable;
    };

    match parser::parse(sql, dialect) {
        Ok(statement) => Detection::Query(QueryView {
            node,
            sql: sql.to_string(),
            statement,
            dialect,
        }),
        Err(failure) => {
            tracing::debug!("Node {} looked like SQL but did not parse: {}", node, failure);
            Detection::Failed(DetectionFailure { node, failure })
        }
    }
}
