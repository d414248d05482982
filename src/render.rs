//! Change-tracking re-serialization.
//!
//! Pretty-printing a whole statement after changing one expression would
//! reformat every line of it. Instead the changed expressions are recorded
//! while the rewrite runs, and only their source text is replaced:
//!
//! ```text
//! rewrite → ChangeTracker → [span, before, after]* → splice into raw SQL → verify
//! ```
//!
//! Sqlparser spans do not always cover the whole printed expression (a call
//! loses its closing paren, `IS NULL` covers only its operand), so each span
//! is widened to the smallest run of tokens that parses back to the original
//! expression.
//!
//! A splice is only accepted if it parses back to the rewritten statement.
//! The last candidate is the printer's own rendering; when even that fails,
//! [`render`] returns the original text untouched.

use std::ops::{ControlFlow, Range};

use sqlparser::ast::{Expr, Spanned, Statement, Value, ValueWithSpan, VisitMut, VisitorMut};
use sqlparser::tokenizer::{Location, Span, Token, Tokenizer};
use thiserror::Error;

use crate::parser::{self, ParseFailure, SqlDialect, parse_expr};
use crate::query::QueryView;

/// Hook deciding which expression to replace, and with what.
pub trait ExpressionRewrite {
    /// Replacement for `expr`, or `None` to keep it.
    fn rewrite(&mut self, expr: &Expr) -> Option<Expr>;

    /// `true` when the rewrite can never change anything.
    fn is_noop(&self) -> bool {
        false
    }
}

impl<F> ExpressionRewrite for F
where
    F: FnMut(&Expr) -> Option<Expr>,
{
    fn rewrite(&mut self, expr: &Expr) -> Option<Expr> {
        self(expr)
    }
}

/// Requests no change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRewrite;

impl ExpressionRewrite for NoRewrite {
    fn rewrite(&mut self, _expr: &Expr) -> Option<Expr> {
        None
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Replace a string literal's value, keeping its quoting style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceLiteral {
    from: String,
    to: String,
}

impl ReplaceLiteral {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl ExpressionRewrite for ReplaceLiteral {
    fn rewrite(&mut self, expr: &Expr) -> Option<Expr> {
        let Expr::Value(ValueWithSpan { value, span }) = expr else {
            return None;
        };
        let value = match value {
            Value::SingleQuotedString(s) if *s == self.from => {
                Value::SingleQuotedString(self.to.clone())
            }
            Value::DoubleQuotedString(s) if *s == self.from => {
                Value::DoubleQuotedString(self.to.clone())
            }
            Value::EscapedStringLiteral(s) if *s == self.from => {
                Value::EscapedStringLiteral(self.to.clone())
            }
            _ => return None,
        };
        Some(Expr::Value(ValueWithSpan { value, span: *span }))
    }
}

/// Replace every expression that renders as `target` with `replacement`.
#[derive(Debug, Clone)]
pub struct ReplaceExpression {
    target: String,
    replacement: Expr,
}

impl ReplaceExpression {
    /// Both sides are parsed with `dialect`, so `target` matches however it
    /// is spaced and whatever the case of its keywords. Identifier case
    /// still matters.
    pub fn new(target: &str, replacement: &str, dialect: SqlDialect) -> Result<Self, ParseFailure> {
        Ok(Self {
            target: parse_expr(target, dialect)?.to_string(),
            replacement: parse_expr(replacement, dialect)?,
        })
    }
}

impl ExpressionRewrite for ReplaceExpression {
    fn rewrite(&mut self, expr: &Expr) -> Option<Expr> {
        (expr.to_string() == self.target).then(|| self.replacement.clone())
    }
}

/// One replaced expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedChange {
    /// Where the original expression sits in the raw SQL.
    pub span: Span,
    /// Original expression as the printer renders it.
    pub before: String,
    /// Replacement as the printer renders it.
    pub after: String,
}

/// Records replacements while a rewrite runs over one statement.
///
/// Single use: [`ChangeTracker::apply`] consumes it.
pub struct ChangeTracker<'r> {
    rewrite: &'r mut dyn ExpressionRewrite,
    /// Source span and original rendering of the expressions being visited,
    /// outermost first.
    open: Vec<(Span, String)>,
    changes: Vec<TrackedChange>,
}

impl<'r> ChangeTracker<'r> {
    pub fn new(rewrite: &'r mut dyn ExpressionRewrite) -> Self {
        Self {
            rewrite,
            open: Vec::new(),
            changes: Vec::new(),
        }
    }

    /// Run the rewrite over `statement` in place and return what changed.
    pub fn apply(mut self, statement: &mut Statement) -> Vec<TrackedChange> {
        let _ = statement.visit(&mut self);
        self.changes
    }
}

impl VisitorMut for ChangeTracker<'_> {
    type Break = ();

    // Taken before children are rewritten; replacements carry no spans.
    fn pre_visit_expr(&mut self, expr: &mut Expr) -> ControlFlow<Self::Break> {
        self.open.push((expr.span(), expr.to_string()));
        ControlFlow::Continue(())
    }

    fn post_visit_expr(&mut self, expr: &mut Expr) -> ControlFlow<Self::Break> {
        let (span, before) = self.open.pop().unwrap_or_else(|| (Span::empty(), expr.to_string()));
        let Some(replacement) = self.rewrite.rewrite(expr) else {
            return ControlFlow::Continue(());
        };
        let after = replacement.to_string();
        if expr.to_string() != after {
            // Children were visited first; an outer replacement swallows them.
            self.changes.retain(|c| !span_contains(span, c.span));
            self.changes.push(TrackedChange {
                span,
                before,
                after,
            });
            *expr = replacement;
        }
        ControlFlow::Continue(())
    }
}

/// Result of a render that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Nothing to change; the raw SQL stands.
    Unchanged,
    Changed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Expression has no usable source position: {0}")]
    UnmappedSpan(String),

    #[error("Rewritten expressions overlap")]
    OverlappingChanges,

    #[error("Rewritten SQL no longer parses: {0}")]
    Reparse(#[from] ParseFailure),

    #[error("Rewritten SQL does not match the rewritten statement")]
    Diverged,
}

/// Apply `rewrite` to the view, falling back to the raw SQL on failure.
pub fn render(view: &QueryView, rewrite: &mut dyn ExpressionRewrite) -> String {
    match try_render(view, rewrite) {
        Ok(Rendered::Changed(sql)) => sql,
        Ok(Rendered::Unchanged) => view.sql().to_string(),
        Err(e) => {
            tracing::warn!("Keeping original SQL of node {}: {}", view.node_id(), e);
            view.sql().to_string()
        }
    }
}

/// Apply `rewrite` to the view and splice the result into its raw SQL.
pub fn try_render(
    view: &QueryView,
    rewrite: &mut dyn ExpressionRewrite,
) -> Result<Rendered, RenderError> {
    if rewrite.is_noop() {
        return Ok(Rendered::Unchanged);
    }

    let mut statement = view.statement().clone();
    let changes = ChangeTracker::new(rewrite).apply(&mut statement);
    if changes.is_empty() {
        return Ok(Rendered::Unchanged);
    }

    let original = view.sql();
    let generated = statement.to_string();

    let mut last_error = RenderError::Diverged;
    let attempts = [
        splice_at_spans(original, &changes, view.dialect()),
        splice_statement(original, &view.statement().to_string(), &generated)
            .ok_or(RenderError::Diverged),
        Ok(splice_rendered(original, &generated)),
    ];
    for attempt in attempts {
        match attempt.and_then(|sql| verify(sql, &generated, view.dialect())) {
            Ok(sql) => return Ok(Rendered::Changed(sql)),
            Err(e) => {
                tracing::debug!("Splice rejected for node {}: {}", view.node_id(), e);
                last_error = e;
            }
        }
    }
    Err(last_error)
}

/// Accept `candidate` only if it parses back to the rewritten statement.
fn verify(candidate: String, generated: &str, dialect: SqlDialect) -> Result<String, RenderError> {
    let reparsed = parser::parse(&candidate, dialect)?;
    if reparsed.to_string() == generated {
        Ok(candidate)
    } else {
        Err(RenderError::Diverged)
    }
}

/// Replace each changed expression inside its own source span.
fn splice_at_spans(
    original: &str,
    changes: &[TrackedChange],
    dialect: SqlDialect,
) -> Result<String, RenderError> {
    let tokens = token_ranges(original, dialect).unwrap_or_default();
    let mut located = changes
        .iter()
        .map(|change| {
            let anchor = byte_range(original, change.span)?;
            let range = widen_to_expression(original, &tokens, &anchor, &change.before, dialect)
                .unwrap_or(anchor);
            Ok((range, change))
        })
        .collect::<Result<Vec<_>, RenderError>>()?;
    located.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));

    let mut out = original.to_string();
    let mut limit = original.len();
    for (range, change) in located {
        if range.end > limit {
            return Err(RenderError::OverlappingChanges);
        }
        let fragment = &original[range.clone()];
        let replaced = splice_three_way(fragment, &change.before, &change.after)
            .unwrap_or_else(|| change.after.clone());
        out.replace_range(range.clone(), &replaced);
        limit = range.start;
    }
    Ok(out)
}

/// Whole-statement splice: find what changed between the printer's rendering
/// of the original and of the rewritten statement, and carry only that region
/// over to the raw SQL.
fn splice_statement(original: &str, baseline: &str, generated: &str) -> Option<String> {
    splice_three_way(original, baseline, generated)
}

/// Keep the raw SQL's common head and tail around the printer's rendering
/// of the rewritten statement.
fn splice_rendered(original: &str, generated: &str) -> String {
    let (prefix, suffix) = common_affixes(original, generated);
    splice(original, generated, prefix, suffix)
}

/// Most tokens a span is widened by on the left (`NOT`, `CAST (`, `(`).
const WIDEN_BEFORE: usize = 4;
/// Most tokens a span is widened by on the right (`IS NOT NULL`, `IN (…)`).
const WIDEN_AFTER: usize = 256;

/// Byte ranges of the non-whitespace tokens of `sql`.
fn token_ranges(sql: &str, dialect: SqlDialect) -> Option<Vec<(Range<usize>, Token)>> {
    let dialect = dialect.dialect();
    let tokens = Tokenizer::new(dialect.as_ref(), sql)
        .tokenize_with_location()
        .ok()?;
    tokens
        .into_iter()
        .filter(|t| !matches!(t.token, Token::Whitespace(_) | Token::EOF))
        .map(|t| Some((byte_offset(sql, t.span.start)?..byte_offset(sql, t.span.end)?, t.token)))
        .collect()
}

/// Smallest run of whole tokens around `anchor` whose text parses back to
/// `before`.
fn widen_to_expression(
    original: &str,
    tokens: &[(Range<usize>, Token)],
    anchor: &Range<usize>,
    before: &str,
    dialect: SqlDialect,
) -> Option<Range<usize>> {
    let first = tokens.iter().position(|(r, _)| r.end > anchor.start)?;
    let last = tokens.iter().rposition(|(r, _)| r.start < anchor.end)?;
    if last < first {
        return None;
    }
    let end_limit = tokens.len().min(last + WIDEN_AFTER + 1);
    for end in last..end_limit {
        for start in (first.saturating_sub(WIDEN_BEFORE)..=first).rev() {
            let run = &tokens[start..=end];
            if !parens_balanced(run) {
                continue;
            }
            let range = run[0].0.start..run[run.len() - 1].0.end;
            if parse_expr(&original[range.clone()], dialect).is_ok_and(|e| e.to_string() == before) {
                return Some(range);
            }
        }
    }
    None
}

fn parens_balanced(run: &[(Range<usize>, Token)]) -> bool {
    let mut depth = 0i32;
    for (_, token) in run {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// `source` is how `before` is actually written. Replace the region where
/// `before` and `after` differ, keeping the source's own text on either side.
fn splice_three_way(source: &str, before: &str, after: &str) -> Option<String> {
    if source == before {
        return Some(after.to_string());
    }
    let (prefix, suffix) = common_affixes(before, after);
    let head = &before[..prefix];
    let tail = &before[before.len() - suffix..];
    if prefix + suffix > source.len() || !source.starts_with(head) || !source.ends_with(tail) {
        return None;
    }
    Some(splice(source, after, prefix, suffix))
}

/// `original[..prefix] + generated[prefix..len - suffix] + original[len - suffix..]`
fn splice(original: &str, generated: &str, prefix: usize, suffix: usize) -> String {
    let mut out = String::with_capacity(generated.len().max(original.len()));
    out.push_str(&original[..prefix]);
    out.push_str(&generated[prefix..generated.len() - suffix]);
    out.push_str(&original[original.len() - suffix..]);
    out
}

/// Longest common prefix and, of what remains, longest common suffix, in bytes.
pub(crate) fn common_affixes(a: &str, b: &str) -> (usize, usize) {
    let prefix: usize = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum();
    let suffix: usize = a[prefix..]
        .chars()
        .rev()
        .zip(b[prefix..].chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum();
    (prefix, suffix)
}

fn span_contains(outer: Span, inner: Span) -> bool {
    let key = |l: Location| (l.line, l.column);
    inner != Span::empty() && key(outer.start) <= key(inner.start) && key(inner.end) <= key(outer.end)
}

/// Byte range of a tokenizer span (1-based lines, 1-based char columns).
fn byte_range(text: &str, span: Span) -> Result<Range<usize>, RenderError> {
    let start = byte_offset(text, span.start);
    let end = byte_offset(text, span.end);
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(start..end),
        _ => Err(RenderError::UnmappedSpan(format!("{:?}", span))),
    }
}

fn byte_offset(text: &str, location: Location) -> Option<usize> {
    if location.line == 0 || location.column == 0 {
        return None;
    }
    let (mut line, mut column) = (1u64, 1u64);
    for (offset, ch) in text.char_indices() {
        if line == location.line && column == location.column {
            return Some(offset);
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line == location.line && column == location.column).then_some(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{HostNode, view_of};
    use pretty_assertions::assert_eq;
    use sqlparser::ast::Ident;

    fn view(sql: &str) -> QueryView {
        view_of(&HostNode::plain_text(sql), SqlDialect::PostgreSql)
            .into_view()
            .unwrap()
    }

    #[test]
    fn test_common_affixes_do_not_overlap() {
        assert_eq!(common_affixes("'CANCELED'", "'CANCELLED'"), (7, 3));
        assert_eq!(common_affixes("aaa", "aaaa"), (3, 0));
        assert_eq!(common_affixes("same", "same"), (4, 0));
    }

    #[test]
    fn test_byte_offset_counts_chars_per_line() {
        let text = "ab\nçd\n";
        assert_eq!(byte_offset(text, Location { line: 2, column: 2 }), Some(5));
        assert_eq!(byte_offset(text, Location { line: 3, column: 1 }), Some(text.len()));
        assert_eq!(byte_offset(text, Location { line: 0, column: 0 }), None);
    }

    #[test]
    fn test_no_rewrite_short_circuits() {
        let sql = "select  *\n  from users\n";
        let view = view(sql);
        assert_eq!(view.try_render(&mut NoRewrite), Ok(Rendered::Unchanged));
        assert_eq!(view.render(&mut NoRewrite), sql);
    }

    #[test]
    fn test_rewrite_matching_nothing_is_unchanged() {
        let view = view("SELECT a FROM t WHERE b = 'x'");
        let mut rewrite = ReplaceLiteral::new("nope", "still nope");
        assert_eq!(view.try_render(&mut rewrite), Ok(Rendered::Unchanged));
    }

    #[test]
    fn test_literal_replaced_in_place() {
        let sql = "select id\n  from users\n where status = 'active'\n   and role = 'admin'\n";
        let view = view(sql);
        let rendered = view.render(&mut ReplaceLiteral::new("active", "enabled"));
        assert_eq!(
            rendered,
            "select id\n  from users\n where status = 'enabled'\n   and role = 'admin'\n"
        );
    }

    #[test]
    fn test_formatting_inside_untouched_functions_kept() {
        let sql = "SELECT lower( email ) FROM users WHERE name = 'bob'";
        let rendered = view(sql).render(&mut ReplaceLiteral::new("bob", "alice"));
        assert_eq!(rendered, "SELECT lower( email ) FROM users WHERE name = 'alice'");
    }

    #[test]
    fn test_replace_expression_by_text() {
        let sql = "UPDATE jobs\n   SET state = 'A'\n WHERE id = 1\n";
        let mut rewrite = ReplaceExpression::new("id = 1", "id = 2", SqlDialect::PostgreSql).unwrap();
        let rendered = view(sql).render(&mut rewrite);
        assert_eq!(rendered, "UPDATE jobs\n   SET state = 'A'\n WHERE id = 2\n");
    }

    #[test]
    fn test_closure_rewrite_renames_identifier() {
        let sql = "SELECT name\nFROM people\nWHERE nick = 'x'";
        let mut rename = |expr: &Expr| match expr {
            Expr::Identifier(ident) if ident.value == "nick" => {
                Some(Expr::Identifier(Ident::new("nickname")))
            }
            _ => None,
        };
        let rendered = view(sql).render(&mut rename);
        assert_eq!(rendered, "SELECT name\nFROM people\nWHERE nickname = 'x'");
    }

    #[test]
    fn test_unprintable_rewrite_falls_back_to_original() {
        let sql = "SELECT a\nFROM t";
        let view = view(sql);
        let mut broken = |expr: &Expr| match expr {
            Expr::Identifier(ident) if ident.value == "a" => {
                Some(Expr::Identifier(Ident::new("a)b")))
            }
            _ => None,
        };
        assert!(view.try_render(&mut broken).is_err());
        assert_eq!(view.render(&mut broken), sql);
    }

    #[test]
    fn test_function_call_rewrite_keeps_layout() {
        let sql = "SELECT lower(email)\nFROM users\nWHERE state IS NULL\n";
        let mut rewrite =
            ReplaceExpression::new("lower(email)", "upper(email)", SqlDialect::PostgreSql).unwrap();
        assert_eq!(
            view(sql).try_render(&mut rewrite),
            Ok(Rendered::Changed(
                "SELECT upper(email)\nFROM users\nWHERE state IS NULL\n".to_string()
            ))
        );
    }

    #[test]
    fn test_is_null_rewrite_in_lowercase_sql() {
        let sql = "select id\n  from users\n where state is null\n";
        let mut rewrite =
            ReplaceExpression::new("state IS NULL", "state = 'A'", SqlDialect::PostgreSql).unwrap();
        assert_eq!(
            view(sql).render(&mut rewrite),
            "select id\n  from users\n where state = 'A'\n"
        );
    }

    #[test]
    fn test_spans_widened_to_whole_expression() {
        let cases = [
            ("select a from t where not b", "NOT b", "b IS NULL", "select a from t where b IS NULL"),
            ("select (a + 1) * 2 from t", "(a + 1)", "(a + 2)", "select (a + 2) * 2 from t"),
            (
                "select a from t where x in (1, 2)",
                "x IN (1, 2)",
                "x IN (1, 2, 3)",
                "select a from t where x IN (1, 2, 3)",
            ),
            (
                "select cast(a as int)\n  from t",
                "CAST(a AS INT)",
                "a",
                "select a\n  from t",
            ),
        ];
        for (sql, target, replacement, expected) in cases {
            let mut rewrite =
                ReplaceExpression::new(target, replacement, SqlDialect::PostgreSql).unwrap();
            assert_eq!(view(sql).render(&mut rewrite), expected, "rewriting {}", target);
        }
    }

    #[test]
    fn test_keyword_case_does_not_matter_to_target() {
        let sql = "SELECT a FROM t WHERE a IS NULL";
        let mut rewrite = ReplaceExpression::new("a is null", "a = 0", SqlDialect::PostgreSql).unwrap();
        assert_eq!(view(sql).render(&mut rewrite), "SELECT a FROM t WHERE a = 0");

        let mut rewrite = ReplaceExpression::new("A IS NULL", "a = 0", SqlDialect::PostgreSql).unwrap();
        assert_eq!(view(sql).try_render(&mut rewrite), Ok(Rendered::Unchanged));
    }

    #[test]
    fn test_widening_stops_at_smallest_match() {
        let sql = "select f(a) from t";
        let tokens = token_ranges(sql, SqlDialect::PostgreSql).unwrap();
        // `f(a` as a call span that lost its closing paren.
        let widened = widen_to_expression(sql, &tokens, &(7..10), "f(a)", SqlDialect::PostgreSql);
        assert_eq!(widened, Some(7..11));
        assert_eq!(widen_to_expression(sql, &tokens, &(7..10), "g(a)", SqlDialect::PostgreSql), None);
    }

    #[test]
    fn test_rendered_statement_is_last_resort() {
        assert_eq!(
            splice_rendered("SELECT a\nFROM t WHERE b = 1", "SELECT a FROM t WHERE b = 2"),
            "SELECT a FROM t WHERE b = 2"
        );
    }

    #[test]
    fn test_three_way_splice() {
        assert_eq!(
            splice_three_way("'x'", "'x'", "'y'"),
            Some("'y'".to_string())
        );
        // Source edges that differ from the printer's output cannot be mapped.
        assert_eq!(splice_three_way("f( a ,b)", "f(a, b)", "f(a, c)"), None);
        assert_eq!(splice_three_way("x  =  'a'", "x = 'a'", "x = 'b'"), None);
    }

    #[test]
    fn test_outer_change_swallows_inner() {
        let mut statement = crate::parser::parse("SELECT a + 1 FROM t", SqlDialect::PostgreSql).unwrap();
        let mut rewrite = |expr: &Expr| match expr {
            Expr::Identifier(_) => Some(Expr::Identifier(Ident::new("b"))),
            Expr::BinaryOp { .. } => Some(Expr::Identifier(Ident::new("c"))),
            _ => None,
        };
        let changes = ChangeTracker::new(&mut rewrite).apply(&mut statement);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].before, "a + 1");
        assert_eq!(changes[0].after, "c");
        assert_eq!(statement.to_string(), "SELECT c FROM t");
    }
}
