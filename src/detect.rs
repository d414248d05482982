//! Cheap pre-check that a piece of text is worth handing to the SQL parser.
//!
//! The filter is deliberately loose: it only has to keep the parser away from
//! the bulk of ordinary strings. Anything it lets through that is not SQL is
//! rejected by [`crate::parser::parse`].

use std::sync::LazyLock;

use regex::Regex;

static SIMPLE_SQL_HEURISTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SELECT|UPDATE|DELETE|INSERT").expect("heuristic pattern is a valid regex")
});

/// Returns `true` when `text` mentions any DML keyword, in any case.
///
/// `None` and empty input are never SQL.
pub fn probably_sql(text: Option<&str>) -> bool {
    match text {
        Some(text) if !text.is_empty() => SIMPLE_SQL_HEURISTIC.is_match(text),
        _ => false,
    }
}
