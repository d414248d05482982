//! Thin adapter over `sqlparser`.
//!
//! Turns a candidate string into exactly one [`Statement`], or a
//! [`ParseFailure`] carrying the grammar's diagnostic. No heuristics live
//! here; callers run [`crate::detect::probably_sql`] first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlparser::ast::{Expr, Statement};
use sqlparser::dialect::{Dialect, GenericDialect, dialect_from_str};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;
use thiserror::Error;

/// The grammar parser rejected the text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse SQL: {message}")]
pub struct ParseFailure {
    pub message: String,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// SQL dialects the parser can be configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    Generic,
    #[default]
    PostgreSql,
    MySql,
    Sqlite,
    MsSql,
    Snowflake,
    BigQuery,
    Ansi,
}

impl SqlDialect {
    pub const ALL: [SqlDialect; 8] = [
        SqlDialect::Generic,
        SqlDialect::PostgreSql,
        SqlDialect::MySql,
        SqlDialect::Sqlite,
        SqlDialect::MsSql,
        SqlDialect::Snowflake,
        SqlDialect::BigQuery,
        SqlDialect::Ansi,
    ];

    /// Name as understood by `sqlparser::dialect::dialect_from_str`.
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::Generic => "generic",
            SqlDialect::PostgreSql => "postgresql",
            SqlDialect::MySql => "mysql",
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::MsSql => "mssql",
            SqlDialect::Snowflake => "snowflake",
            SqlDialect::BigQuery => "bigquery",
            SqlDialect::Ansi => "ansi",
        }
    }

    /// Build the `sqlparser` dialect.
    pub fn dialect(&self) -> Box<dyn Dialect> {
        dialect_from_str(self.name()).unwrap_or_else(|| Box::new(GenericDialect {}))
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let alias = match lower.as_str() {
            "postgres" | "pg" => "postgresql",
            "sqlserver" | "tsql" => "mssql",
            other => other,
        };
        SqlDialect::ALL
            .into_iter()
            .find(|d| d.name() == alias)
            .ok_or_else(|| format!("Unknown SQL dialect: '{}'", s))
    }
}

/// Parse `sql` into a single statement.
///
/// Empty input and input holding more than one statement are failures: a
/// query view always stands for exactly one statement.
pub fn parse(sql: &str, dialect: SqlDialect) -> Result<Statement, ParseFailure> {
    let dialect = dialect.dialect();
    let mut statements =
        Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| ParseFailure::new(e.to_string()))?;

    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(ParseFailure::new(format!(
            "expected a single SQL statement, found {}",
            n
        ))),
    }
}

/// Parse a standalone SQL expression, rejecting trailing input.
pub fn parse_expr(sql: &str, dialect: SqlDialect) -> Result<Expr, ParseFailure> {
    let dialect = dialect.dialect();
    let mut parser = Parser::new(dialect.as_ref())
        .try_with_sql(sql)
        .map_err(|e| ParseFailure::new(e.to_string()))?;
    let expr = parser
        .parse_expr()
        .map_err(|e| ParseFailure::new(e.to_string()))?;

    let next = parser.peek_token();
    if next.token != Token::EOF {
        return Err(ParseFailure::new(format!(
            "unexpected trailing input after expression: {}",
            next.token
        )));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_statement() {
        let stmt = parse("SELECT id FROM users", SqlDialect::PostgreSql).unwrap();
        assert!(matches!(stmt, Statement::Query(_)));
    }

    #[test]
    fn test_parse_failure_carries_diagnostic() {
        let err = parse(
            "This will be SELECTed by the heuristic but not parse as SQL",
            SqlDialect::PostgreSql,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse SQL: "));
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = parse("SELECT 1; SELECT 2", SqlDialect::Generic).unwrap_err();
        assert_eq!(err.message, "expected a single SQL statement, found 2");
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = parse("   ", SqlDialect::Generic).unwrap_err();
        assert_eq!(err.message, "expected a single SQL statement, found 0");
    }

    #[test]
    fn test_parse_expr_rejects_trailing_tokens() {
        assert!(parse_expr("'CANCELLED'", SqlDialect::PostgreSql).is_ok());
        assert!(parse_expr("a = 1 b", SqlDialect::PostgreSql).is_err());
    }

    #[test]
    fn test_dialect_names_round_trip() {
        for dialect in SqlDialect::ALL {
            assert_eq!(dialect.name().parse::<SqlDialect>(), Ok(dialect));
        }
        assert_eq!("Postgres".parse::<SqlDialect>(), Ok(SqlDialect::PostgreSql));
        assert!("oracle9".parse::<SqlDialect>().is_err());
    }
}
