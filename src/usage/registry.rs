//! Pattern registry for usage extraction

use std::sync::LazyLock;

use sqlparser::ast::Statement;

use super::patterns::*;
use super::traits::*;

static DEFAULT_REGISTRY: LazyLock<UsageRegistry> = LazyLock::new(UsageRegistry::new);

/// Registry of usage patterns
pub struct UsageRegistry {
    patterns: Vec<Box<dyn UsagePattern>>,
}

impl Default for UsageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageRegistry {
    /// Create a new registry with the SELECT/UPDATE/DELETE/INSERT patterns
    pub fn new() -> Self {
        let mut registry = Self {
            patterns: Vec::new(),
        };

        registry.register(Box::new(SelectPattern));
        registry.register(Box::new(UpdatePattern));
        registry.register(Box::new(DeletePattern));
        registry.register(Box::new(InsertPattern));

        registry
    }

    /// Register a new pattern
    pub fn register(&mut self, pattern: Box<dyn UsagePattern>) {
        self.patterns.push(pattern);
        // Sort by priority (descending)
        self.patterns.sort_by_key(|p| std::cmp::Reverse(p.priority()));
    }

    /// Find matching pattern for a statement
    pub fn find_pattern(&self, stmt: &Statement) -> Option<&dyn UsagePattern> {
        self.patterns
            .iter()
            .find(|p| p.matches(stmt))
            .map(|p| p.as_ref())
    }

    /// Usage of `stmt`, or `None` when no pattern can read it.
    pub fn extract(&self, stmt: &Statement) -> Option<TableUsage> {
        let pattern = self.find_pattern(stmt)?;
        match pattern.extract(stmt) {
            Ok(usage) => Some(usage),
            Err(e) => {
                tracing::debug!("Pattern '{}' could not read statement: {}", pattern.id(), e);
                None
            }
        }
    }
}

/// Extract usage with the default patterns.
pub fn extract(stmt: &Statement) -> Option<TableUsage> {
    DEFAULT_REGISTRY.extract(stmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{SqlDialect, parse};
    use crate::table::Operation;

    #[test]
    fn test_registry_dispatches_by_statement_kind() {
        let registry = UsageRegistry::new();
        let cases = [
            ("SELECT a FROM t", "select"),
            ("UPDATE t SET a = 1", "update"),
            ("DELETE FROM t", "delete"),
            ("INSERT INTO t (a) VALUES (1)", "insert"),
        ];
        for (sql, id) in cases {
            let stmt = parse(sql, SqlDialect::PostgreSql).unwrap();
            assert_eq!(registry.find_pattern(&stmt).map(|p| p.id()), Some(id), "{sql}");
        }
    }

    #[test]
    fn test_other_statements_yield_nothing() {
        let stmt = parse("CREATE TABLE t (a int)", SqlDialect::PostgreSql).unwrap();
        assert!(extract(&stmt).is_none());
    }

    #[test]
    fn test_extract_uses_default_registry() {
        let stmt = parse("UPDATE jobs SET state = 'DONE'", SqlDialect::PostgreSql).unwrap();
        let usage = extract(&stmt).unwrap();
        assert_eq!(usage.operation, Operation::Update);
        assert_eq!(usage.table, "jobs");
    }
}
