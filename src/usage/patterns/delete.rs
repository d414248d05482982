//! DELETE pattern implementation

use sqlparser::ast::{FromTable, Statement};

use crate::table::Operation;
use crate::usage::clauses::*;
use crate::usage::traits::*;

/// DELETE query pattern
pub struct DeletePattern;

impl UsagePattern for DeletePattern {
    fn id(&self) -> &'static str {
        "delete"
    }

    fn matches(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Delete(_))
    }

    fn extract(&self, stmt: &Statement) -> Result<TableUsage, ExtractError> {
        let Statement::Delete(delete) = stmt else {
            return Err(ExtractError::new("Expected DELETE statement"));
        };

        let tables = match &delete.from {
            FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
        };
        let table = extract_first_table(tables)?;

        // DELETE has no column list; the predicate is not usage.
        Ok(TableUsage::new(Operation::Delete, table).without_columns())
    }
}
