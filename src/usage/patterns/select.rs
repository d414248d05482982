//! SELECT pattern implementation

use sqlparser::ast::{SetExpr, Statement};

use crate::table::Operation;
use crate::usage::clauses::*;
use crate::usage::traits::*;

/// SELECT query pattern
pub struct SelectPattern;

impl UsagePattern for SelectPattern {
    fn id(&self) -> &'static str {
        "select"
    }

    fn matches(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Query(q) if matches!(q.body.as_ref(), SetExpr::Select(_)))
    }

    fn extract(&self, stmt: &Statement) -> Result<TableUsage, ExtractError> {
        let Statement::Query(query) = stmt else {
            return Err(ExtractError::new("Expected Query statement"));
        };

        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(ExtractError::new("Expected SELECT"));
        };

        let table = extract_first_table(&select.from)?;
        let mut usage = TableUsage::new(Operation::Select, table);
        for column in select.projection.iter().filter_map(select_item_column) {
            usage.push_column(column);
        }
        Ok(usage)
    }
}
