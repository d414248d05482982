//! INSERT pattern implementation

use sqlparser::ast::{Statement, TableObject};

use crate::table::Operation;
use crate::usage::clauses::*;
use crate::usage::traits::*;

/// INSERT query pattern
pub struct InsertPattern;

impl UsagePattern for InsertPattern {
    fn id(&self) -> &'static str {
        "insert"
    }

    fn matches(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Insert(_))
    }

    fn extract(&self, stmt: &Statement) -> Result<TableUsage, ExtractError> {
        let Statement::Insert(insert) = stmt else {
            return Err(ExtractError::new("Expected INSERT statement"));
        };

        let table = match &insert.table {
            TableObject::TableName(name) => object_name(name),
            _ => return Err(ExtractError::new("INSERT into a table function not supported")),
        };

        let mut usage = TableUsage::new(Operation::Insert, table);
        if insert.columns.is_empty() {
            return Ok(usage.without_columns());
        }
        for ident in &insert.columns {
            usage.push_column(ident.value.clone());
        }
        Ok(usage)
    }
}
