//! UPDATE pattern implementation

use sqlparser::ast::Statement;

use crate::table::Operation;
use crate::usage::clauses::*;
use crate::usage::traits::*;

/// UPDATE query pattern
pub struct UpdatePattern;

impl UsagePattern for UpdatePattern {
    fn id(&self) -> &'static str {
        "update"
    }

    fn matches(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Update(_))
    }

    fn extract(&self, stmt: &Statement) -> Result<TableUsage, ExtractError> {
        let Statement::Update(update) = stmt else {
            return Err(ExtractError::new("Expected UPDATE statement"));
        };

        let table = extract_table_from_factor(&update.table.relation)?;
        let mut usage = TableUsage::new(Operation::Update, table);
        for assignment in &update.assignments {
            for column in assignment_columns(&assignment.target) {
                usage.push_column(column);
            }
        }
        Ok(usage)
    }
}
