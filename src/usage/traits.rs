//! Core traits for usage extraction

use serde::Serialize;
use sqlparser::ast::Statement;
use thiserror::Error;

use crate::table::{Operation, Provenance, UsageRow};

/// A statement matched a pattern but its shape could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExtractError {
    pub message: String,
}

impl ExtractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What one statement does to one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableUsage {
    pub operation: Operation,
    pub table: String,
    /// Referenced columns in statement order, without duplicates. A single
    /// `None` entry stands for a statement with no column list at all.
    pub columns: Vec<Option<String>>,
}

impl TableUsage {
    pub fn new(operation: Operation, table: impl Into<String>) -> Self {
        Self {
            operation,
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Record a column unless it was already seen.
    pub fn push_column(&mut self, column: impl Into<String>) {
        let column = Some(column.into());
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
    }

    /// Mark the statement as table-level only.
    pub fn without_columns(mut self) -> Self {
        self.columns = vec![None];
        self
    }

    pub fn into_rows(self, provenance: &Provenance) -> impl Iterator<Item = UsageRow> + '_ {
        let TableUsage {
            operation,
            table,
            columns,
        } = self;
        columns.into_iter().map(move |column| UsageRow {
            source_path: provenance.source_path.clone(),
            line_number: provenance.line_number,
            commit_hash: provenance.commit_hash.clone(),
            operation,
            table: table.clone(),
            column,
        })
    }
}

/// Trait for statement-kind specific usage extraction
pub trait UsagePattern: Send + Sync {
    fn id(&self) -> &'static str;

    fn priority(&self) -> u32 {
        100
    }

    /// Check if this pattern handles the statement
    fn matches(&self, stmt: &Statement) -> bool;

    fn extract(&self, stmt: &Statement) -> Result<TableUsage, ExtractError>;
}
