//! Report rows and the sink they are written to.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// DML operation a usage row reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Select,
    Update,
    Delete,
    Insert,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Select => "SELECT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Insert => "INSERT",
        };
        f.write_str(name)
    }
}

/// Where a query was found. Supplied by the host, never computed from SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub source_path: Option<String>,
    pub line_number: Option<usize>,
    pub commit_hash: Option<String>,
}

/// One column a query touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRow {
    pub source_path: Option<String>,
    pub line_number: Option<usize>,
    pub commit_hash: Option<String>,
    pub operation: Operation,
    pub table: String,
    pub column: Option<String>,
}

/// The full text of one detected query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTextRow {
    pub source_path: Option<String>,
    pub query: String,
}

/// Destination for report rows. Shared by scanner workers.
pub trait RowSink: Send + Sync {
    fn insert_usage(&self, row: UsageRow);

    fn insert_query(&self, row: QueryTextRow);
}

/// Collects rows in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    usage: Mutex<Vec<UsageRow>>,
    queries: Mutex<Vec<QueryTextRow>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage_rows(&self) -> Vec<UsageRow> {
        self.usage.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    pub fn query_rows(&self) -> Vec<QueryTextRow> {
        self.queries
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    pub fn into_parts(self) -> (Vec<UsageRow>, Vec<QueryTextRow>) {
        let usage = self.usage.into_inner().unwrap_or_else(|e| e.into_inner());
        let queries = self.queries.into_inner().unwrap_or_else(|e| e.into_inner());
        (usage, queries)
    }
}

impl RowSink for MemorySink {
    fn insert_usage(&self, row: UsageRow) {
        match self.usage.lock() {
            Ok(mut rows) => rows.push(row),
            Err(poisoned) => poisoned.into_inner().push(row),
        }
    }

    fn insert_query(&self, row: QueryTextRow) {
        match self.queries.lock() {
            Ok(mut rows) => rows.push(row),
            Err(poisoned) => poisoned.into_inner().push(row),
        }
    }
}
