//! # sqlspot
//!
//! Find the SQL hiding in a codebase, report which tables and columns it
//! touches, and rewrite it without disturbing its formatting.
//!
//! ## Quick Example
//!
//! ```rust
//! use sqlspot::prelude::*;
//!
//! let node = HostNode::plain_text("UPDATE jobs SET state = 'DONE' WHERE id = :id");
//! let view = view_of(&node, SqlDialect::PostgreSql).into_view().unwrap();
//!
//! let rows: Vec<_> = view.usage_rows(&Provenance::default()).collect();
//! assert_eq!(rows[0].table, "jobs");
//! assert_eq!(rows[0].column.as_deref(), Some("state"));
//!
//! let sql = view.render(&mut ReplaceLiteral::new("DONE", "FINISHED"));
//! assert_eq!(sql, "UPDATE jobs SET state = 'FINISHED' WHERE id = :id");
//! ```
//!
//! ## Pipeline
//!
//! | Stage     | Module       | Output                     |
//! |-----------|--------------|----------------------------|
//! | Host      | [`analyzer`] | [`query::HostNode`]s       |
//! | Detect    | [`detect`]   | keyword hit                |
//! | Parse     | [`parser`]   | one `sqlparser` statement  |
//! | View      | [`query`]    | [`query::QueryView`]       |
//! | Usage     | [`usage`]    | [`table::UsageRow`]s       |
//! | Rewrite   | [`render`]   | minimally edited SQL       |

pub mod analyzer;
pub mod config;
pub mod detect;
pub mod error;
pub mod parser;
pub mod query;
pub mod render;
pub mod table;
pub mod usage;

pub mod prelude {
    pub use crate::analyzer::{CodebaseScanner, ScanResult, rewrite_file};
    pub use crate::config::ScanConfig;
    pub use crate::detect::probably_sql;
    pub use crate::error::*;
    pub use crate::parser::{ParseFailure, SqlDialect};
    pub use crate::query::{Detection, HostNode, QueryView, view_of};
    pub use crate::render::{
        ExpressionRewrite, NoRewrite, ReplaceExpression, ReplaceLiteral, RenderError, Rendered,
    };
    pub use crate::table::{MemorySink, Operation, Provenance, QueryTextRow, RowSink, UsageRow};
    pub use crate::usage::TableUsage;
}

pub use parser::parse;
pub use query::view_of;
