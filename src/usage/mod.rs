//! Column usage extraction.
//!
//! Each statement kind has a pattern that knows where its table and columns
//! live in the AST:
//!
//! ```text
//! Statement → UsageRegistry → UsagePattern → TableUsage → UsageRow*
//! ```
//!
//! Only projections, assignments and insert column lists count as usage.
//! Columns that appear only in predicates are not reported.

mod clauses;
mod patterns;
mod registry;
mod traits;

pub use clauses::*;
pub use patterns::*;
pub use registry::*;
pub use traits::*;
