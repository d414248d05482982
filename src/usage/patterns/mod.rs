//! Usage patterns, one per statement kind

mod delete;
mod insert;
mod select;
mod update;

pub use delete::DeletePattern;
pub use insert::InsertPattern;
pub use select::SelectPattern;
pub use update::UpdatePattern;
