//! Statement builders

pub mod common;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

// Re-export types from submodules
pub use common::{
    AggregateFunction, Clause, Condition, IntoColumns, IntoCondition, QueryBuilder, SortDirection,
    WhereConnector, placeholder_count, render_sql,
};
pub use delete::DeleteStatement;
pub use insert::{InsertData, InsertStatement, InsertVerb, IntoInsertData};
pub use select::{SelectStatement, Selection};
pub use update::{IntoUpdateData, UpdateStatement};
