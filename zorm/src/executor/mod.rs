//! Connection interface consumed by the engine, and its sqlx-backed implementations

use crate::{Result, Value};
use std::collections::HashMap;
use std::future::Future;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Identifier generated by the statement, if the driver reports one
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
}

/// Rows returned by a query, with every cell rendered as text.
///
/// `None` cells are SQL NULL. Each row has one cell per entry in `columns`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row keyed by column name
pub type Row = HashMap<String, String>;

/// A database handle the engine sends statements to.
///
/// Implementations prepare, bind and run each statement. Between `begin` and
/// `commit`/`rollback`, `execute` and `query` must run inside the open
/// transaction.
pub trait Connection: Send {
    /// Run a statement that returns no rows (INSERT, UPDATE, DELETE, DDL)
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<ExecResult>> + Send;

    /// Run a statement that returns rows
    fn query(&mut self, sql: &str, params: &[Value]) -> impl Future<Output = Result<RowSet>> + Send;

    /// Start routing statements through a transaction
    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Commit the open transaction
    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Roll back the open transaction
    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;
}
