//! DELETE statement builder

use super::common::{Clause, QueryBuilder};
use crate::{Error, Result, Value};

/// A complete DELETE statement
#[derive(Debug, Clone)]
pub struct DeleteStatement {
    table_name: String,
    where_clause: Clause,
    limit: Option<u64>,
}

impl DeleteStatement {
    pub fn new(table: &str) -> Self {
        Self {
            table_name: table.to_string(),
            where_clause: Clause::new(),
            limit: None,
        }
    }

    pub fn with_where(mut self, clause: Clause) -> Self {
        self.where_clause = clause;
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }
}

impl QueryBuilder for DeleteStatement {
    fn to_sql(&self) -> Result<String> {
        if self.table_name.is_empty() {
            return Err(Error::invalid_query("no table selected"));
        }

        let mut sql = String::new();

        sql.push_str("DELETE FROM ");
        sql.push_str(&self.table_name);

        if !self.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(self.where_clause.text());
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(sql)
    }

    fn parameters(&self) -> &[Value] {
        self.where_clause.args()
    }
}
