//! SELECT statement builder, including single-column aggregates

use super::common::{AggregateFunction, Clause, QueryBuilder};
use crate::{Error, Result, Value};

/// What a SELECT projects
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Plain column list; empty means `*`
    Columns(Vec<String>),
    /// `FN(column)`
    Aggregate {
        function: AggregateFunction,
        column: String,
    },
}

/// A complete SELECT statement
#[derive(Debug, Clone)]
pub struct SelectStatement {
    table_name: String,
    selection: Selection,
    where_clause: Clause,
    group_by: Vec<String>,
    having: Clause,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    parameters: Vec<Value>,
}

impl SelectStatement {
    /// `SELECT * FROM table`
    pub fn new(table: &str) -> Self {
        Self {
            table_name: table.to_string(),
            selection: Selection::Columns(Vec::new()),
            where_clause: Clause::new(),
            group_by: Vec::new(),
            having: Clause::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            parameters: Vec::new(),
        }
    }

    /// `SELECT FN(column) FROM table`
    pub fn aggregate(table: &str, function: AggregateFunction, column: &str) -> Self {
        Self {
            selection: Selection::Aggregate {
                function,
                column: column.to_string(),
            },
            ..Self::new(table)
        }
    }

    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.selection = Selection::Columns(columns);
        self
    }

    pub fn with_where(mut self, clause: Clause) -> Self {
        self.where_clause = clause;
        self.collect_parameters();
        self
    }

    pub fn group_by(mut self, columns: Vec<String>) -> Self {
        self.group_by = columns;
        self
    }

    pub fn having(mut self, clause: Clause) -> Self {
        self.having = clause;
        self.collect_parameters();
        self
    }

    /// ORDER BY terms, each written as given (`"uid DESC"`)
    pub fn order_by(mut self, terms: Vec<String>) -> Self {
        self.order_by = terms;
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<u64>) -> Self {
        self.offset = offset;
        self
    }

    fn collect_parameters(&mut self) {
        self.parameters = self
            .where_clause
            .args()
            .iter()
            .chain(self.having.args())
            .cloned()
            .collect();
    }
}

impl QueryBuilder for SelectStatement {
    fn to_sql(&self) -> Result<String> {
        if self.table_name.is_empty() {
            return Err(Error::invalid_query("no table selected"));
        }

        let mut sql = String::new();

        sql.push_str("SELECT ");
        match &self.selection {
            Selection::Columns(columns) if columns.is_empty() => sql.push('*'),
            Selection::Columns(columns) => sql.push_str(&columns.join(", ")),
            Selection::Aggregate { function, column } => {
                sql.push_str(&format!("{function}({column})"))
            }
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.table_name);

        if !self.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(self.where_clause.text());
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(self.having.text());
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(_)) => return Err(Error::invalid_query("OFFSET requires LIMIT")),
            (None, None) => {}
        }

        Ok(sql)
    }

    fn parameters(&self) -> &[Value] {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::common::{IntoCondition, WhereConnector};
    use crate::op;

    fn filter(pairs: Vec<(WhereConnector, (&str, i32))>) -> Clause {
        let mut clause = Clause::new();
        for (connector, condition) in pairs {
            clause
                .push(connector, condition.into_condition().unwrap())
                .unwrap();
        }
        clause
    }

    #[test]
    fn test_basic_select() {
        let query = SelectStatement::new("users");
        assert_eq!(query.to_sql().unwrap(), "SELECT * FROM users");
        assert!(query.parameters().is_empty());
    }

    #[test]
    fn test_select_columns() {
        let query = SelectStatement::new("users").columns(vec!["uid".into(), "username".into()]);
        assert_eq!(query.to_sql().unwrap(), "SELECT uid, username FROM users");
    }

    #[test]
    fn test_full_clause_order() {
        let mut having = Clause::new();
        having
            .push(
                WhereConnector::And,
                ("COUNT(*)", op::GT, 1).into_condition().unwrap(),
            )
            .unwrap();

        let query = SelectStatement::new("orders")
            .columns(vec!["customer".into(), "COUNT(*)".into()])
            .with_where(filter(vec![(WhereConnector::And, ("status", 2))]))
            .group_by(vec!["customer".into()])
            .having(having)
            .order_by(vec!["customer DESC".into()])
            .limit(Some(10))
            .offset(Some(20));

        assert_eq!(
            query.to_sql().unwrap(),
            "SELECT customer, COUNT(*) FROM orders WHERE status=? GROUP BY customer \
             HAVING COUNT(*)>? ORDER BY customer DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(query.parameters(), &[Value::I32(2), Value::I32(1)]);
    }

    #[test]
    fn test_having_parameters_follow_where_regardless_of_call_order() {
        let query = SelectStatement::new("t")
            .having(filter(vec![(WhereConnector::And, ("h", 2))]))
            .with_where(filter(vec![(WhereConnector::And, ("w", 1))]));
        assert_eq!(query.parameters(), &[Value::I32(1), Value::I32(2)]);
    }

    #[test]
    fn test_aggregate() {
        let query = SelectStatement::aggregate("orders", AggregateFunction::Sum, "total")
            .with_where(filter(vec![
                (WhereConnector::And, ("customer", 7)),
                (WhereConnector::Or, ("customer", 8)),
            ]));
        assert_eq!(
            query.to_sql().unwrap(),
            "SELECT SUM(total) FROM orders WHERE customer=? OR customer=?"
        );

        let count = SelectStatement::aggregate("orders", AggregateFunction::Count, "*");
        assert_eq!(count.to_sql().unwrap(), "SELECT COUNT(*) FROM orders");
    }

    #[test]
    fn test_offset_without_limit_fails() {
        let query = SelectStatement::new("users").offset(Some(5));
        assert!(query.to_sql().is_err());
    }
}
