//! The fluent query engine.
//!
//! An [`Engine`] owns one [`Connection`] and the transient state of the query
//! being built. Chain builder calls after [`Engine::table`], then finish with a
//! terminal operation (`insert`, `update`, `delete`, `select`, `find`,
//! `count`, ...):
//!
//! ```ignore
//! let mut db = zorm::new_mysql("127.0.0.1:3306", "root", "secret", "test").await?;
//! let rows = db
//!     .table("userinfo")
//!     .where_(("uid", op::GT, 3))
//!     .order("uid DESC")
//!     .limit(10)
//!     .select()
//!     .await?;
//! ```
//!
//! Builder calls never fail on the spot. The first malformed call is kept and
//! returned by every terminal operation until the next `table` call; later
//! builder calls are ignored. Builder state survives terminal operations and
//! is only cleared by `table`.
//!
//! An engine is a single-owner value. Do not share one between concurrent
//! tasks; open one engine per logical query sequence instead.

use crate::builder::{
    AggregateFunction, Clause, DeleteStatement, InsertStatement, InsertVerb, IntoColumns,
    IntoCondition, IntoInsertData, IntoUpdateData, QueryBuilder, SelectStatement, SortDirection,
    UpdateStatement, WhereConnector, placeholder_count, render_sql,
};
use crate::executor::{Connection, ExecResult, Row, RowSet};
use crate::mapper::{rows_to_maps, scalar, scan_records};
use crate::record::Record;
use crate::{Error, Result, Value};

#[derive(Debug, Default)]
struct QueryState {
    table: String,
    where_clause: Clause,
    having: Clause,
    fields: Vec<String>,
    group: Vec<String>,
    order: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    error: Option<Error>,
    last_sql: String,
    last_params: Vec<Value>,
}

/// Fluent query builder bound to one connection
pub struct Engine<C: Connection> {
    conn: C,
    state: QueryState,
}

impl<C: Connection> Engine<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            state: QueryState::default(),
        }
    }

    /// Select the table for the next statement, clearing every clause, any
    /// pending builder error and the last executed statement.
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.state = QueryState {
            table: name.to_string(),
            ..QueryState::default()
        };
        self
    }

    pub fn get_table(&self) -> &str {
        &self.state.table
    }

    /// Add a predicate joined with AND.
    ///
    /// Accepts a record reference (its non-zero fields, AND-ed), `(column,
    /// value)`, `(column, operator, value)` or a `Vec<Value>` of two or three
    /// elements. Column names and operators are written into the SQL text and
    /// must not come from end users.
    pub fn where_<T: IntoCondition>(&mut self, condition: T) -> &mut Self {
        self.push_where(WhereConnector::And, condition)
    }

    /// Same as [`Engine::where_`]
    pub fn and_where<T: IntoCondition>(&mut self, condition: T) -> &mut Self {
        self.push_where(WhereConnector::And, condition)
    }

    /// Add a predicate joined with OR. Record fields are OR-ed with each other too.
    pub fn or_where<T: IntoCondition>(&mut self, condition: T) -> &mut Self {
        self.push_where(WhereConnector::Or, condition)
    }

    pub fn having<T: IntoCondition>(&mut self, condition: T) -> &mut Self {
        self.push_having(WhereConnector::And, condition)
    }

    pub fn or_having<T: IntoCondition>(&mut self, condition: T) -> &mut Self {
        self.push_having(WhereConnector::Or, condition)
    }

    /// Narrow the selected columns. Defaults to `*`.
    pub fn fields<T: IntoColumns>(&mut self, columns: T) -> &mut Self {
        self.state.fields.extend(columns.into_columns());
        self
    }

    pub fn group<T: IntoColumns>(&mut self, columns: T) -> &mut Self {
        self.state.group.extend(columns.into_columns());
        self
    }

    /// Append a raw ORDER BY term such as `"uid DESC"`
    pub fn order(&mut self, term: &str) -> &mut Self {
        let term = term.trim();
        if !term.is_empty() {
            self.state.order.push(term.to_string());
        }
        self
    }

    pub fn order_by(&mut self, column: &str, direction: SortDirection) -> &mut Self {
        self.state.order.push(format!("{column} {direction}"));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.state.limit = Some(limit);
        self
    }

    /// Rows to skip; only valid together with [`Engine::limit`]
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.state.offset = Some(offset);
        self
    }

    /// Insert one record, a batch of records, or key/value maps. Returns the
    /// last generated id, or 0 when the driver reports none.
    pub async fn insert<T: IntoInsertData>(&mut self, data: T) -> Result<i64> {
        self.write_rows(InsertVerb::Insert, data).await
    }

    /// Like [`Engine::insert`] with `REPLACE INTO`
    pub async fn replace<T: IntoInsertData>(&mut self, data: T) -> Result<i64> {
        self.write_rows(InsertVerb::Replace, data).await
    }

    /// Update matching rows from a record (every mapped field), a map, or a
    /// single `(column, value)` pair. Returns the number of affected rows.
    pub async fn update<T: IntoUpdateData>(&mut self, data: T) -> Result<u64> {
        self.check_error()?;
        let statement = UpdateStatement::new(&self.state.table, data)?
            .with_where(self.state.where_clause.clone());
        let result = self.run_write(&statement).await?;
        Ok(result.rows_affected)
    }

    /// Delete matching rows, honouring `limit`. Returns the number of affected rows.
    pub async fn delete(&mut self) -> Result<u64> {
        self.check_error()?;
        let statement = DeleteStatement::new(&self.state.table)
            .with_where(self.state.where_clause.clone())
            .limit(self.state.limit);
        let result = self.run_write(&statement).await?;
        Ok(result.rows_affected)
    }

    /// All matching rows as column → text maps (NULL as `""`)
    pub async fn select(&mut self) -> Result<Vec<Row>> {
        let rows = self.fetch(self.state.limit).await?;
        Ok(rows_to_maps(rows))
    }

    /// The first matching row, or [`Error::NotFound`]
    pub async fn select_one(&mut self) -> Result<Row> {
        let rows = self.fetch(Some(1)).await?;
        rows_to_maps(rows).into_iter().next().ok_or(Error::NotFound)
    }

    /// Append every matching row to `dest` as a record
    pub async fn find<R: Record>(&mut self, dest: &mut Vec<R>) -> Result<()> {
        let rows = self.fetch(self.state.limit).await?;
        dest.extend(scan_records::<R>(&rows)?);
        Ok(())
    }

    /// Fill `dest` from the first matching row, or fail with [`Error::NotFound`]
    pub async fn find_one<R: Record>(&mut self, dest: &mut R) -> Result<()> {
        let rows = self.fetch(Some(1)).await?;
        *dest = scan_records::<R>(&rows)?
            .into_iter()
            .next()
            .ok_or(Error::NotFound)?;
        Ok(())
    }

    /// `COUNT(*)` over the matching rows
    pub async fn count(&mut self) -> Result<i64> {
        let cell = self.aggregate(AggregateFunction::Count, "*").await?;
        parse_number(cell.as_deref(), "COUNT(*)")
    }

    /// `SUM(column)`; 0 when nothing matches
    pub async fn sum(&mut self, column: &str) -> Result<f64> {
        let cell = self.aggregate(AggregateFunction::Sum, column).await?;
        parse_number(cell.as_deref(), &format!("SUM({column})"))
    }

    /// `AVG(column)`; 0 when nothing matches
    pub async fn avg(&mut self, column: &str) -> Result<f64> {
        let cell = self.aggregate(AggregateFunction::Avg, column).await?;
        parse_number(cell.as_deref(), &format!("AVG({column})"))
    }

    /// `MIN(column)` as text; `None` when nothing matches
    pub async fn min(&mut self, column: &str) -> Result<Option<String>> {
        self.aggregate(AggregateFunction::Min, column).await
    }

    /// `MAX(column)` as text; `None` when nothing matches
    pub async fn max(&mut self, column: &str) -> Result<Option<String>> {
        self.aggregate(AggregateFunction::Max, column).await
    }

    /// Run raw SQL that returns no rows. Builder state is left untouched.
    pub async fn exec(&mut self, sql: &str, args: Vec<Value>) -> Result<ExecResult> {
        self.execute_sql(sql.to_string(), args).await
    }

    /// Run raw SQL and return its rows as column → text maps
    pub async fn query(&mut self, sql: &str, args: Vec<Value>) -> Result<Vec<Row>> {
        let rows = self.query_sql(sql.to_string(), args).await?;
        Ok(rows_to_maps(rows))
    }

    /// The last statement sent to the connection with its arguments inlined.
    ///
    /// Diagnostics only: the rendering is not escaped for execution.
    pub fn get_last_sql(&self) -> String {
        render_sql(&self.state.last_sql, &self.state.last_params)
    }

    /// Route subsequent statements through a new transaction
    pub async fn begin(&mut self) -> Result<()> {
        tracing::debug!("begin transaction");
        self.conn.begin().await.map_err(|e| Error::driver(e))
    }

    pub async fn commit(&mut self) -> Result<()> {
        tracing::debug!("commit transaction");
        self.conn.commit().await.map_err(|e| Error::driver(e))
    }

    pub async fn rollback(&mut self) -> Result<()> {
        tracing::debug!("rollback transaction");
        self.conn.rollback().await.map_err(|e| Error::driver(e))
    }

    /// The underlying connection
    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    fn push_where<T: IntoCondition>(&mut self, connector: WhereConnector, condition: T) -> &mut Self {
        if self.state.error.is_none() {
            let pushed = condition
                .into_condition()
                .and_then(|c| self.state.where_clause.push(connector, c));
            self.state.error = pushed.err();
        }
        self
    }

    fn push_having<T: IntoCondition>(&mut self, connector: WhereConnector, condition: T) -> &mut Self {
        if self.state.error.is_none() {
            let pushed = condition
                .into_condition()
                .and_then(|c| self.state.having.push(connector, c));
            self.state.error = pushed.err();
        }
        self
    }

    // The error stays pending so a retried terminal call never runs with the
    // predicates that were dropped after it.
    fn check_error(&self) -> Result<()> {
        match &self.state.error {
            Some(err) => Err(err.replay()),
            None => Ok(()),
        }
    }

    async fn write_rows<T: IntoInsertData>(&mut self, verb: InsertVerb, data: T) -> Result<i64> {
        self.check_error()?;
        let statement = InsertStatement::new(verb, &self.state.table, data)?;
        let result = self.run_write(&statement).await?;
        Ok(result.last_insert_id.unwrap_or(0))
    }

    async fn fetch(&mut self, limit: Option<u64>) -> Result<RowSet> {
        self.check_error()?;
        let state = &self.state;
        let statement = SelectStatement::new(&state.table)
            .columns(state.fields.clone())
            .with_where(state.where_clause.clone())
            .group_by(state.group.clone())
            .having(state.having.clone())
            .order_by(state.order.clone())
            .limit(limit)
            .offset(state.offset);
        let (sql, params) = checked(&statement)?;
        self.query_sql(sql, params).await
    }

    async fn aggregate(&mut self, function: AggregateFunction, column: &str) -> Result<Option<String>> {
        self.check_error()?;
        let statement = SelectStatement::aggregate(&self.state.table, function, column)
            .with_where(self.state.where_clause.clone());
        let (sql, params) = checked(&statement)?;
        let rows = self.query_sql(sql, params).await?;
        Ok(scalar(&rows).map(str::to_string))
    }

    async fn run_write<Q: QueryBuilder>(&mut self, statement: &Q) -> Result<ExecResult> {
        let (sql, params) = checked(statement)?;
        self.execute_sql(sql, params).await
    }

    async fn execute_sql(&mut self, sql: String, params: Vec<Value>) -> Result<ExecResult> {
        tracing::debug!(sql = %sql, params = params.len(), "execute");
        let result = self.conn.execute(&sql, &params).await;
        self.state.last_sql = sql;
        self.state.last_params = params;
        result.map_err(|e| {
            tracing::warn!(error = %e, sql = %self.state.last_sql, "statement failed");
            Error::driver(e)
        })
    }

    async fn query_sql(&mut self, sql: String, params: Vec<Value>) -> Result<RowSet> {
        tracing::debug!(sql = %sql, params = params.len(), "query");
        let result = self.conn.query(&sql, &params).await;
        self.state.last_sql = sql;
        self.state.last_params = params;
        result.map_err(|e| {
            tracing::warn!(error = %e, sql = %self.state.last_sql, "query failed");
            Error::driver(e)
        })
    }
}

// Assembled text and its arguments, refusing any placeholder/argument mismatch
fn checked<Q: QueryBuilder>(statement: &Q) -> Result<(String, Vec<Value>)> {
    let sql = statement.to_sql()?;
    let params = statement.parameters().to_vec();
    let placeholders = placeholder_count(&sql);
    if placeholders != params.len() {
        return Err(Error::invalid_query(format!(
            "statement has {placeholders} placeholders but {} arguments",
            params.len()
        )));
    }
    Ok((sql, params))
}

fn parse_number<T: std::str::FromStr + Default>(cell: Option<&str>, column: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match cell {
        None => Ok(T::default()),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| Error::type_coercion(column, column, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct MockConnection {
        statements: Vec<(String, Vec<Value>)>,
        results: VecDeque<RowSet>,
        fail: bool,
        transaction: Vec<&'static str>,
    }

    impl MockConnection {
        fn returning(rows: RowSet) -> Self {
            Self {
                results: VecDeque::from([rows]),
                ..Self::default()
            }
        }
    }

    impl Connection for MockConnection {
        async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
            self.statements.push((sql.to_string(), params.to_vec()));
            if self.fail {
                return Err(Error::invalid_query("mock execute failure"));
            }
            Ok(ExecResult {
                last_insert_id: Some(41),
                rows_affected: 2,
            })
        }

        async fn query(&mut self, sql: &str, params: &[Value]) -> Result<RowSet> {
            self.statements.push((sql.to_string(), params.to_vec()));
            if self.fail {
                return Err(Error::invalid_query("mock query failure"));
            }
            Ok(self.results.pop_front().unwrap_or_default())
        }

        async fn begin(&mut self) -> Result<()> {
            self.transaction.push("begin");
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.transaction.push("commit");
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.transaction.push("rollback");
            Ok(())
        }
    }

    fn single_cell(column: &str, cell: Option<&str>) -> RowSet {
        RowSet {
            columns: vec![column.to_string()],
            rows: vec![vec![cell.map(str::to_string)]],
        }
    }

    fn last(engine: &mut Engine<MockConnection>) -> (String, Vec<Value>) {
        engine.connection().statements.last().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_update_arguments_follow_set_then_where() {
        let mut engine = Engine::new(MockConnection::default());
        let affected = engine
            .table("userinfo")
            .where_(("uid", 4))
            .update(("username", "x"))
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let (sql, params) = last(&mut engine);
        assert_eq!(sql, "UPDATE userinfo SET username=? WHERE uid=?");
        assert_eq!(params, vec![Value::from("x"), Value::I32(4)]);
        assert_eq!(
            engine.get_last_sql(),
            "UPDATE userinfo SET username='x' WHERE uid=4"
        );
    }

    #[tokio::test]
    async fn test_builder_error_is_deferred_to_terminal_call() {
        let mut engine = Engine::new(MockConnection::default());
        engine
            .table("userinfo")
            .where_(("uid", "=>", 1))
            .or_where(("uid", 2));

        let err = engine.select().await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperator { .. }));
        assert!(engine.connection().statements.is_empty());

        let err = engine.select().await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperator { .. }));
        assert!(engine.connection().statements.is_empty());

        engine.table("userinfo").select().await.unwrap();
        let (sql, _) = last(&mut engine);
        assert_eq!(sql, "SELECT * FROM userinfo");
    }

    #[tokio::test]
    async fn test_retried_delete_keeps_failing_after_bad_predicate() {
        let mut engine = Engine::new(MockConnection::default());
        engine
            .table("userinfo")
            .where_(("a", 1))
            .and_where(("b", "=>", 2));

        for _ in 0..2 {
            let err = engine.delete().await.unwrap_err();
            assert!(matches!(err, Error::InvalidOperator { ref operator } if operator == "=>"));
        }
        assert!(matches!(engine.count().await, Err(Error::InvalidOperator { .. })));
        assert!(matches!(engine.update(("a", 2)).await, Err(Error::InvalidOperator { .. })));
        assert!(engine.connection().statements.is_empty());
        assert_eq!(engine.get_last_sql(), "");
    }

    #[tokio::test]
    async fn test_quoted_question_mark_is_not_a_placeholder() {
        let mut engine = Engine::new(MockConnection::default());
        engine
            .table("t")
            .fields(["a", "'?' AS mark"])
            .where_(("a", op::GT, 0))
            .select()
            .await
            .unwrap();

        let (sql, params) = last(&mut engine);
        assert_eq!(sql, "SELECT a, '?' AS mark FROM t WHERE a>?");
        assert_eq!(params, vec![Value::I32(0)]);
        assert_eq!(engine.get_last_sql(), "SELECT a, '?' AS mark FROM t WHERE a>0");
    }

    #[tokio::test]
    async fn test_table_resets_state() {
        let mut engine = Engine::new(MockConnection::default());
        engine
            .table("a")
            .where_(("x", 1))
            .order("x DESC")
            .limit(5)
            .where_(("y", "in", 3));
        engine.table("b");
        assert_eq!(engine.get_table(), "b");
        assert_eq!(engine.get_last_sql(), "");

        engine.select().await.unwrap();
        let (sql, params) = last(&mut engine);
        assert_eq!(sql, "SELECT * FROM b");
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn test_select_one_not_found() {
        let mut engine = Engine::new(MockConnection::default());
        let err = engine.table("userinfo").select_one().await.unwrap_err();
        assert!(err.is_not_found());

        let (sql, _) = last(&mut engine);
        assert_eq!(sql, "SELECT * FROM userinfo LIMIT 1");
    }

    #[tokio::test]
    async fn test_select_one_keeps_configured_limit_for_later_calls() {
        let mut engine = Engine::new(MockConnection::default());
        engine.table("t").limit(10);
        let _ = engine.select_one().await;
        engine.select().await.unwrap();
        let (sql, _) = last(&mut engine);
        assert_eq!(sql, "SELECT * FROM t LIMIT 10");
    }

    #[tokio::test]
    async fn test_count_and_sum() {
        let mut engine = Engine::new(MockConnection::returning(single_cell("COUNT(*)", Some("3"))));
        let count = engine
            .table("orders")
            .where_(("status", op::NEQ, 0))
            .count()
            .await
            .unwrap();
        assert_eq!(count, 3);
        let (sql, _) = last(&mut engine);
        assert_eq!(sql, "SELECT COUNT(*) FROM orders WHERE status!=?");

        let total = engine.sum("amount").await.unwrap();
        assert_eq!(total, 0.0);
        let (sql, _) = last(&mut engine);
        assert_eq!(sql, "SELECT SUM(amount) FROM orders WHERE status!=?");
    }

    #[tokio::test]
    async fn test_driver_errors_carry_call_site() {
        let mut engine = Engine::new(MockConnection {
            fail: true,
            ..MockConnection::default()
        });
        let err = engine.table("t").delete().await.unwrap_err();
        match &err {
            Error::Driver { file, .. } => assert!(file.ends_with("engine.rs")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("File: "));
        assert_eq!(engine.get_last_sql(), "DELETE FROM t");
    }

    #[tokio::test]
    async fn test_transaction_calls_reach_connection() {
        let mut engine = Engine::new(MockConnection::default());
        engine.begin().await.unwrap();
        engine.exec("DELETE FROM t", vec![]).await.unwrap();
        engine.rollback().await.unwrap();
        engine.begin().await.unwrap();
        engine.commit().await.unwrap();
        assert_eq!(
            engine.connection().transaction,
            vec!["begin", "rollback", "begin", "commit"]
        );
    }

    #[test]
    fn test_offset_requires_limit() {
        let mut engine = Engine::new(MockConnection::default());
        engine.table("t").offset(20);
        let err = tokio_test::block_on(engine.select()).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
        assert!(engine.connection().statements.is_empty());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<i64>(Some("12"), "c").unwrap(), 12);
        assert_eq!(parse_number::<f64>(None, "c").unwrap(), 0.0);
        assert!(parse_number::<i64>(Some("x"), "c").is_err());
    }
}
