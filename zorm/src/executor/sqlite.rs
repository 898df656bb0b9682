//! SQLite connection backed by a sqlx pool

use super::{Connection, ExecResult, RowSet};
use crate::{Error, Result, Value};
use futures::TryStreamExt;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, TypeInfo, ValueRef};

/// SQLite pool wrapper that routes statements through a transaction while one is open
pub struct SqliteDatabase {
    pool: SqlitePool,
    tx: Option<sqlx::Transaction<'static, Sqlite>>,
}

impl SqliteDatabase {
    /// Open a pool from a connection string such as `sqlite::memory:` or `sqlite://app.db`.
    ///
    /// An in-memory database lives per connection, so `sqlite::memory:` should
    /// be opened with a single connection.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        tracing::debug!(url, max_connections, "opening SQLite pool");
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    /// Create from an existing SqlitePool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool, tx: None }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }
}

impl Connection for SqliteDatabase {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let query = bind_values(sqlx::query(sql), params)?;
        let result = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await?,
            None => query.execute(&self.pool).await?,
        };
        Ok(ExecResult {
            last_insert_id: Some(result.last_insert_rowid()),
            rows_affected: result.rows_affected(),
        })
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<RowSet> {
        match self.tx.as_mut() {
            Some(tx) => fetch_rows(&mut **tx, sql, params).await,
            None => fetch_rows(&self.pool, sql, params).await,
        }
    }

    async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(Error::invalid_query("a transaction is already open"));
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::invalid_query("no open transaction to commit"))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::invalid_query("no open transaction to roll back"))?;
        tx.rollback().await?;
        Ok(())
    }
}

async fn fetch_rows<'e, E>(executor: E, sql: &'e str, params: &'e [Value]) -> Result<RowSet>
where
    E: Executor<'e, Database = Sqlite> + 'e,
{
    let query = bind_values(sqlx::query(sql), params)?;
    let mut stream = query.fetch(executor);

    let mut rows = RowSet::default();
    while let Some(row) = stream.try_next().await? {
        if rows.columns.is_empty() {
            rows.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        rows.rows.push(row_to_text(&row)?);
    }
    Ok(rows)
}

/// Bind values to a sqlx query in placeholder order
fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::I32(i) => query.bind(*i),
            Value::I64(i) => query.bind(*i),
            Value::U64(u) => {
                let signed = i64::try_from(*u).map_err(|_| {
                    Error::invalid_operand_type(format!("{u} does not fit a SQLite INTEGER"))
                })?;
                query.bind(signed)
            }
            Value::F32(f) => query.bind(*f),
            Value::F64(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Array(_) => {
                return Err(Error::invalid_operand_type(
                    "list values can only be bound through IN / NOT IN",
                ));
            }
        };
    }
    Ok(query)
}

fn row_to_text(row: &SqliteRow) -> Result<Vec<Option<String>>> {
    (0..row.columns().len())
        .map(|index| cell_to_text(row, index))
        .collect()
}

// Cells are decoded by their stored class, not the declared column type.
fn cell_to_text(row: &SqliteRow, index: usize) -> Result<Option<String>> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(None);
    }
    let storage = raw.type_info().name().to_string();

    let text = match storage.as_str() {
        "INTEGER" => row.try_get_unchecked::<i64, _>(index)?.to_string(),
        "REAL" => row.try_get_unchecked::<f64, _>(index)?.to_string(),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get_unchecked(index)?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        _ => row.try_get_unchecked::<String, _>(index)?,
    };
    Ok(Some(text))
}
