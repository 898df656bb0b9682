//! MySQL connection backed by a sqlx pool

use super::{Connection, ExecResult, RowSet};
use crate::config::MySqlConfig;
use crate::{Error, Result, Value};
use futures::TryStreamExt;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, Row, TypeInfo, ValueRef};

/// MySQL pool wrapper that routes statements through a transaction while one is open
pub struct MySqlDatabase {
    pool: MySqlPool,
    tx: Option<sqlx::Transaction<'static, MySql>>,
}

impl MySqlDatabase {
    /// Open a pool from explicit settings
    pub async fn connect(config: &MySqlConfig) -> Result<Self> {
        config.validate()?;
        let (host, port) = config.host_and_port()?;
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)
            .charset(&config.charset);

        tracing::debug!(
            address = %config.address,
            database = %config.database,
            max_connections = config.max_connections,
            "opening MySQL pool"
        );
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::from_pool(pool))
    }

    /// Create from an existing MySqlPool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool, tx: None }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }
}

impl Connection for MySqlDatabase {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let query = bind_values(sqlx::query(sql), params)?;
        let result = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await?,
            None => query.execute(&self.pool).await?,
        };
        Ok(ExecResult {
            last_insert_id: i64::try_from(result.last_insert_id()).ok(),
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
    E: Executor<'e, Database = MySql> + 'e,
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
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Value],
) -> Result<Query<'q, MySql, MySqlArguments>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::I32(i) => query.bind(*i),
            Value::I64(i) => query.bind(*i),
            Value::U64(u) => query.bind(*u),
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

// The binary protocol returns typed cells; render each back to the text a
// text-protocol client would have received.
fn row_to_text(row: &MySqlRow) -> Result<Vec<Option<String>>> {
    (0..row.columns().len())
        .map(|index| cell_to_text(row, index))
        .collect()
}

fn cell_to_text(row: &MySqlRow, index: usize) -> Result<Option<String>> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(None);
    }
    let type_name = raw.type_info().name().to_string();

    let text = match type_name.as_str() {
        "BOOLEAN" => {
            let b: bool = row.try_get_unchecked(index)?;
            if b { "1" } else { "0" }.to_string()
        }
        name if name.ends_with("UNSIGNED") => row.try_get_unchecked::<u64, _>(index)?.to_string(),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get_unchecked::<i64, _>(index)?.to_string()
        }
        "FLOAT" => row.try_get::<f32, _>(index)?.to_string(),
        "DOUBLE" => row.try_get::<f64, _>(index)?.to_string(),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            let bytes: Vec<u8> = row.try_get_unchecked(index)?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        "DATE" | "TIME" | "DATETIME" | "TIMESTAMP" => temporal_to_text(row, index, &type_name)?,
        _ => row.try_get_unchecked::<String, _>(index)?,
    };
    Ok(Some(text))
}

#[cfg(feature = "datetime-support")]
fn temporal_to_text(row: &MySqlRow, index: usize, type_name: &str) -> Result<String> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    let text = match type_name {
        "DATE" => row.try_get::<NaiveDate, _>(index)?.to_string(),
        "TIME" => row.try_get::<NaiveTime, _>(index)?.to_string(),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(index)?
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        _ => row
            .try_get::<NaiveDateTime, _>(index)?
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    };
    Ok(text)
}

#[cfg(not(feature = "datetime-support"))]
fn temporal_to_text(row: &MySqlRow, index: usize, type_name: &str) -> Result<String> {
    let column = row.columns()[index].name();
    Err(Error::type_coercion(
        column,
        column,
        format!("{type_name} cells need the `datetime-support` feature"),
    ))
}
