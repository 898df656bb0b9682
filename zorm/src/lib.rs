//! zorm - a small fluent query builder and record mapper for MySQL-flavoured SQL
//!
//! Records describe their column mapping through `#[sql = "..."]` field
//! attributes; the [`Engine`] builds parameterized statements from chained
//! calls and maps result rows back onto records.
//!
//! ```ignore
//! use zorm::{Record, op};
//!
//! #[derive(Debug, Default, Record)]
//! struct UserInfo {
//!     #[sql = "uid,auto_increment"]
//!     pub uid: i64,
//!     #[sql = "username"]
//!     pub username: String,
//!     pub departname: String,
//! }
//!
//! let mut db = zorm::new_mysql("127.0.0.1:3306", "root", "secret", "test").await?;
//! let id = db.table("userinfo").insert(&UserInfo {
//!     username: "ann".into(),
//!     departname: "ops".into(),
//!     ..Default::default()
//! }).await?;
//!
//! let mut users: Vec<UserInfo> = Vec::new();
//! db.table("userinfo").where_(("uid", op::GTE, id)).find(&mut users).await?;
//! ```

// lets `#[derive(Record)]` output (which names `::zorm`) compile inside this crate
extern crate self as zorm;

pub mod builder;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod operator;
pub mod record;
pub mod value;

// Re-export main types
pub use builder::{
    AggregateFunction, Clause, Condition, DeleteStatement, InsertStatement, InsertVerb,
    IntoColumns, IntoCondition, IntoInsertData, IntoUpdateData, QueryBuilder, SelectStatement,
    SortDirection, UpdateStatement, WhereConnector, render_sql,
};
pub use coerce::ConversionError;
pub use config::MySqlConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use executor::{Connection, ExecResult, Row, RowSet};
pub use operator::{IntoOperator, Operator, op};
pub use record::{FieldDef, FieldKind, Record, RecordDescriptor, SqlField};
pub use value::Value;

#[cfg(feature = "derive")]
pub use zorm_derive::Record;

#[cfg(feature = "mysql")]
pub use executor::mysql::MySqlDatabase;
#[cfg(feature = "sqlite")]
pub use executor::sqlite::SqliteDatabase;

/// Open a MySQL engine with the default pool settings
#[cfg(feature = "mysql")]
pub async fn new_mysql(
    address: &str,
    username: &str,
    password: &str,
    dbname: &str,
) -> Result<Engine<MySqlDatabase>> {
    let config = MySqlConfig::new(address, username, password, dbname);
    connect_mysql(&config).await
}

/// Open a MySQL engine from explicit settings, e.g. [`MySqlConfig::from_env`]
#[cfg(feature = "mysql")]
pub async fn connect_mysql(config: &MySqlConfig) -> Result<Engine<MySqlDatabase>> {
    Ok(Engine::new(MySqlDatabase::connect(config).await?))
}

/// Open a SQLite engine, e.g. `new_sqlite("sqlite::memory:", 1)`
#[cfg(feature = "sqlite")]
pub async fn new_sqlite(url: &str, max_connections: u32) -> Result<Engine<SqliteDatabase>> {
    Ok(Engine::new(SqliteDatabase::connect(url, max_connections).await?))
}
