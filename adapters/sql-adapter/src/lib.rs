//! sql-adapter — MySQL and Postgres implementation of the `SqlDriver` port.
//!
//! Purpose
//! - Give the domain `Connector` real connections for both supported dialects.
//! - One `sqlx` connection per `connect` call, closed explicitly by the
//!   connector when its call finishes; there is no pool.
//!
//! Notes
//! - Statements arrive as finished SQL text and run in autocommit mode.
//! - Column values are decoded into `SqlValue` by trying integer, float,
//!   boolean and text decodings in turn; other column types are reported as
//!   `CoreError::MalformedRow`.

use domain::engine::EngineKind;
use domain::{CoreError, Credentials, Row, SqlConnection, SqlDriver, SqlValue};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Database, Decode, Row as _, Type, TypeInfo};
use tracing::{debug, trace, warn};

/// Stateless driver opening a fresh connection per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxDriver;

impl SqlxDriver {
    pub fn new() -> Self {
        Self
    }
}

fn map_connect_err(e: sqlx::Error) -> CoreError {
    CoreError::Connection(format!("sqlx connect: {e}"))
}

fn map_sqlerr(e: sqlx::Error) -> CoreError {
    CoreError::Repository(format!("sqlx error: {e}"))
}

fn mysql_options(c: &Credentials) -> MySqlConnectOptions {
    let opts = MySqlConnectOptions::new()
        .host(&c.host)
        .username(&c.user)
        .password(&c.password)
        .database(&c.dbname);
    match c.port {
        Some(p) => opts.port(p),
        None => opts,
    }
}

fn pg_options(c: &Credentials) -> PgConnectOptions {
    let opts = PgConnectOptions::new()
        .host(&c.host)
        .username(&c.user)
        .password(&c.password)
        .database(&c.dbname);
    match c.port {
        Some(p) => opts.port(p),
        None => opts,
    }
}

impl SqlDriver for SqlxDriver {
    type Conn = SqlxConnection;

    async fn connect(
        &self,
        engine: EngineKind,
        credentials: &Credentials,
    ) -> Result<SqlxConnection, CoreError> {
        trace!(%engine, host = %credentials.host, db = %credentials.dbname, "opening connection");
        match engine {
            EngineKind::MySql => {
                let conn = MySqlConnection::connect_with(&mysql_options(credentials))
                    .await
                    .map_err(map_connect_err)?;
                Ok(SqlxConnection::MySql(conn))
            }
            EngineKind::Postgres => {
                let conn = PgConnection::connect_with(&pg_options(credentials))
                    .await
                    .map_err(map_connect_err)?;
                Ok(SqlxConnection::Postgres(conn))
            }
        }
    }
}

/// An open MySQL or Postgres connection.
pub enum SqlxConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
}

impl SqlConnection for SqlxConnection {
    async fn fetch_optional(&mut self, sql: &str) -> Result<Option<Row>, CoreError> {
        debug!(sql, "fetch_optional");
        match self {
            SqlxConnection::MySql(c) => sqlx::query(sql)
                .fetch_optional(&mut *c)
                .await
                .map_err(map_sqlerr)?
                .map(|r| decode_mysql_row(&r))
                .transpose(),
            SqlxConnection::Postgres(c) => sqlx::query(sql)
                .fetch_optional(&mut *c)
                .await
                .map_err(map_sqlerr)?
                .map(|r| decode_pg_row(&r))
                .transpose(),
        }
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>, CoreError> {
        debug!(sql, "fetch_all");
        match self {
            SqlxConnection::MySql(c) => sqlx::query(sql)
                .fetch_all(&mut *c)
                .await
                .map_err(map_sqlerr)?
                .iter()
                .map(decode_mysql_row)
                .collect(),
            SqlxConnection::Postgres(c) => sqlx::query(sql)
                .fetch_all(&mut *c)
                .await
                .map_err(map_sqlerr)?
                .iter()
                .map(decode_pg_row)
                .collect(),
        }
    }

    // Statement text may carry password digests; keep it out of debug logs.
    async fn execute(&mut self, sql: &str) -> Result<u64, CoreError> {
        trace!(sql, "execute");
        let affected = match self {
            SqlxConnection::MySql(c) => sqlx::query(sql)
                .execute(&mut *c)
                .await
                .map_err(map_sqlerr)?
                .rows_affected(),
            SqlxConnection::Postgres(c) => sqlx::query(sql)
                .execute(&mut *c)
                .await
                .map_err(map_sqlerr)?
                .rows_affected(),
        };
        debug!(affected, "execute done");
        Ok(affected)
    }

    async fn close(self) {
        let res = match self {
            SqlxConnection::MySql(c) => c.close().await,
            SqlxConnection::Postgres(c) => c.close().await,
        };
        if let Err(e) = res {
            warn!(err = %e, "closing connection failed");
        }
    }
}

fn decode_mysql_row(row: &MySqlRow) -> Result<Row, CoreError> {
    (0..row.len())
        .map(|i| {
            // Unsigned integer columns (e.g. `INT UNSIGNED AUTO_INCREMENT`).
            if let Ok(v) = row.try_get::<Option<u64>, _>(i) {
                return match v {
                    Some(v) => i64::try_from(v)
                        .map(SqlValue::Int)
                        .map_err(|_| CoreError::MalformedRow(format!("column {i}: {v} overflows i64"))),
                    None => Ok(SqlValue::Null),
                };
            }
            decode_value(row, i)
        })
        .collect()
}

fn decode_pg_row(row: &PgRow) -> Result<Row, CoreError> {
    (0..row.len()).map(|i| decode_value(row, i)).collect()
}

fn decode_value<R, DB>(row: &R, i: usize) -> Result<SqlValue, CoreError>
where
    DB: Database,
    R: sqlx::Row<Database = DB>,
    usize: sqlx::ColumnIndex<R>,
    i64: for<'r> Decode<'r, DB> + Type<DB>,
    i32: for<'r> Decode<'r, DB> + Type<DB>,
    i16: for<'r> Decode<'r, DB> + Type<DB>,
    f64: for<'r> Decode<'r, DB> + Type<DB>,
    f32: for<'r> Decode<'r, DB> + Type<DB>,
    bool: for<'r> Decode<'r, DB> + Type<DB>,
    String: for<'r> Decode<'r, DB> + Type<DB>,
{
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Int));
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into())));
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into())));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Float));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, |v| SqlValue::Float(v.into())));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Bool));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Text));
    }
    let col = row.column(i);
    Err(CoreError::MalformedRow(format!(
        "column '{}' has unsupported type {}",
        col.name(),
        col.type_info().name()
    )))
}
