//! Engine-agnostic row access over the MySQL and Postgres dialects.
//!
//! Every data-access call re-validates the engine tag, opens a fresh
//! connection through the `SqlDriver` port, runs one statement and closes the
//! connection before returning, whatever the outcome of the statement.

use crate::engine::{quote_literal, EngineKind};
use crate::{
    CoreError, Credentials, OwnerId, Row, SqlConnection, SqlDriver, SqlValue, User, UserDirectory,
};

/// Table holding user rows.
pub const USERS_TABLE: &str = "Users";

/// Comma-separated group names. `GROUPS` is reserved in MySQL 8, so the
/// column is always emitted through `Dialect::column_ident`.
pub const GROUPS_COLUMN: &str = "groups";

/// Two-dialect connector with one connection per call.
pub struct Connector<D> {
    engine: String,
    credentials: Credentials,
    driver: D,
}

impl<D: SqlDriver> Connector<D> {
    /// Create a connector for `engine` (`"mysql"` or `"postgres"`).
    pub fn new<S: Into<String>>(
        engine: S,
        credentials: Credentials,
        driver: D,
    ) -> Result<Self, CoreError> {
        let engine = engine.into();
        EngineKind::parse(&engine)?;
        Ok(Self {
            engine,
            credentials,
            driver,
        })
    }

    pub fn engine_tag(&self) -> &str {
        &self.engine
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn engine(&self) -> Result<EngineKind, CoreError> {
        EngineKind::parse(&self.engine)
    }

    /// First row matching `predicate`, or `None`.
    ///
    /// `columns` and `predicate` are SQL fragments passed through verbatim.
    pub async fn select_one(
        &self,
        columns: &str,
        table: &str,
        predicate: Option<&str>,
    ) -> Result<Option<Row>, CoreError> {
        let engine = self.engine()?;
        let sql = engine.dialect().select(columns, table, predicate);
        let mut conn = self.driver.connect(engine, &self.credentials).await?;
        let out = conn.fetch_optional(&sql).await;
        conn.close().await;
        out
    }

    /// All rows matching `predicate`; an empty table yields an empty vector.
    pub async fn select_all(
        &self,
        columns: &str,
        table: &str,
        predicate: Option<&str>,
    ) -> Result<Vec<Row>, CoreError> {
        let engine = self.engine()?;
        let sql = engine.dialect().select(columns, table, predicate);
        let mut conn = self.driver.connect(engine, &self.credentials).await?;
        let out = conn.fetch_all(&sql).await;
        conn.close().await;
        out
    }

    /// Insert one row. `values` is a comma-joined literal list matching `columns`.
    pub async fn insert(&self, table: &str, columns: &str, values: &str) -> Result<(), CoreError> {
        let engine = self.engine()?;
        let sql = engine.dialect().insert(table, columns, values);
        let mut conn = self.driver.connect(engine, &self.credentials).await?;
        let out = conn.execute(&sql).await;
        conn.close().await;
        out.map(|_| ())
    }
}

fn row_to_user(row: Row) -> Result<User, CoreError> {
    let mut it = row.into_iter();
    let id = match it.next() {
        Some(SqlValue::Int(id)) => id,
        other => return Err(CoreError::MalformedRow(format!("id column: {:?}", other))),
    };
    let username = match it.next() {
        Some(SqlValue::Text(s)) => s,
        other => {
            return Err(CoreError::MalformedRow(format!(
                "username column: {:?}",
                other
            )))
        }
    };
    let password_hash = match it.next() {
        Some(SqlValue::Text(s)) => s,
        other => {
            return Err(CoreError::MalformedRow(format!(
                "password column: {:?}",
                other
            )))
        }
    };
    let groups = match it.next() {
        Some(SqlValue::Text(s)) => User::parse_groups(&s),
        Some(SqlValue::Null) | None => Vec::new(),
        Some(other) => {
            return Err(CoreError::MalformedRow(format!(
                "groups column: {:?}",
                other
            )))
        }
    };
    Ok(User {
        id: OwnerId::new(id),
        username,
        password_hash,
        groups,
    })
}

impl<D: SqlDriver> UserDirectory for Connector<D> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, CoreError> {
        let groups = self.engine()?.dialect().column_ident(GROUPS_COLUMN);
        let columns = format!("id, username, password, {}", groups);
        let predicate = format!("username={}", quote_literal(username));
        let row = self
            .select_one(&columns, USERS_TABLE, Some(predicate.as_str()))
            .await?;
        row.map(row_to_user).transpose()
    }

    async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        groups: &[String],
    ) -> Result<(), CoreError> {
        let values = format!(
            "{}, {}, {}",
            quote_literal(username),
            quote_literal(password_hash),
            quote_literal(&groups.join(","))
        );
        let columns = format!(
            "username, password, {}",
            self.engine()?.dialect().column_ident(GROUPS_COLUMN)
        );
        self.insert(USERS_TABLE, &columns, &values).await
    }
}
