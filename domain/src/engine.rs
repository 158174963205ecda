//! Relational engines and their SQL dialects.
//!
//! Statement text is assembled from caller-provided fragments without
//! parameter binding. Dialects differ only in how identifiers are quoted.

use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use crate::CoreError;

/// Supported relational engines, selected by a string tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineKind {
    MySql,
    Postgres,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::MySql => "mysql",
            EngineKind::Postgres => "postgres",
        }
    }

    /// Resolve an engine tag. Matching is exact: `"MySQL"` is not a tag.
    pub fn parse(tag: &str) -> Result<Self, CoreError> {
        match tag {
            "mysql" => Ok(EngineKind::MySql),
            "postgres" => Ok(EngineKind::Postgres),
            other => Err(CoreError::UnsupportedEngine(other.to_string())),
        }
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            EngineKind::MySql => &MySqlDialect,
            EngineKind::Postgres => &PostgresDialect,
        }
    }
}

impl Display for EngineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-engine statement builder.
pub trait Dialect: Send + Sync {
    fn table_ident<'a>(&self, table: &'a str) -> Cow<'a, str>;

    /// Quoted column name, for columns that collide with reserved words.
    fn column_ident(&self, column: &str) -> String;

    fn select(&self, columns: &str, table: &str, predicate: Option<&str>) -> String {
        let table = self.table_ident(table);
        match predicate {
            Some(pred) => format!("SELECT {} FROM {} WHERE {}", columns, table, pred),
            None => format!("SELECT {} FROM {}", columns, table),
        }
    }

    fn insert(&self, table: &str, columns: &str, values: &str) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_ident(table),
            columns,
            values
        )
    }
}

/// MySQL: bare table identifiers, backtick-quoted columns.
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn table_ident<'a>(&self, table: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(table)
    }

    fn column_ident(&self, column: &str) -> String {
        format!("`{}`", column)
    }
}

/// Postgres: double-quoted table identifiers (`"Users"` keeps its case).
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn table_ident<'a>(&self, table: &'a str) -> Cow<'a, str> {
        Cow::Owned(format!("\"{}\"", table))
    }

    fn column_ident(&self, column: &str) -> String {
        format!("\"{}\"", column)
    }
}

/// Render `s` as a single-quoted SQL string literal, doubling embedded quotes.
///
/// The connector passes fragments through verbatim, so callers that build
/// predicates or value lists from user input must go through this.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
