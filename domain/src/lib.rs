//! Domain library for the td to-do list service.
//!
//! This crate is dependency-free apart from `serde` derives and holds the
//! domain types, ports (traits), the two-dialect `Connector` and error
//! definitions. Keep drivers and IO concerns out of this crate.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

use serde::{Deserialize, Serialize};

/// Relational id of a user; partitions document-store items by owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(i64);

impl OwnerId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-generated identifier of a todo item.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A row of the `Users` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: OwnerId,
    pub username: String,
    /// Password digest as produced by a `PasswordHasher`.
    pub password_hash: String,
    pub groups: Vec<String>,
}

impl User {
    /// Split the comma-separated `groups` column into role names.
    pub fn parse_groups(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Input data for creating a new todo item.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NewItem {
    pub item_value: String,
    pub category: String,
}

/// Stored todo item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TodoItem {
    pub item_value: String,
    pub category: String,
    pub id: ItemId,
    #[serde(skip_serializing)]
    pub owner_id: OwnerId,
}

/// Connection parameters for one relational engine.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub port: Option<u16>,
}

impl Credentials {
    /// Build credentials from a per-engine config map (`host`, `user`,
    /// `password`, `dbname` or `db_name`, optional `port`).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, CoreError> {
        let field = |key: &'static str| {
            map.get(key)
                .cloned()
                .ok_or(CoreError::MissingCredential(key))
        };
        let dbname = map
            .get("dbname")
            .or_else(|| map.get("db_name"))
            .cloned()
            .ok_or(CoreError::MissingCredential("dbname"))?;
        let port = match map.get("port") {
            Some(p) => Some(
                p.parse::<u16>()
                    .map_err(|_| CoreError::MissingCredential("port"))?,
            ),
            None => None,
        };
        Ok(Self {
            host: field("host")?,
            user: field("user")?,
            password: field("password")?,
            dbname,
            port,
        })
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .field("port", &self.port)
            .finish()
    }
}

/// A single column value returned by a relational query.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered column values of one result row, in projection order.
pub type Row = Vec<SqlValue>;

/// Driver port: opens one connection to the given engine.
///
/// The `Connector` opens a fresh connection for every call and closes it
/// before returning; implementations must not pool behind this trait.
pub trait SqlDriver: Send + Sync {
    type Conn: SqlConnection + Send;

    fn connect(
        &self,
        engine: engine::EngineKind,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Conn, CoreError>> + Send;
}

/// One open relational connection. Statements run in autocommit mode.
pub trait SqlConnection {
    fn fetch_optional(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<Option<Row>, CoreError>> + Send;

    fn fetch_all(&mut self, sql: &str) -> impl Future<Output = Result<Vec<Row>, CoreError>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<u64, CoreError>> + Send;

    /// Release the underlying handle. Failures are logged by the driver, not returned.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Repository port for user rows.
pub trait UserDirectory: Send + Sync {
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, CoreError>> + Send;

    fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        groups: &[String],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Repository port for todo items (document store).
pub trait ItemStore: Send + Sync {
    /// All items owned by `owner`, in insertion order where the store keeps one.
    fn list_by_owner(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Vec<TodoItem>, CoreError>> + Send;

    fn insert(
        &self,
        owner: OwnerId,
        item: NewItem,
    ) -> impl Future<Output = Result<ItemId, CoreError>> + Send;

    /// Delete one item of `owner`. Returns `false` when nothing matched.
    fn remove(
        &self,
        owner: OwnerId,
        id: &ItemId,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;
}

/// One-way salted password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, CoreError>;
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, CoreError>;
}

/// Core domain errors (no external error crates to keep deps minimal).
#[derive(Debug)]
pub enum CoreError {
    UnsupportedEngine(String),
    MissingCredential(&'static str),
    InvalidItem(String),
    InvalidUsername(String),
    AlreadyExists,
    MalformedRow(String),
    Connection(String),
    Repository(String),
    Hashing(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::UnsupportedEngine(tag) => write!(
                f,
                "unsupported engine '{}': use 'mysql' or 'postgres'",
                tag
            ),
            CoreError::MissingCredential(key) => write!(f, "missing credential: {}", key),
            CoreError::InvalidItem(msg) => write!(f, "invalid item: {}", msg),
            CoreError::InvalidUsername(msg) => write!(f, "invalid username: {}", msg),
            CoreError::AlreadyExists => write!(f, "resource already exists"),
            CoreError::MalformedRow(msg) => write!(f, "malformed row: {}", msg),
            CoreError::Connection(msg) => write!(f, "connection error: {}", msg),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
            CoreError::Hashing(msg) => write!(f, "password hashing error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - td domain library", pkg, ver)
}

pub mod acl;
pub mod adapters;
pub mod connector;
pub mod engine;
pub mod service;
pub mod validate;
