//! Centralized configuration for api-server.
//!
//! Settings come from an optional TOML file (`TD_CONFIG`, default `td.toml`)
//! overridden by environment variables. Everything is loaded and validated at
//! startup to fail fast on misconfiguration rather than at request time.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;

use domain::engine::EngineKind;
use serde::Deserialize;

/// Minimum length of `cookie_secret`, in bytes.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

const DEFAULT_CONFIG_FILE: &str = "td.toml";

/// Where user rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStoreKind {
    /// Relational `Users` table through the sqlx driver
    Sql,
    /// In-memory table (data lost on restart)
    Memory,
}

impl UserStoreKind {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Some(Self::Sql),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Where todo items live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStoreKind {
    /// MongoDB `Items` collection
    Mongo,
    /// SQLite file-based storage
    Sqlite,
    /// In-memory storage (data lost on restart)
    Memory,
}

impl ItemStoreKind {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" => Some(Self::Mongo),
            "sqlite" => Some(Self::Sqlite),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// A user registered at startup when absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AclSection {
    entry: Option<Vec<String>>,
}

/// Raw shape of the TOML file; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    log_format: Option<String>,
    cookie_secret: Option<String>,
    user_store: Option<String>,
    user_engine: Option<String>,
    item_store: Option<String>,
    db_path: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    #[serde(default)]
    databases: toml::Table,
    #[serde(default)]
    acl: AclSection,
    #[serde(default)]
    seed_users: Vec<SeedUser>,
}

/// Per-engine connection settings, e.g. `databases["postgres"]["host"]`.
pub type Databases = BTreeMap<String, BTreeMap<String, String>>;

/// Server configuration.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 6543)
    pub port: u16,
    /// Log format
    pub log_format: LogFormat,
    /// Secret the auth cookie signing key is derived from; a random key is
    /// generated per process when unset
    pub cookie_secret: Option<String>,
    /// User store backend (default: memory)
    pub user_store: UserStoreKind,
    /// Relational engine for the user store (default: postgres)
    pub user_engine: EngineKind,
    /// Item store backend (default: sqlite when compiled in, else memory)
    pub item_store: ItemStoreKind,
    /// SQLite database path for the sqlite item store
    pub db_path: PathBuf,
    /// Directory holding `base.html`, `login.html` and assets
    pub static_dir: PathBuf,
    /// Connection settings per engine from the `[databases]` section
    pub databases: Databases,
    /// Groups granted the `entry` permission
    pub entry_groups: Vec<String>,
    /// Users registered at startup when absent
    pub seed_users: Vec<SeedUser>,
}

impl Config {
    /// Load the config file named by `TD_CONFIG` (if any) and apply
    /// environment overrides.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        let (path, explicit) = match env::var("TD_CONFIG") {
            Ok(p) => (PathBuf::from(p), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => Some(t),
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ConfigError::new(
                    "TD_CONFIG",
                    format!("cannot read {}: {}", path.display(), e),
                ))
            }
        };
        Self::from_sources(text.as_deref(), |key| env::var(key).ok())
    }

    /// Build a config from file contents and an environment lookup.
    pub fn from_sources<F>(file: Option<&str>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match file {
            Some(text) => toml::from_str(text)
                .map_err(|e| ConfigError::new("TD_CONFIG", format!("invalid TOML: {}", e)))?,
            None => FileConfig::default(),
        };

        // Port
        let port = match lookup("PORT") {
            Some(s) => s
                .parse()
                .map_err(|_| ConfigError::new("PORT", format!("not a port number: '{}'", s)))?,
            None => file.port.unwrap_or(6543),
        };

        // Log format
        let log_format = LogFormat::from_str(
            &lookup("LOG_FORMAT")
                .or(file.log_format)
                .unwrap_or_else(|| "pretty".into()),
        );

        // Cookie secret
        let cookie_secret = lookup("TD_COOKIE_SECRET").or(file.cookie_secret);
        if let Some(secret) = &cookie_secret {
            if secret.len() < MIN_COOKIE_SECRET_LEN {
                return Err(ConfigError::new(
                    "TD_COOKIE_SECRET",
                    format!("must be at least {} bytes", MIN_COOKIE_SECRET_LEN),
                ));
            }
        }

        // Stores
        let user_store_raw = lookup("USER_STORE")
            .or(file.user_store)
            .unwrap_or_else(|| "memory".into());
        let user_store = UserStoreKind::parse(&user_store_raw).ok_or_else(|| {
            ConfigError::new(
                "USER_STORE",
                format!("unknown store '{}': use 'sql' or 'memory'", user_store_raw),
            )
        })?;

        let engine_raw = lookup("USER_ENGINE")
            .or(file.user_engine)
            .unwrap_or_else(|| "postgres".into());
        let user_engine = EngineKind::parse(&engine_raw)
            .map_err(|e| ConfigError::new("USER_ENGINE", e.to_string()))?;

        let item_store_raw = lookup("ITEM_STORE")
            .or(file.item_store)
            .unwrap_or_else(|| default_item_store().into());
        let item_store = ItemStoreKind::parse(&item_store_raw).ok_or_else(|| {
            ConfigError::new(
                "ITEM_STORE",
                format!(
                    "unknown store '{}': use 'mongo', 'sqlite' or 'memory'",
                    item_store_raw
                ),
            )
        })?;

        let db_path = lookup("DB_PATH")
            .map(PathBuf::from)
            .or(file.db_path)
            .unwrap_or_else(|| PathBuf::from("./data/items.db"));
        let static_dir = lookup("STATIC_DIR")
            .map(PathBuf::from)
            .or(file.static_dir)
            .unwrap_or_else(|| PathBuf::from("static"));

        let databases = scan_databases(&file.databases)?;

        let entry_groups = file
            .acl
            .entry
            .unwrap_or_else(|| vec!["users".into(), "admins".into()]);

        for seed in &file.seed_users {
            domain::validate::validate_username(&seed.username)
                .map_err(|e| ConfigError::new("seed_users", e.to_string()))?;
        }

        Ok(Self {
            port,
            log_format,
            cookie_secret,
            user_store,
            user_engine,
            item_store,
            db_path,
            static_dir,
            databases,
            entry_groups,
            seed_users: file.seed_users,
        })
    }

    /// Settings for one engine from the `[databases]` section.
    pub fn database(&self, engine: &str) -> Result<&BTreeMap<String, String>, ConfigError> {
        self.databases.get(engine).ok_or_else(|| {
            ConfigError::new(
                "databases",
                format!("no [databases.{}] settings configured", engine),
            )
        })
    }

    /// Log warnings about insecure or volatile configuration.
    pub fn warn_if_insecure(&self) {
        if self.cookie_secret.is_none() {
            tracing::warn!(
                "TD_COOKIE_SECRET not set: using a random per-process signing key. \
                 Sessions will not survive a restart."
            );
        }
        if self.user_store == UserStoreKind::Memory {
            tracing::warn!("USER_STORE=memory: users are lost on restart.");
        }
        if self.item_store == ItemStoreKind::Memory {
            tracing::warn!("ITEM_STORE=memory: todo items are lost on restart.");
        }
    }
}

fn default_item_store() -> &'static str {
    if cfg!(feature = "sqlite") {
        "sqlite"
    } else {
        "memory"
    }
}

/// Flatten the `[databases]` table into `engine -> {key -> value}`.
///
/// Nested tables (`[databases.postgres]`), dotted keys (`postgres.host = ..`)
/// and flat quoted keys (`"postgres.host" = ..`) all land in the same map.
fn scan_databases(table: &toml::Table) -> Result<Databases, ConfigError> {
    let mut flat = Vec::new();
    flatten("", table, &mut flat)?;

    let mut out = Databases::new();
    for (path, value) in flat {
        let Some((engine, key)) = path.split_once('.') else {
            return Err(ConfigError::new(
                "databases",
                format!("key '{}' is not of the form <engine>.<key>", path),
            ));
        };
        out.entry(engine.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
    Ok(out)
}

fn flatten(
    prefix: &str,
    table: &toml::Table,
    out: &mut Vec<(String, String)>,
) -> Result<(), ConfigError> {
    for (k, v) in table {
        let path = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{}.{}", prefix, k)
        };
        match v {
            toml::Value::Table(t) => flatten(&path, t, out)?,
            toml::Value::String(s) => out.push((path, s.clone())),
            toml::Value::Integer(i) => out.push((path, i.to_string())),
            other => {
                return Err(ConfigError::new(
                    "databases",
                    format!("unsupported value for '{}': {}", path, other.type_str()),
                ))
            }
        }
    }
    Ok(())
}
