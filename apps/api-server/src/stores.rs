//! Backend selection: config and feature flags decide which adapter serves
//! each port. Dispatch is a plain enum match per call.

use std::net::SocketAddr;

use domain::adapters::memory_repo::InMemoryItemStore;
use domain::adapters::memory_sql::MemorySqlDriver;
use domain::connector::{Connector, GROUPS_COLUMN, USERS_TABLE};
use domain::engine::EngineKind;
use domain::{CoreError, Credentials, ItemId, ItemStore, NewItem, OwnerId, TodoItem, User, UserDirectory};
use tracing::info;

use crate::config::{Config, ConfigError, ItemStoreKind, UserStoreKind};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Store(#[from] CoreError),
    #[error("backend '{0}' is not compiled in; rebuild with `--features {0}`")]
    FeatureDisabled(&'static str),
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

// User rows: an in-memory table or a real MySQL/Postgres server.
pub enum AnyUsers {
    Memory(Connector<MemorySqlDriver>),
    #[cfg(feature = "sql")]
    Sql(Connector<sql_adapter::SqlxDriver>),
}

impl AnyUsers {
    /// In-memory `Users` table speaking the given engine's dialect.
    pub fn memory(engine: EngineKind) -> Result<Self, CoreError> {
        let driver = MemorySqlDriver::new();
        driver.create_table(USERS_TABLE, &["id", "username", "password", GROUPS_COLUMN]);
        let creds = Credentials {
            host: "memory".into(),
            user: "td".into(),
            password: String::new(),
            dbname: "td".into(),
            port: None,
        };
        Ok(Self::Memory(Connector::new(engine.as_str(), creds, driver)?))
    }
}

impl UserDirectory for AnyUsers {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, CoreError> {
        match self {
            AnyUsers::Memory(c) => c.find_by_username(username).await,
            #[cfg(feature = "sql")]
            AnyUsers::Sql(c) => c.find_by_username(username).await,
        }
    }

    async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        groups: &[String],
    ) -> Result<(), CoreError> {
        match self {
            AnyUsers::Memory(c) => c.insert_user(username, password_hash, groups).await,
            #[cfg(feature = "sql")]
            AnyUsers::Sql(c) => c.insert_user(username, password_hash, groups).await,
        }
    }
}

// Todo items: memory, a SQLite file or MongoDB.
pub enum AnyItems {
    Memory(InMemoryItemStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteItemStore),
    #[cfg(feature = "mongo")]
    Mongo(mongo_adapter::MongoItemStore),
}

impl ItemStore for AnyItems {
    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<TodoItem>, CoreError> {
        match self {
            AnyItems::Memory(s) => s.list_by_owner(owner).await,
            #[cfg(feature = "sqlite")]
            AnyItems::Sqlite(s) => s.list_by_owner(owner).await,
            #[cfg(feature = "mongo")]
            AnyItems::Mongo(s) => s.list_by_owner(owner).await,
        }
    }

    async fn insert(&self, owner: OwnerId, item: NewItem) -> Result<ItemId, CoreError> {
        match self {
            AnyItems::Memory(s) => s.insert(owner, item).await,
            #[cfg(feature = "sqlite")]
            AnyItems::Sqlite(s) => s.insert(owner, item).await,
            #[cfg(feature = "mongo")]
            AnyItems::Mongo(s) => s.insert(owner, item).await,
        }
    }

    async fn remove(&self, owner: OwnerId, id: &ItemId) -> Result<bool, CoreError> {
        match self {
            AnyItems::Memory(s) => s.remove(owner, id).await,
            #[cfg(feature = "sqlite")]
            AnyItems::Sqlite(s) => s.remove(owner, id).await,
            #[cfg(feature = "mongo")]
            AnyItems::Mongo(s) => s.remove(owner, id).await,
        }
    }
}

/// Construct the user store based on config and feature flags.
pub fn build_users(cfg: &Config) -> Result<AnyUsers, StartupError> {
    match cfg.user_store {
        UserStoreKind::Memory => {
            info!(engine = %cfg.user_engine, "user store: memory");
            Ok(AnyUsers::memory(cfg.user_engine)?)
        }
        UserStoreKind::Sql => sql_users(cfg),
    }
}

#[cfg(feature = "sql")]
fn sql_users(cfg: &Config) -> Result<AnyUsers, StartupError> {
    let tag = cfg.user_engine.as_str();
    let creds = Credentials::from_map(cfg.database(tag)?)?;
    info!(engine = tag, host = %creds.host, db = %creds.dbname, "user store: sql");
    Ok(AnyUsers::Sql(Connector::new(
        tag,
        creds,
        sql_adapter::SqlxDriver::new(),
    )?))
}

#[cfg(not(feature = "sql"))]
fn sql_users(_cfg: &Config) -> Result<AnyUsers, StartupError> {
    Err(StartupError::FeatureDisabled("sql"))
}

/// Construct the item store based on config and feature flags.
pub async fn build_items(cfg: &Config) -> Result<AnyItems, StartupError> {
    match cfg.item_store {
        ItemStoreKind::Memory => {
            info!("item store: memory");
            Ok(AnyItems::Memory(InMemoryItemStore::new()))
        }
        ItemStoreKind::Sqlite => sqlite_items(cfg),
        ItemStoreKind::Mongo => mongo_items(cfg).await,
    }
}

#[cfg(feature = "sqlite")]
fn sqlite_items(cfg: &Config) -> Result<AnyItems, StartupError> {
    info!(path = %cfg.db_path.display(), "item store: sqlite");
    let store = sqlite_adapter::SqliteItemStore::open_creating_dirs(&cfg.db_path)?;
    Ok(AnyItems::Sqlite(store))
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_items(_cfg: &Config) -> Result<AnyItems, StartupError> {
    Err(StartupError::FeatureDisabled("sqlite"))
}

#[cfg(feature = "mongo")]
async fn mongo_items(cfg: &Config) -> Result<AnyItems, StartupError> {
    let settings = mongo_adapter::MongoSettings::from_map(cfg.database("mongo")?)?;
    info!(uri = %settings.uri(), db = %settings.db_name, "item store: mongo");
    let store = mongo_adapter::MongoItemStore::connect(&settings).await?;
    Ok(AnyItems::Mongo(store))
}

#[cfg(not(feature = "mongo"))]
async fn mongo_items(_cfg: &Config) -> Result<AnyItems, StartupError> {
    Err(StartupError::FeatureDisabled("mongo"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(text: &str) -> Config {
        Config::from_sources(Some(text), |_| None).unwrap()
    }

    #[tokio::test]
    async fn memory_backends_from_config() {
        let c = cfg("user_store = \"memory\"\nitem_store = \"memory\"\n");
        let users = build_users(&c).unwrap();
        users.insert_user("alice", "h", &["users".into()]).await.unwrap();
        let alice = users.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(alice.groups, vec!["users".to_string()]);

        let items = build_items(&c).await.unwrap();
        items
            .insert(
                alice.id,
                NewItem {
                    item_value: "eat".into(),
                    category: "red".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(items.list_by_owner(alice.id).await.unwrap().len(), 1);
    }

    #[test]
    fn sql_users_need_database_section() {
        let c = cfg("user_store = \"sql\"\nuser_engine = \"mysql\"\n");
        let err = match build_users(&c) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        if cfg!(feature = "sql") {
            assert!(matches!(err, StartupError::Config(ref e) if e.field == "databases"));
        } else {
            assert!(matches!(err, StartupError::FeatureDisabled("sql")));
        }
    }

    #[cfg(feature = "sql")]
    #[test]
    fn sql_users_report_missing_credential() {
        let c = cfg("user_store = \"sql\"\n[databases.postgres]\nhost = \"localhost\"\n");
        let err = match build_users(&c) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            StartupError::Store(CoreError::MissingCredential(_))
        ));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn sqlite_items_create_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("items.db");
        let mut c = cfg("item_store = \"sqlite\"\n");
        c.db_path = path.clone();
        let items = build_items(&c).await.unwrap();
        assert!(matches!(items, AnyItems::Sqlite(_)));
        assert!(path.exists());
    }
}
