//! sqlite-adapter — SQLite implementation of the ItemStore port for local/dev.
//!
//! Purpose
//! - Provide a lightweight, file-based item store to run the app locally
//!   without a document database.
//! - Implements the `ItemStore` trait from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Item ids are the decimal rowid; an id that does not parse as an integer
//!   matches nothing.

use std::path::Path;
use std::sync::Mutex;

use domain::{CoreError, ItemId, ItemStore, NewItem, OwnerId, TodoItem};
use rusqlite::{params, Connection};

/// SQLite-backed item store for local development.
pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Like `new`, creating missing parent directories first.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| CoreError::Repository(format!("create {}: {e}", dir.display())))?;
        }
        Self::new(path)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_value TEXT NOT NULL,
            category TEXT NOT NULL,
            owner_id INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id);
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

impl ItemStore for SqliteItemStore {
    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<TodoItem>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, item_value, category FROM items WHERE owner_id = ?1 ORDER BY id")
            .map_err(map_sqerr)?;
        let rows = stmt
            .query_map(params![owner.get()], |row| {
                Ok(TodoItem {
                    id: ItemId::new(row.get::<_, i64>(0)?.to_string()),
                    item_value: row.get(1)?,
                    category: row.get(2)?,
                    owner_id: owner,
                })
            })
            .map_err(map_sqerr)?;
        let items = rows.collect::<Result<Vec<_>, _>>().map_err(map_sqerr)?;
        Ok(items)
    }

    async fn insert(&self, owner: OwnerId, item: NewItem) -> Result<ItemId, CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO items(item_value, category, owner_id) VALUES (?1, ?2, ?3)",
            params![item.item_value, item.category, owner.get()],
        )
        .map_err(map_sqerr)?;
        Ok(ItemId::new(conn.last_insert_rowid().to_string()))
    }

    async fn remove(&self, owner: OwnerId, id: &ItemId) -> Result<bool, CoreError> {
        let Ok(rowid) = id.as_str().parse::<i64>() else {
            return Ok(false);
        };
        let conn = self.lock()?;
        let n = conn
            .execute(
                "DELETE FROM items WHERE id = ?1 AND owner_id = ?2",
                params![rowid, owner.get()],
            )
            .map_err(map_sqerr)?;
        Ok(n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_db() -> (SqliteItemStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let store = SqliteItemStore::new(path).unwrap();
        (store, dir)
    }

    fn item(value: &str, category: &str) -> NewItem {
        NewItem {
            item_value: value.into(),
            category: category.into(),
        }
    }

    #[tokio::test]
    async fn insert_list_roundtrip() {
        let (store, _dir) = tmp_db();
        let owner = OwnerId::new(7);
        let a = store.insert(owner, item("eat", "red")).await.unwrap();
        let b = store.insert(owner, item("sleep", "blue")).await.unwrap();
        assert_ne!(a, b);

        let items = store.list_by_owner(owner).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, a);
        assert_eq!(items[0].item_value, "eat");
        assert_eq!(items[1].category, "blue");
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let (store, _dir) = tmp_db();
        let id = store.insert(OwnerId::new(1), item("mine", "a")).await.unwrap();
        assert!(store.list_by_owner(OwnerId::new(2)).await.unwrap().is_empty());
        // Another owner cannot delete it.
        assert!(!store.remove(OwnerId::new(2), &id).await.unwrap());
        assert_eq!(store.list_by_owner(OwnerId::new(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_missing_or_garbage_id_is_noop() {
        let (store, _dir) = tmp_db();
        let owner = OwnerId::new(3);
        let id = store.insert(owner, item("x", "y")).await.unwrap();
        assert!(store.remove(owner, &id).await.unwrap());
        assert!(!store.remove(owner, &id).await.unwrap());
        assert!(!store
            .remove(owner, &ItemId::new("5f1d7f3e9c1b2a3d4e5f6a7b"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("items.db");
        {
            let store = SqliteItemStore::open_creating_dirs(&path).unwrap();
            store.insert(OwnerId::new(1), item("keep", "k")).await.unwrap();
        }
        let store = SqliteItemStore::new(&path).unwrap();
        let items = store.list_by_owner(OwnerId::new(1)).await.unwrap();
        assert_eq!(items[0].item_value, "keep");
    }
}
