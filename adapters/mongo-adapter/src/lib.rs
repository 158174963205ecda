//! mongo-adapter — MongoDB implementation of the `ItemStore` port.
//!
//! Purpose
//! - Store todo items as documents `{_id, item_value, category, owner_id}` in
//!   the `Items` collection of the configured database.
//! - `owner_id` is the relational id of the user, so every query is scoped by
//!   owner.
//!
//! Notes
//! - The driver connects lazily; building the store does not touch the server.
//! - An id that is not a valid ObjectId cannot match any document, so
//!   removing it is a no-op.

use std::collections::BTreeMap;

use domain::{CoreError, ItemId, ItemStore, NewItem, OwnerId, TodoItem};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Client, Collection};
use tracing::{debug, warn};

pub const ITEMS_COLLECTION: &str = "Items";

/// Where to find the document database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoSettings {
    pub host: String,
    pub port: u16,
    pub db_name: String,
}

impl MongoSettings {
    /// Read `host`, `port` and `db_name` (or `dbname`) from a config map.
    /// `port` defaults to 27017.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, CoreError> {
        let host = map
            .get("host")
            .cloned()
            .ok_or(CoreError::MissingCredential("host"))?;
        let db_name = map
            .get("db_name")
            .or_else(|| map.get("dbname"))
            .cloned()
            .ok_or(CoreError::MissingCredential("db_name"))?;
        let port = match map.get("port") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| CoreError::MissingCredential("port"))?,
            None => 27017,
        };
        Ok(Self {
            host,
            port,
            db_name,
        })
    }

    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }
}

fn map_mongoerr(e: mongodb::error::Error) -> CoreError {
    CoreError::Repository(format!("mongodb error: {e}"))
}

/// MongoDB-backed item store.
#[derive(Clone)]
pub struct MongoItemStore {
    items: Collection<Document>,
}

impl MongoItemStore {
    pub async fn connect(settings: &MongoSettings) -> Result<Self, CoreError> {
        let client = Client::with_uri_str(settings.uri())
            .await
            .map_err(|e| CoreError::Connection(format!("mongodb: {e}")))?;
        let items = client
            .database(&settings.db_name)
            .collection::<Document>(ITEMS_COLLECTION);
        debug!(uri = %settings.uri(), db = %settings.db_name, "mongo item store ready");
        Ok(Self { items })
    }
}

fn item_document(owner: OwnerId, item: &NewItem) -> Document {
    doc! {
        "item_value": item.item_value.as_str(),
        "category": item.category.as_str(),
        "owner_id": owner.get(),
    }
}

fn document_to_item(owner: OwnerId, d: &Document) -> Result<TodoItem, CoreError> {
    let id = match d.get("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return Err(CoreError::MalformedRow("document without _id".into())),
    };
    let text = |key: &str| {
        d.get_str(key)
            .map(str::to_string)
            .map_err(|e| CoreError::MalformedRow(format!("item {id}: {key}: {e}")))
    };
    Ok(TodoItem {
        item_value: text("item_value")?,
        category: text("category")?,
        id: ItemId::new(id.clone()),
        owner_id: owner,
    })
}

impl ItemStore for MongoItemStore {
    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<TodoItem>, CoreError> {
        let mut cursor = self
            .items
            .find(doc! { "owner_id": owner.get() })
            .projection(doc! { "item_value": 1, "category": 1, "_id": 1 })
            .await
            .map_err(map_mongoerr)?;
        let mut out = Vec::new();
        while cursor.advance().await.map_err(map_mongoerr)? {
            let d = cursor.deserialize_current().map_err(map_mongoerr)?;
            out.push(document_to_item(owner, &d)?);
        }
        Ok(out)
    }

    async fn insert(&self, owner: OwnerId, item: NewItem) -> Result<ItemId, CoreError> {
        let res = self
            .items
            .insert_one(item_document(owner, &item))
            .await
            .map_err(map_mongoerr)?;
        match res.inserted_id.as_object_id() {
            Some(oid) => Ok(ItemId::new(oid.to_hex())),
            None => Err(CoreError::Repository(format!(
                "unexpected inserted id {}",
                res.inserted_id
            ))),
        }
    }

    async fn remove(&self, owner: OwnerId, id: &ItemId) -> Result<bool, CoreError> {
        let oid = match ObjectId::parse_str(id.as_str()) {
            Ok(oid) => oid,
            Err(e) => {
                warn!(id = id.as_str(), err = %e, "ignoring remove of non-ObjectId id");
                return Ok(false);
            }
        };
        let res = self
            .items
            .delete_one(doc! { "_id": oid, "owner_id": owner.get() })
            .await
            .map_err(map_mongoerr)?;
        Ok(res.deleted_count > 0)
    }
}
