use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{CoreError, ItemId, ItemStore, NewItem, OwnerId, TodoItem};

#[derive(Default)]
struct Inner {
    items: BTreeMap<ItemId, TodoItem>,
    next_id: u64,
}

/// Simple in-memory item store. Not thread-safe for high concurrency beyond
/// the internal mutex guarding the map.
///
/// Ids are 24 hex digits so they look like the document store's ObjectIds
/// and sort in insertion order.
#[derive(Default)]
pub struct InMemoryItemStore {
    inner: Mutex<Inner>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(n: u64) -> ItemId {
        ItemId::new(format!("{:024x}", n))
    }
}

impl ItemStore for InMemoryItemStore {
    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<TodoItem>, CoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(inner
            .items
            .values()
            .filter(|i| i.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn insert(&self, owner: OwnerId, item: NewItem) -> Result<ItemId, CoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        inner.next_id += 1;
        let id = Self::key(inner.next_id);
        inner.items.insert(
            id.clone(),
            TodoItem {
                item_value: item.item_value,
                category: item.category,
                id: id.clone(),
                owner_id: owner,
            },
        );
        Ok(id)
    }

    async fn remove(&self, owner: OwnerId, id: &ItemId) -> Result<bool, CoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let owned = inner
            .items
            .get(id)
            .is_some_and(|item| item.owner_id == owner);
        if owned {
            inner.items.remove(id);
        }
        Ok(owned)
    }
}
