use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    db::WardrobeStore,
    error::AppResult,
    models::{EmbeddedItem, Embedding, Item, ItemFilter, ItemId, ItemMetadata, NewItem},
};

/// In-process wardrobe store for tests and local runs
#[derive(Clone, Default)]
pub struct MemoryWardrobeStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    items: BTreeMap<ItemId, Item>,
    embeddings: HashMap<ItemId, Embedding>,
    last_id: ItemId,
}

impl MemoryWardrobeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current embedding of an item regardless of owner
    pub async fn embedding(&self, item_id: ItemId) -> Option<Embedding> {
        self.inner.read().await.embeddings.get(&item_id).cloned()
    }
}

#[async_trait::async_trait]
impl WardrobeStore for MemoryWardrobeStore {
    async fn list_embedded_items(&self, owner_id: &str) -> AppResult<Vec<EmbeddedItem>> {
        let inner = self.inner.read().await;
        let items = inner
            .items
            .values()
            .filter(|item| item.owner_id == owner_id)
            .filter_map(|item| {
                inner.embeddings.get(&item.id).map(|embedding| EmbeddedItem {
                    item: item.clone(),
                    embedding: embedding.clone(),
                })
            })
            .collect();
        Ok(items)
    }

    async fn list_items(&self, owner_id: &str, filter: &ItemFilter) -> AppResult<Vec<Item>> {
        let inner = self.inner.read().await;
        Ok(inner
            .items
            .values()
            .filter(|item| item.owner_id == owner_id && filter.matches(item))
            .cloned()
            .collect())
    }

    async fn get_item(&self, owner_id: &str, item_id: ItemId) -> AppResult<Option<Item>> {
        let inner = self.inner.read().await;
        Ok(inner
            .items
            .get(&item_id)
            .filter(|item| item.owner_id == owner_id)
            .cloned())
    }

    async fn create_item(&self, owner_id: &str, item: NewItem) -> AppResult<Item> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let created = Item {
            id: inner.last_id,
            owner_id: owner_id.to_string(),
            category: item.category,
            tags: item.tags,
            metadata: item.metadata,
            updated_at: Utc::now(),
        };
        inner.items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_item(
        &self,
        owner_id: &str,
        item_id: ItemId,
        tags: Vec<String>,
        metadata: ItemMetadata,
    ) -> AppResult<Option<Item>> {
        let mut inner = self.inner.write().await;
        let Some(item) = inner
            .items
            .get_mut(&item_id)
            .filter(|item| item.owner_id == owner_id)
        else {
            return Ok(None);
        };
        item.tags = tags;
        item.metadata = metadata;
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, owner_id: &str, item_id: ItemId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let owned = inner
            .items
            .get(&item_id)
            .is_some_and(|item| item.owner_id == owner_id);
        if !owned {
            return Ok(false);
        }
        inner.items.remove(&item_id);
        inner.embeddings.remove(&item_id);
        Ok(true)
    }

    async fn put_embedding(&self, embedding: Embedding) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.items.contains_key(&embedding.item_id) {
            inner.embeddings.insert(embedding.item_id, embedding);
        }
        Ok(())
    }
}
