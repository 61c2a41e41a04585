use crate::{
    error::AppResult,
    models::{EmbeddedItem, Embedding, Item, ItemFilter, ItemId, ItemMetadata, NewItem},
};

/// Storage and query layer for the wardrobe inventory
///
/// All reads are scoped to an owner; an item owned by someone else behaves as if
/// it did not exist.
#[async_trait::async_trait]
pub trait WardrobeStore: Send + Sync {
    /// Every item of the owner that currently has an embedding, ordered by id
    async fn list_embedded_items(&self, owner_id: &str) -> AppResult<Vec<EmbeddedItem>>;

    /// Items of the owner matching the filter, ordered by id
    async fn list_items(&self, owner_id: &str, filter: &ItemFilter) -> AppResult<Vec<Item>>;

    async fn get_item(&self, owner_id: &str, item_id: ItemId) -> AppResult<Option<Item>>;

    async fn create_item(&self, owner_id: &str, item: NewItem) -> AppResult<Item>;

    /// Replaces tags and metadata, `None` if the item does not exist
    async fn update_item(
        &self,
        owner_id: &str,
        item_id: ItemId,
        tags: Vec<String>,
        metadata: ItemMetadata,
    ) -> AppResult<Option<Item>>;

    /// Removes an item together with its embedding, `false` if it did not exist
    async fn delete_item(&self, owner_id: &str, item_id: ItemId) -> AppResult<bool>;

    /// Stores the embedding, replacing any previous one for the same item.
    /// Embeddings for items that no longer exist are discarded.
    async fn put_embedding(&self, embedding: Embedding) -> AppResult<()>;
}
