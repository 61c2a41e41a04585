use std::sync::Arc;

use crate::{
    db::WardrobeStore,
    error::{AppError, AppResult},
    models::{
        is_derived_tag, merge_tags, Category, Item, ItemFilter, ItemId, ItemMetadata, NewItem,
        VisionDescription,
    },
    services::embedding::{EmbeddingJob, EmbeddingQueue},
};

/// Item writes that keep embeddings in step with item descriptions
///
/// Every successful write enqueues an embedding job after the store has
/// committed. Callers never wait for the job.
#[derive(Clone)]
pub struct Inventory {
    store: Arc<dyn WardrobeStore>,
    queue: EmbeddingQueue,
}

impl Inventory {
    pub fn new(store: Arc<dyn WardrobeStore>, queue: EmbeddingQueue) -> Self {
        Self { store, queue }
    }

    /// Registers an item, folding the vision provider's description into its
    /// metadata and tags
    pub async fn register_item(
        &self,
        owner_id: &str,
        category: Category,
        tags: Vec<String>,
        vision: Option<VisionDescription>,
    ) -> AppResult<Item> {
        let (metadata, mut extras) = match vision {
            Some(description) => description.into_parts(),
            None => (ItemMetadata::default(), Vec::new()),
        };
        extras.extend(metadata.derived_tags());
        let tags = merge_tags(tags, extras);

        let item = self
            .store
            .create_item(
                owner_id,
                NewItem {
                    category,
                    tags,
                    metadata,
                },
            )
            .await?;

        tracing::info!(item_id = item.id, owner_id, category = %item.category, "Item registered");
        self.queue.enqueue(EmbeddingJob::for_item(&item));
        Ok(item)
    }

    /// Replaces an item's tags and metadata. The category cannot change.
    ///
    /// Metadata tags are regenerated, so stale `season:`/`style:`/`color:`
    /// tags sent back by the client are dropped.
    pub async fn revise_item(
        &self,
        owner_id: &str,
        item_id: ItemId,
        tags: Vec<String>,
        mut metadata: ItemMetadata,
    ) -> AppResult<Item> {
        metadata.normalize();
        let user_tags = tags.into_iter().filter(|tag| !is_derived_tag(tag)).collect();
        let tags = merge_tags(user_tags, metadata.derived_tags());

        let item = self
            .store
            .update_item(owner_id, item_id, tags, metadata)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

        tracing::info!(item_id, owner_id, "Item revised");
        self.queue.enqueue(EmbeddingJob::for_item(&item));
        Ok(item)
    }

    pub async fn list_items(&self, owner_id: &str, filter: &ItemFilter) -> AppResult<Vec<Item>> {
        self.store.list_items(owner_id, filter).await
    }

    pub async fn get_item(&self, owner_id: &str, item_id: ItemId) -> AppResult<Item> {
        self.store
            .get_item(owner_id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))
    }

    /// Deletes an item and its embedding
    pub async fn delete_item(&self, owner_id: &str, item_id: ItemId) -> AppResult<()> {
        if !self.store.delete_item(owner_id, item_id).await? {
            return Err(AppError::NotFound(format!("Item {} not found", item_id)));
        }
        tracing::info!(item_id, owner_id, "Item deleted");
        Ok(())
    }

    /// Queues a fresh embedding for an existing item
    pub async fn request_reembedding(&self, owner_id: &str, item_id: ItemId) -> AppResult<Item> {
        let item = self
            .store
            .get_item(owner_id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

        self.queue.enqueue(EmbeddingJob::for_item(&item));
        Ok(item)
    }
}
