use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    services::providers::{EmbeddingProvider, TaskType},
};

/// Wraps a provider and caches its query embeddings in Redis
///
/// Document embeddings are always computed fresh since item descriptions change
/// when metadata is revised.
pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Cache,
    ttl: u64,
}

impl CachedEmbeddingProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, cache: Cache, ttl: u64) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    async fn embed(&self, text: &str, task: TaskType) -> AppResult<Vec<f32>> {
        if task == TaskType::Document {
            return self.inner.embed(text, task).await;
        }

        let key = CacheKey::QueryEmbedding {
            model: self.inner.model_id(),
            text: text.to_string(),
        };

        cached!(self.cache, key, self.ttl, async move {
            self.inner.embed(text, task).await
        })
    }

    fn model_id(&self) -> String {
        self.inner.model_id()
    }
}
