//! Embedding provider abstraction
//!
//! Text is embedded with a task hint: stored item descriptions use
//! [`TaskType::Document`], recommendation queries use [`TaskType::Query`]. Both
//! must come from the same model so their vectors share a dimension.

use std::fmt::Display;

use crate::error::AppResult;

pub mod cached;
pub mod gemini;

pub use cached::CachedEmbeddingProvider;
pub use gemini::GeminiEmbeddingProvider;

/// Retrieval role of the embedded text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Document,
    Query,
}

impl TaskType {
    /// Task type name understood by the Gemini API
    pub fn as_gemini(&self) -> &'static str {
        match self {
            TaskType::Document => "RETRIEVAL_DOCUMENT",
            TaskType::Query => "RETRIEVAL_QUERY",
        }
    }
}

impl Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Document => write!(f, "document"),
            TaskType::Query => write!(f, "query"),
        }
    }
}

/// Trait for text embedding providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `text` into a single vector
    ///
    /// Missing credentials, transport failures and empty responses are all
    /// reported as errors; an `Ok` vector is never empty.
    async fn embed(&self, text: &str, task: TaskType) -> AppResult<Vec<f32>>;

    /// Identifier of the model producing the vectors
    fn model_id(&self) -> String;
}
