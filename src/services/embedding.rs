//! Background generation of item embeddings.
//!
//! Writes that change an item's description enqueue an [`EmbeddingJob`] on the
//! [`EmbeddingQueue`] and return immediately. A worker task runs every job as its
//! own task, so jobs for different items proceed concurrently and two jobs for
//! the same item race with the last persisted vector winning. Failures are only
//! logged; an item without an embedding is simply not ranked.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::{
    db::WardrobeStore,
    error::{AppError, AppResult},
    models::{Category, Embedding, Item, ItemId, ItemMetadata},
    services::{
        providers::{EmbeddingProvider, TaskType},
        vector_codec,
    },
};

/// Composes the text embedded for an item
///
/// One line per non-empty field, in a fixed order, ending with the tag list.
pub fn build_embedding_context(category: Category, tags: &[String], metadata: &ItemMetadata) -> String {
    let mut lines = vec![format!("category: {}", category)];
    if let Some(summary) = metadata.summary.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("summary: {}", summary));
    }
    if let Some(season) = metadata.season.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("season: {}", season));
    }
    if let Some(style) = metadata.style.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("style: {}", style));
    }
    if !metadata.colors.is_empty() {
        lines.push(format!("colors: {}", metadata.colors.join(", ")));
    }
    if !tags.is_empty() {
        lines.push(format!("tags: {}", tags.join(", ")));
    }
    lines.join("\n")
}

/// A request to (re)compute one item's embedding
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingJob {
    pub item_id: ItemId,
    pub owner_id: String,
    pub context: String,
}

impl EmbeddingJob {
    pub fn for_item(item: &Item) -> Self {
        Self {
            item_id: item.id,
            owner_id: item.owner_id.clone(),
            context: build_embedding_context(item.category, &item.tags, &item.metadata),
        }
    }
}

/// How often a failed job is attempted again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each further retry
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Generates and stores document embeddings for items
pub struct EmbeddingPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn WardrobeStore>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl EmbeddingPipeline {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn WardrobeStore>,
        retry: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            retry,
            attempt_timeout,
        }
    }

    /// One attempt: embed the job's context and upsert the vector
    pub async fn generate_embedding(&self, job: &EmbeddingJob) -> AppResult<Embedding> {
        let item = self
            .store
            .get_item(&job.owner_id, job.item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} no longer exists", job.item_id)))?;

        let context = job.context.trim();
        let payload = if context.is_empty() {
            format!("closet item #{}", item.id)
        } else {
            context.to_string()
        };

        let vector = self.provider.embed(&payload, TaskType::Document).await?;
        if vector.is_empty() {
            return Err(AppError::Provider("Embedding response was empty".to_string()));
        }

        let embedding = Embedding {
            item_id: item.id,
            model: self.provider.model_id(),
            dim: vector.len(),
            vector: vector_codec::encode(&vector),
        };
        self.store.put_embedding(embedding.clone()).await?;

        Ok(embedding)
    }

    /// Runs a job under the retry policy. Never fails; returns whether a vector
    /// was stored.
    #[tracing::instrument(skip_all, fields(item_id = job.item_id))]
    pub async fn run(&self, job: EmbeddingJob) -> bool {
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            let result =
                match tokio::time::timeout(self.attempt_timeout, self.generate_embedding(&job)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::Provider(format!(
                        "Embedding attempt timed out after {:?}",
                        self.attempt_timeout
                    ))),
                };

            match result {
                Ok(embedding) => {
                    tracing::info!(
                        item_id = job.item_id,
                        model = %embedding.model,
                        dim = embedding.dim,
                        attempt,
                        "Item embedding stored"
                    );
                    return true;
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let backoff = self.retry.backoff_for(attempt);
                    tracing::warn!(
                        item_id = job.item_id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Embedding attempt failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    tracing::error!(
                        item_id = job.item_id,
                        owner_id = %job.owner_id,
                        attempt,
                        error = %e,
                        "Item embedding failed"
                    );
                    return false;
                }
            }
        }

        false
    }
}

/// Sending side of the embedding worker
#[derive(Clone)]
pub struct EmbeddingQueue {
    job_tx: mpsc::UnboundedSender<EmbeddingJob>,
}

/// Handle for gracefully shutting down the embedding worker
pub struct EmbeddingWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    worker: JoinHandle<()>,
}

impl EmbeddingWorkerHandle {
    /// Stops accepting jobs, runs everything already queued and waits for
    /// in-flight jobs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "Embedding worker panicked");
        }
        tracing::info!("Embedding worker stopped");
    }
}

impl EmbeddingQueue {
    /// Spawns the worker task. Must be called inside a Tokio runtime.
    pub fn start(pipeline: Arc<EmbeddingPipeline>) -> (Self, EmbeddingWorkerHandle) {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = tokio::spawn(async move {
            Self::worker_task(pipeline, job_rx, shutdown_rx).await;
        });

        (Self { job_tx }, EmbeddingWorkerHandle { shutdown_tx, worker })
    }

    /// Queues a job without waiting for it
    pub fn enqueue(&self, job: EmbeddingJob) {
        let item_id = job.item_id;
        if self.job_tx.send(job).is_err() {
            tracing::error!(item_id, "Embedding worker is not running, job dropped");
        } else {
            tracing::debug!(item_id, "Embedding job queued");
        }
    }

    async fn worker_task(
        pipeline: Arc<EmbeddingPipeline>,
        mut job_rx: mpsc::UnboundedReceiver<EmbeddingJob>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Embedding worker started");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                Some(job) = job_rx.recv() => {
                    let pipeline = Arc::clone(&pipeline);
                    in_flight.spawn(async move {
                        pipeline.run(job).await;
                    });
                }
                Some(joined) = in_flight.join_next() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Embedding job panicked");
                    }
                }
                Some(()) = shutdown_rx.recv() => {
                    tracing::info!(in_flight = in_flight.len(), "Embedding worker shutting down");

                    job_rx.close();
                    while let Some(job) = job_rx.recv().await {
                        let pipeline = Arc::clone(&pipeline);
                        in_flight.spawn(async move {
                            pipeline.run(job).await;
                        });
                    }
                    while let Some(joined) = in_flight.join_next().await {
                        if let Err(e) = joined {
                            tracing::error!(error = %e, "Embedding job panicked");
                        }
                    }
                    break;
                }
                else => break,
            }
        }
    }
}
