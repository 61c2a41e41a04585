use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wardrobe_api::{
    config::Config,
    create_router,
    db::{create_pool, create_redis_client, Cache, PgWardrobeStore, WardrobeStore},
    services::{
        providers::{CachedEmbeddingProvider, EmbeddingProvider, GeminiEmbeddingProvider},
        EmbeddingPipeline, EmbeddingQueue, Inventory, PreferenceDictionaries, PreferenceExtractor,
        Recommender, RetryPolicy,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wardrobe_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let store: Arc<dyn WardrobeStore> = Arc::new(PgWardrobeStore::new(pool));

    let gemini: Arc<dyn EmbeddingProvider> = Arc::new(GeminiEmbeddingProvider::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.embedding_model.clone(),
    ));
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set, embedding calls will fail");
    }

    let (provider, cache_writer) = match &config.redis_url {
        Some(redis_url) => {
            let (cache, handle) = Cache::new(create_redis_client(redis_url)?).await;
            tracing::info!("Query embeddings are cached in Redis");
            let provider: Arc<dyn EmbeddingProvider> = Arc::new(CachedEmbeddingProvider::new(
                gemini,
                cache,
                config.query_cache_ttl_secs,
            ));
            (provider, Some(handle))
        }
        None => (gemini, None),
    };

    let dictionaries = match &config.preference_dictionary_path {
        Some(path) => {
            let dictionaries = PreferenceDictionaries::from_json_file(path)?;
            tracing::info!(path = %path, "Loaded preference dictionaries");
            dictionaries
        }
        None => PreferenceDictionaries::default(),
    };

    let pipeline = Arc::new(EmbeddingPipeline::new(
        provider.clone(),
        store.clone(),
        RetryPolicy {
            max_attempts: config.embedding_max_attempts,
            initial_backoff: std::time::Duration::from_millis(config.embedding_retry_backoff_ms),
        },
        config.embedding_job_timeout(),
    ));
    let (queue, embedding_worker) = EmbeddingQueue::start(pipeline);

    let recommender = Recommender::new(
        store.clone(),
        provider,
        PreferenceExtractor::new(dictionaries),
        config.query_embedding_timeout(),
    );
    let state = AppState::new(recommender, Inventory::new(store, queue));

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    embedding_worker.shutdown().await;
    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
