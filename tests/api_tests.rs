use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use wardrobe_api::{
    create_router,
    db::{MemoryWardrobeStore, WardrobeStore},
    error::{AppError, AppResult},
    services::{
        providers::{EmbeddingProvider, TaskType},
        EmbeddingPipeline, EmbeddingQueue, EmbeddingWorkerHandle, Inventory, PreferenceExtractor,
        Recommender, RetryPolicy,
    },
    AppState,
};

const OWNER: &str = "owner-1";

/// Embeds every text to the same direction
struct FixedProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for FixedProvider {
    async fn embed(&self, _text: &str, _task: TaskType) -> AppResult<Vec<f32>> {
        Ok(vec![1.0, 0.5])
    }

    fn model_id(&self) -> String {
        "fixed".to_string()
    }
}

struct UnavailableProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for UnavailableProvider {
    async fn embed(&self, _text: &str, _task: TaskType) -> AppResult<Vec<f32>> {
        Err(AppError::Provider("Gemini API key is not configured".to_string()))
    }

    fn model_id(&self) -> String {
        "unavailable".to_string()
    }
}

struct TestApp {
    server: TestServer,
    store: MemoryWardrobeStore,
    worker: EmbeddingWorkerHandle,
}

impl TestApp {
    /// Waits until every queued embedding job has finished
    async fn flush_embeddings(self) -> (TestServer, MemoryWardrobeStore) {
        self.worker.shutdown().await;
        (self.server, self.store)
    }
}

fn create_test_app(provider: Arc<dyn EmbeddingProvider>) -> TestApp {
    let store = MemoryWardrobeStore::new();
    let shared: Arc<dyn WardrobeStore> = Arc::new(store.clone());

    let pipeline = Arc::new(EmbeddingPipeline::new(
        provider.clone(),
        shared.clone(),
        RetryPolicy::none(),
        Duration::from_secs(5),
    ));
    let (queue, worker) = EmbeddingQueue::start(pipeline);

    let recommender = Recommender::new(
        shared.clone(),
        provider,
        PreferenceExtractor::default(),
        Duration::from_secs(5),
    );
    let state = AppState::new(recommender, Inventory::new(shared, queue));

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        store,
        worker,
    }
}

fn owner_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-owner-id"),
        HeaderValue::from_static(OWNER),
    )
}

async fn create_item(server: &TestServer, body: Value) -> Value {
    let (name, value) = owner_header();
    let response = server.post("/api/v1/items").add_header(name, value).json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn recommend(server: &TestServer, body: Value) -> axum_test::TestResponse {
    let (name, value) = owner_header();
    server
        .post("/api/v1/recommendations")
        .add_header(name, value)
        .json(&body)
        .await
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(Arc::new(FixedProvider));
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app(Arc::new(FixedProvider));
    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-42"),
        )
        .await;
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-42")
    );

    let response = app.server.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_recommendation_requires_owner() {
    let app = create_test_app(Arc::new(FixedProvider));
    let response = app
        .server
        .post("/api/v1/recommendations")
        .json(&json!({ "weather": "sunny", "style": "casual" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "login required");
}

#[tokio::test]
async fn test_recommendation_requires_conditions() {
    let app = create_test_app(Arc::new(FixedProvider));
    let response = recommend(&app.server, json!({ "weather": " ", "style": "" })).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "conditions required");
}

#[tokio::test]
async fn test_recommendation_without_items() {
    let app = create_test_app(Arc::new(FixedProvider));
    let response = recommend(&app.server, json!({ "weather": "여름", "style": "캐주얼" })).await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "no items available to recommend from");
}

#[tokio::test]
async fn test_provider_failure_is_service_unavailable() {
    let app = create_test_app(Arc::new(UnavailableProvider));
    let response = recommend(&app.server, json!({ "weather": "sunny", "style": "" })).await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["error"], "could not generate recommendation right now");
}

#[tokio::test]
async fn test_register_and_recommend_flow() {
    let app = create_test_app(Arc::new(FixedProvider));

    let top = create_item(
        &app.server,
        json!({
            "category": "top",
            "tags": ["favorite"],
            "vision": {
                "summary": "white linen shirt",
                "season": "여름",
                "style": "캐주얼",
                "colors": ["White"],
                "tags": ["shirt", "linen"]
            }
        }),
    )
    .await;
    assert_eq!(
        top["tags"],
        json!([
            "favorite",
            "shirt",
            "linen",
            "season:여름",
            "style:캐주얼",
            "color:white"
        ])
    );
    assert_eq!(top["metadata"]["colors"], json!(["white"]));

    let bottom = create_item(&app.server, json!({ "category": "bottom", "tags": ["jeans"] })).await;

    let (server, store) = app.flush_embeddings().await;
    assert_eq!(store.list_embedded_items(OWNER).await.unwrap().len(), 2);

    let response = recommend(&server, json!({ "weather": "summer", "style": "casual" })).await;
    response.assert_status_ok();
    let body: Value = response.json();

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["category"], "top");
    assert_eq!(items[0]["item_id"], top["id"]);
    assert_eq!(items[0]["note"], "white linen shirt");
    assert_eq!(items[0]["locked"], false);
    assert_eq!(items[1]["category"], "bottom");
    assert_eq!(items[1]["item_id"], bottom["id"]);
    assert_eq!(items[1]["note"], "jeans");
    assert_eq!(body["has_more"], false);

    let expected_token = format!("{},{}", top["id"], bottom["id"]);
    assert_eq!(body["exclude_token"], expected_token);
}

#[tokio::test]
async fn test_recommend_again_with_token_and_lock() {
    let app = create_test_app(Arc::new(FixedProvider));

    let first_top = create_item(&app.server, json!({ "category": "top", "tags": ["tee"] })).await;
    let second_top = create_item(&app.server, json!({ "category": "top", "tags": ["knit"] })).await;
    let bottom = create_item(&app.server, json!({ "category": "bottom", "tags": ["chinos"] })).await;
    let (server, _store) = app.flush_embeddings().await;

    let response = recommend(&server, json!({ "weather": "mild", "style": "relaxed" })).await;
    response.assert_status_ok();
    let first: Value = response.json();
    assert_eq!(first["items"][0]["item_id"], first_top["id"]);
    assert_eq!(first["has_more"], true);

    let response = recommend(
        &server,
        json!({
            "weather": "mild",
            "style": "relaxed",
            "exclude_token": first["exclude_token"],
            "locks": { "bottom": bottom["id"] }
        }),
    )
    .await;
    response.assert_status_ok();
    let second: Value = response.json();

    let items = second["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["item_id"], second_top["id"]);
    assert_eq!(items[1]["item_id"], bottom["id"]);
    assert_eq!(items[1]["locked"], true);
    assert_eq!(items[1]["note"], "locked selection");
    assert!(items[1].get("score").is_none());
}

#[tokio::test]
async fn test_update_item() {
    let app = create_test_app(Arc::new(FixedProvider));
    let item = create_item(&app.server, json!({ "category": "shoes", "tags": ["sneakers"] })).await;

    let (name, value) = owner_header();
    let response = app
        .server
        .put(&format!("/api/v1/items/{}", item["id"]))
        .add_header(name, value)
        .json(&json!({
            "tags": ["runners"],
            "metadata": { "season": "Spring", "style": "Sporty" }
        }))
        .await;
    response.assert_status_ok();

    let updated: Value = response.json();
    assert_eq!(updated["category"], "shoes");
    assert_eq!(updated["tags"], json!(["runners", "season:spring", "style:sporty"]));
    assert_eq!(updated["metadata"]["season"], "spring");
    assert_eq!(updated["metadata"]["style"], "sporty");
}

#[tokio::test]
async fn test_unknown_item_routes() {
    let app = create_test_app(Arc::new(FixedProvider));

    let (name, value) = owner_header();
    let response = app
        .server
        .put("/api/v1/items/404")
        .add_header(name, value)
        .json(&json!({ "tags": [] }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let (name, value) = owner_header();
    let response = app
        .server
        .post("/api/v1/items/404/embedding")
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let (name, value) = owner_header();
    let response = app.server.get("/api/v1/items/404").add_header(name, value).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let (name, value) = owner_header();
    let response = app.server.delete("/api/v1/items/404").add_header(name, value).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_token_and_locks_are_ignored() {
    let app = create_test_app(Arc::new(FixedProvider));
    let top = create_item(&app.server, json!({ "category": "top", "tags": ["tee"] })).await;
    let (server, _store) = app.flush_embeddings().await;

    for body in [
        json!({ "weather": "sunny", "style": "", "locks": null, "exclude_token": true }),
        json!({ "weather": "sunny", "style": "", "locks": ["top"], "exclude_token": { "ids": [1] } }),
    ] {
        let response = recommend(&server, body).await;
        response.assert_status_ok();
        let result: Value = response.json();
        assert_eq!(result["items"][0]["item_id"], top["id"]);
        assert_eq!(result["items"][0]["locked"], false);
    }

    let response = recommend(
        &server,
        json!({ "weather": "sunny", "style": "", "exclude_token": top["id"] }),
    )
    .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_get_and_delete_items() {
    let app = create_test_app(Arc::new(FixedProvider));
    let shirt = create_item(
        &app.server,
        json!({
            "category": "top",
            "tags": ["linen"],
            "vision": {
                "summary": "linen shirt",
                "season": "summer",
                "style": "casual",
                "colors": ["white"],
                "tags": []
            }
        }),
    )
    .await;
    let tee = create_item(&app.server, json!({ "category": "top", "tags": ["tee"] })).await;
    let shoes = create_item(&app.server, json!({ "category": "shoes", "tags": ["runners"] })).await;
    let (server, store) = app.flush_embeddings().await;

    let (name, value) = owner_header();
    let response = server
        .get("/api/v1/items")
        .add_header(name, value)
        .add_query_param("category", "top")
        .await;
    response.assert_status_ok();
    let tops: Value = response.json();
    let ids: Vec<&Value> = tops.as_array().unwrap().iter().map(|item| &item["id"]).collect();
    assert_eq!(ids, vec![&shirt["id"], &tee["id"]]);

    let (name, value) = owner_header();
    let response = server
        .get("/api/v1/items")
        .add_header(name, value)
        .add_query_param("tags", "linen,season:summer")
        .await;
    let tagged: Value = response.json();
    assert_eq!(tagged.as_array().unwrap().len(), 1);
    assert_eq!(tagged[0]["id"], shirt["id"]);

    let (name, value) = owner_header();
    let response = server
        .get(&format!("/api/v1/items/{}", shoes["id"]))
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let fetched: Value = response.json();
    assert_eq!(fetched["category"], "shoes");
    assert_eq!(fetched["tags"], json!(["runners"]));

    let response = server
        .get(&format!("/api/v1/items/{}", shoes["id"]))
        .add_header(
            HeaderName::from_static("x-owner-id"),
            HeaderValue::from_static("someone-else"),
        )
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let (name, value) = owner_header();
    let response = server
        .delete(&format!("/api/v1/items/{}", shirt["id"]))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let embedded = store.list_embedded_items(OWNER).await.unwrap();
    assert_eq!(embedded.len(), 2);
    assert!(embedded.iter().all(|e| json!(e.item.id) != shirt["id"]));

    let (name, value) = owner_header();
    let listed: Value = server.get("/api/v1/items").add_header(name, value).await.json();
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_refresh_embedding_is_accepted() {
    let app = create_test_app(Arc::new(FixedProvider));
    let item = create_item(&app.server, json!({ "category": "accessory" })).await;

    let (name, value) = owner_header();
    let response = app
        .server
        .post(&format!("/api/v1/items/{}/embedding", item["id"]))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::ACCEPTED);

    let (_server, store) = app.flush_embeddings().await;
    assert_eq!(store.list_embedded_items(OWNER).await.unwrap().len(), 1);
}
