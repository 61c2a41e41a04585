use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::OwnerId,
    models::{parse_tag_list, Category, Item, ItemFilter, ItemId, ItemMetadata, VisionDescription},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Output of the vision provider for the uploaded image, if any
    #[serde(default)]
    pub vision: Option<VisionDescription>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: ItemMetadata,
}

/// Query string of the item listing, e.g. `?category=top&tags=linen,season:summer`
#[derive(Debug, Default, Deserialize)]
pub struct ListItemsQuery {
    #[serde(alias = "kind")]
    pub category: Option<Category>,
    pub tags: Option<String>,
}

impl From<ListItemsQuery> for ItemFilter {
    fn from(query: ListItemsQuery) -> Self {
        Self {
            category: query.category,
            tags: query.tags.as_deref().map(parse_tag_list).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: ItemId,
    pub category: Category,
    pub tags: Vec<String>,
    pub metadata: ItemMetadata,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            category: item.category,
            tags: item.tags,
            metadata: item.metadata,
            updated_at: item.updated_at,
        }
    }
}

pub async fn list_items(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Query(query): Query<ListItemsQuery>,
) -> AppResult<Json<Vec<ItemResponse>>> {
    let filter = ItemFilter::from(query);
    let items = state.inventory.list_items(&owner_id, &filter).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

pub async fn get_item(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(item_id): Path<ItemId>,
) -> AppResult<Json<ItemResponse>> {
    let item = state.inventory.get_item(&owner_id, item_id).await?;
    Ok(Json(item.into()))
}

/// Registers an item; its embedding is computed in the background
pub async fn create_item(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let item = state
        .inventory
        .register_item(&owner_id, request.category, request.tags, request.vision)
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn update_item(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(item_id): Path<ItemId>,
    Json(request): Json<UpdateItemRequest>,
) -> AppResult<Json<ItemResponse>> {
    let item = state
        .inventory
        .revise_item(&owner_id, item_id, request.tags, request.metadata)
        .await?;
    Ok(Json(item.into()))
}

/// Re-runs the embedding job for an item
pub async fn refresh_embedding(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(item_id): Path<ItemId>,
) -> AppResult<StatusCode> {
    state.inventory.request_reembedding(&owner_id, item_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Deletes an item and its embedding
pub async fn delete_item(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(item_id): Path<ItemId>,
) -> AppResult<StatusCode> {
    state.inventory.delete_item(&owner_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
