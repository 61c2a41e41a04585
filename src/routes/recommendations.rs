use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    error::AppResult,
    middleware::OwnerId,
    models::{Category, ItemId, Recommendation, RecommendationQuery, RecommendationResult},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct RecommendedItem {
    pub category: Category,
    pub item_id: ItemId,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub locked: bool,
}

impl From<&Recommendation> for RecommendedItem {
    fn from(recommendation: &Recommendation) -> Self {
        Self {
            category: recommendation.category,
            item_id: recommendation.item.id,
            note: recommendation.note(),
            score: recommendation.score,
            locked: recommendation.locked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub items: Vec<RecommendedItem>,
    /// Send back as `exclude_token` to avoid repeats on the next request
    pub exclude_token: String,
    pub has_more: bool,
}

impl From<RecommendationResult> for RecommendationResponse {
    fn from(result: RecommendationResult) -> Self {
        Self {
            items: result.recommendations.iter().map(RecommendedItem::from).collect(),
            exclude_token: result.exclude_token.to_string(),
            has_more: result.has_more,
        }
    }
}

/// Handler for the outfit recommendation endpoint
pub async fn recommend(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(query): Json<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let result = state.recommender.recommend(&owner_id, &query).await?;
    Ok(Json(result.into()))
}
