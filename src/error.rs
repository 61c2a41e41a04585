use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message shown to clients when the embedding provider cannot be used
pub const PROVIDER_UNAVAILABLE_MESSAGE: &str = "could not generate recommendation right now";

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Nothing to recommend from, distinct from a provider failure
    #[error("No data: {0}")]
    NoData(String),

    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a background job may succeed when attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Provider(_)
                | AppError::HttpClient(_)
                | AppError::Database(_)
                | AppError::Cache(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::NoData(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Provider(_) | AppError::HttpClient(_) => {
                tracing::error!(error = %self, "Embedding provider failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    PROVIDER_UNAVAILABLE_MESSAGE.to_string(),
                )
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
