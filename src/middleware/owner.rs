use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header set by the upstream auth layer with the caller's owner id
pub const OWNER_ID_HEADER: &str = "x-owner-id";

/// The authenticated owner of the wardrobe being accessed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|owner| !owner.is_empty())
            .map(|owner| OwnerId(owner.to_string()))
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))
    }
}
