//! Review handlers, nested under a listing.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use super::{ApiError, ApiJson, AppState, CurrentUser};
use crate::models::{Review, ReviewInput};

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    input.validate()?;

    let review = Review::new(input, user.name());
    let listing = state
        .store
        .insert_review(id, &review)?
        .ok_or(ApiError::NotFound("The listing you requested does not exist!"))?;
    info!("New review {} on listing {}", review.id, listing.id);

    Ok((StatusCode::CREATED, Json(review)))
}

/// Only the review's author may delete it, and only through the listing
/// that holds it
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let review = state
        .store
        .find_review(review_id)?
        .ok_or(ApiError::NotFound("Review not found!"))?;

    if review.author != user.name() {
        return Err(ApiError::Forbidden);
    }

    state
        .store
        .delete_review(id, review_id)?
        .ok_or(ApiError::NotFound("Review not found!"))?;
    info!("Review {} deleted from listing {}", review_id, id);

    Ok(StatusCode::NO_CONTENT)
}
