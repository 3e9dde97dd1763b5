use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::reviews::{CreateReviewInput, UpdateReviewInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Routes mounted under a product: public listing and submission
pub fn product_reviews_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id/reviews", get(list_reviews))
        .route("/:id/reviews", post(create_review))
        .route("/:id/reviews/all", get(list_all_reviews))
}

/// Routes for operating on a single review
pub fn reviews_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id", put(update_review))
        .route("/:id", delete(delete_review))
        .route("/:id/approve", post(approve_review))
}

/// Approved reviews of a product
async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let reviews = state
        .services
        .reviews
        .list_approved(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(reviews))
}

/// Every review of a product, including unapproved (staff only)
async fn list_all_reviews(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let reviews = state
        .services
        .reviews
        .list_all(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(reviews))
}

/// Submit a review; it stays hidden until approved
async fn create_review(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateReviewInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let review = state
        .services
        .reviews
        .create(user.id, id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(review))
}

/// Amend the caller's own review, resetting approval
async fn update_review(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let review = state
        .services
        .reviews
        .update(user.id, id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(review))
}

/// Approve a review for public display (staff only)
async fn approve_review(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let review = state
        .services
        .reviews
        .approve(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(review))
}

/// Remove a review (staff only)
async fn delete_review(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    state
        .services
        .reviews
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
