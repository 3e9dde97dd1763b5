use crate::handlers::common::{created_response, map_service_error, no_content_response, success_response};
use crate::{auth::AuthenticatedUser, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for wishlist endpoints
pub fn wishlist_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_wishlist))
        .route("/", post(add_to_wishlist))
        .route("/:product_id", delete(remove_from_wishlist))
}

#[derive(Debug, Deserialize)]
struct AddWishlistRequest {
    product_id: Uuid,
}

/// The caller's wishlist with product data
async fn list_wishlist(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let entries = state
        .services
        .wishlist
        .list(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

/// Add a product to the wishlist
async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<AddWishlistRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .wishlist
        .add(user.id, payload.product_id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(item))
}

/// Remove a product from the wishlist
async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .wishlist
        .remove(user.id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
