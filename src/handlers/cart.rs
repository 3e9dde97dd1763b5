use crate::handlers::common::{map_service_error, no_content_response, success_response};
use crate::{auth::AuthenticatedUser, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for cart endpoints
pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_item))
        .route("/items", put(set_item_quantity))
        .route("/items/:id", delete(remove_item))
        .route("/clear", post(clear_cart))
}

#[derive(Debug, Deserialize)]
struct CartItemRequest {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
}

/// The caller's cart with priced lines
async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Apply a quantity delta to a cart line
async fn add_item(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CartItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let line = state
        .services
        .cart
        .add_or_update(user.id, payload.product_id, payload.variant_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(line))
}

/// Set a cart line to an absolute quantity
async fn set_item_quantity(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CartItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let line = state
        .services
        .cart
        .set_quantity(user.id, payload.product_id, payload.variant_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(line))
}

/// Remove a cart line by id
async fn remove_item(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .remove_item(user.id, id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Empty the caller's cart
async fn clear_cart(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
