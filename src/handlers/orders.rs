use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{auth::AuthenticatedUser, entities::OrderStatus, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for order endpoints, including per-order messages
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders))
        .route("/", post(checkout))
        .route("/buy-now", post(buy_now))
        .route("/all", get(list_all_orders))
        .route("/:id", get(get_order))
        .route("/:id", delete(delete_order))
        .route("/:id/status", put(update_status))
        .route("/:id/messages", get(list_messages))
        .route("/:id/messages", post(post_message))
}

#[derive(Debug, Deserialize)]
struct BuyNowRequest {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

#[derive(Debug, Deserialize)]
struct PostMessageRequest {
    content: String,
}

/// The caller's orders, newest first
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_for_user(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

/// Place an order from the caller's cart
async fn checkout(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .create_from_cart(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

/// Place a single-product order, bypassing the cart
async fn buy_now(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<BuyNowRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .buy_now(user.id, payload.product_id, payload.variant_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

/// Every order in the system (staff only)
async fn list_all_orders(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let orders = state
        .services
        .orders
        .list_all()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

/// A single order with its items; owners and staff only
async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_for_user(id, user.id, user.role.is_staff())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Advance or cancel an order (staff only)
async fn update_status(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let order = state
        .services
        .orders
        .update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Delete an order and its items (staff only)
async fn delete_order(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    state
        .services
        .orders
        .delete_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// The message thread of an order; owners and staff only
async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let messages = state
        .services
        .messages
        .list(id, user.id, user.role.is_staff())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(messages))
}

/// Post a message on an order thread
async fn post_message(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let message = state
        .services
        .messages
        .post(id, user.id, &payload.content)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(message))
}
