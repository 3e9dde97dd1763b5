use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::addresses::{CreateAddressInput, UpdateAddressInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for address endpoints
pub fn addresses_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_addresses))
        .route("/", post(create_address))
        .route("/:id", get(get_address))
        .route("/:id", put(update_address))
        .route("/:id", delete(delete_address))
}

/// The caller's addresses, default first
async fn list_addresses(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let addresses = state
        .services
        .addresses
        .list(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(addresses))
}

/// Create an address for the caller
async fn create_address(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateAddressInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .addresses
        .create(user.id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(address))
}

/// A single address of the caller
async fn get_address(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let address = state
        .services
        .addresses
        .get(user.id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(address))
}

/// Update one of the caller's addresses
async fn update_address(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAddressInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .addresses
        .update(user.id, id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(address))
}

/// Delete one of the caller's addresses
async fn delete_address(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .addresses
        .delete(user.id, id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
