use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::offers::{CreateOfferInput, UpdateOfferInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for offer administration
pub fn offers_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_offers))
        .route("/", post(create_offer))
        .route("/:id", get(get_offer))
        .route("/:id", put(update_offer))
        .route("/:id", delete(delete_offer))
}

/// All offers, newest first (staff only)
async fn list_offers(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let offers = state
        .services
        .offers
        .list_offers()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(offers))
}

/// Create an offer on a product or a category (staff only)
async fn create_offer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateOfferInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let offer = state
        .services
        .offers
        .create_offer(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(offer))
}

/// A single offer (staff only)
async fn get_offer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let offer = state
        .services
        .offers
        .get_offer(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(offer))
}

/// Update an offer's window, value, or active flag (staff only)
async fn update_offer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOfferInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let offer = state
        .services
        .offers
        .update_offer(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(offer))
}

/// Delete an offer (staff only)
async fn delete_offer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    state
        .services
        .offers
        .delete_offer(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
