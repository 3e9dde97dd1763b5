use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::testimonials::{CreateTestimonialInput, UpdateTestimonialInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for testimonial endpoints
pub fn testimonials_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_testimonials))
        .route("/", post(create_testimonial))
        .route("/:id", get(get_testimonial))
        .route("/:id", put(update_testimonial))
        .route("/:id", axum::routing::delete(delete_testimonial))
}

/// A single testimonial
async fn get_testimonial(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let testimonial = state
        .services
        .testimonials
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(testimonial))
}

/// Edit a testimonial (staff only)
async fn update_testimonial(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTestimonialInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let testimonial = state
        .services
        .testimonials
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(testimonial))
}

/// Public testimonial listing, newest first
async fn list_testimonials(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let testimonials = state
        .services
        .testimonials
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(testimonials))
}

/// Publish a testimonial (staff only)
async fn create_testimonial(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTestimonialInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let testimonial = state
        .services
        .testimonials
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(testimonial))
}

/// Remove a testimonial (staff only)
async fn delete_testimonial(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    state
        .services
        .testimonials
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
