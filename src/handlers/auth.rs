use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{auth::AuthenticatedUser, errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Creates the router for authentication endpoints
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/otp/request", post(request_otp))
        .route("/otp/verify", post(verify_otp))
        .route("/refresh", post(refresh_tokens))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
struct RequestOtpRequest {
    #[validate(email(message = "a valid email address is required"))]
    email: String,
}

#[derive(Debug, Deserialize, Validate)]
struct VerifyOtpRequest {
    #[validate(email(message = "a valid email address is required"))]
    email: String,
    #[validate(length(min = 4, max = 4, message = "code must be 4 digits"))]
    code: String,
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

/// Request a login code by email
async fn request_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RequestOtpRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .otp
        .request(&payload.email)
        .await
        .map_err(map_service_error)?;

    // Same response whether or not the address was known.
    Ok(success_response(serde_json::json!({
        "message": "if the address is valid, a code has been sent"
    })))
}

/// Exchange a login code for a token pair
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let login = state
        .services
        .otp
        .verify(&payload.email, &payload.code)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(login))
}

/// Exchange a refresh token for a fresh pair
async fn refresh_tokens(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let pair = state
        .auth
        .refresh(&payload.refresh_token)
        .map_err(map_service_error)?;
    Ok(success_response(pair))
}

/// The authenticated caller's identity
async fn me(user: AuthenticatedUser) -> Result<impl axum::response::IntoResponse, ApiError> {
    Ok(success_response(serde_json::json!({
        "id": user.id,
        "email": user.email,
        "role": user.role,
    })))
}
