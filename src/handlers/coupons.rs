use crate::handlers::common::{
    created_response, map_service_error, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::coupons::{CreateCouponInput, UpdateCouponInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for coupon endpoints
pub fn coupons_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_coupons))
        .route("/", post(create_coupon))
        .route("/preview", post(preview_coupon))
        .route("/redeem", post(redeem_coupon))
        .route("/:id", get(get_coupon))
        .route("/:id", put(update_coupon))
        .route("/:id/usages", get(list_usages))
}

#[derive(Debug, Deserialize)]
struct ApplyCouponRequest {
    code: String,
    order_total: Decimal,
}

/// All coupons (staff only)
async fn list_coupons(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let coupons = state
        .services
        .coupons
        .list_coupons()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupons))
}

/// Create a coupon (staff only)
async fn create_coupon(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCouponInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let coupon = state
        .services
        .coupons
        .create_coupon(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(coupon))
}

/// A single coupon (staff only)
async fn get_coupon(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let coupon = state
        .services
        .coupons
        .get_coupon(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupon))
}

/// Update a coupon (staff only)
async fn update_coupon(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let coupon = state
        .services
        .coupons
        .update_coupon(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupon))
}

/// Redemption ledger of a coupon (staff only)
async fn list_usages(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let usages = state
        .services
        .coupons
        .list_usages(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(usages))
}

/// Check a coupon against a total without spending a use
async fn preview_coupon(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<ApplyCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let application = state
        .services
        .coupons
        .preview(&payload.code, user.id, payload.order_total)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(application))
}

/// Redeem a coupon against a total, recording the usage
async fn redeem_coupon(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<ApplyCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let application = state
        .services
        .coupons
        .redeem(&payload.code, user.id, payload.order_total)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(application))
}
