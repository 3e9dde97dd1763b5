use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginationParams,
};
use crate::{
    auth::AuthenticatedUser,
    entities::{ProductModel, ProductVariantModel, VariantOptionModel},
    errors::ApiError,
    services::catalog::{CreateProductInput, CreateVariantInput, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Product as shown on listing pages: catalog row plus the offer-adjusted
/// price.
#[derive(Debug, Serialize)]
struct PricedProduct {
    #[serde(flatten)]
    product: ProductModel,
    effective_price: Decimal,
}

#[derive(Debug, Serialize)]
struct PricedProductPage {
    items: Vec<PricedProduct>,
    total: u64,
    page: u64,
    per_page: u64,
}

#[derive(Debug, Serialize)]
struct PricedVariant {
    #[serde(flatten)]
    variant: ProductVariantModel,
    effective_price: Decimal,
    options: Vec<VariantOptionModel>,
}

#[derive(Debug, Serialize)]
struct PricedProductDetail {
    #[serde(flatten)]
    product: ProductModel,
    effective_price: Decimal,
    variants: Vec<PricedVariant>,
}

/// Creates the router for product and variant endpoints
pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/", post(create_product))
        .route("/:id", get(get_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
        .route("/:id/price", get(get_effective_price))
        .route("/:id/variants", get(list_variants))
        .route("/:id/variants", post(add_variant))
}

/// Creates the router for variant type administration
pub fn variant_types_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_variant_types))
        .route("/", post(create_variant_type))
        .route("/:id/options", get(list_variant_options))
        .route("/:id/options", post(create_variant_option))
}

/// Paginated product listing with offer-adjusted prices
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (page, per_page) = params.clamped();
    let products = state
        .services
        .catalog
        .list_products(page, per_page)
        .await
        .map_err(map_service_error)?;

    let mut items = Vec::with_capacity(products.items.len());
    for product in products.items {
        let resolved = state
            .services
            .offers
            .resolve_price(&product)
            .await
            .map_err(map_service_error)?;
        items.push(PricedProduct {
            product,
            effective_price: resolved.effective_price,
        });
    }

    Ok(success_response(PricedProductPage {
        items,
        total: products.total,
        page: products.page,
        per_page: products.per_page,
    }))
}

/// Create a product, optionally with variants (staff only)
async fn create_product(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

/// Product detail with variants, all offer-adjusted
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .catalog
        .get_product_detail(id)
        .await
        .map_err(map_service_error)?;

    let resolved = state
        .services
        .offers
        .resolve_price(&detail.product)
        .await
        .map_err(map_service_error)?;

    let mut variants = Vec::with_capacity(detail.variants.len());
    for entry in detail.variants {
        let variant_price = state
            .services
            .offers
            .resolve_variant_price(&detail.product, &entry.variant)
            .await
            .map_err(map_service_error)?;
        variants.push(PricedVariant {
            variant: entry.variant,
            effective_price: variant_price.effective_price,
            options: entry.options,
        });
    }

    Ok(success_response(PricedProductDetail {
        product: detail.product,
        effective_price: resolved.effective_price,
        variants,
    }))
}

#[derive(Debug, Deserialize)]
struct PriceQuery {
    variant_id: Option<Uuid>,
}

/// Current offer-adjusted price for a product or one of its variants
async fn get_effective_price(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<PriceQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;

    let price = match query.variant_id {
        Some(variant_id) => {
            let variant = state
                .services
                .catalog
                .get_variant(id, variant_id)
                .await
                .map_err(map_service_error)?;
            state
                .services
                .offers
                .resolve_variant_price(&product, &variant)
                .await
                .map_err(map_service_error)?
        }
        None => state
            .services
            .offers
            .resolve_price(&product)
            .await
            .map_err(map_service_error)?,
    };
    Ok(success_response(price))
}

/// Update a product (staff only)
async fn update_product(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

/// Delete a product (staff only)
async fn delete_product(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Variants of a product with their options
async fn list_variants(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let variants = state
        .services
        .catalog
        .list_variants(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(variants))
}

/// Add a variant to an existing product (staff only)
async fn add_variant(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let variant = state
        .services
        .catalog
        .add_variant(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(variant))
}

#[derive(Debug, Deserialize)]
struct CreateVariantTypeRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreateVariantOptionRequest {
    value: String,
}

/// All variant types
async fn list_variant_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let types = state
        .services
        .catalog
        .list_variant_types()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(types))
}

/// Create a variant type (staff only)
async fn create_variant_type(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateVariantTypeRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let variant_type = state
        .services
        .catalog
        .create_variant_type(&payload.name)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(variant_type))
}

/// Options of a variant type
async fn list_variant_options(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let options = state
        .services
        .catalog
        .list_variant_options(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(options))
}

/// Add an option to a variant type (staff only)
async fn create_variant_option(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantOptionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let option = state
        .services
        .catalog
        .create_variant_option(id, &payload.value)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(option))
}
