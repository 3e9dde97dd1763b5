use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::categories::{CreateCategoryInput, UpdateCategoryInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tree))
        .route("/", post(create_category))
        .route("/:id", get(get_category))
        .route("/:id", put(update_category))
        .route("/:id/ancestors", get(get_ancestors))
        .route("/:id/descendants", get(get_descendants))
        .route("/:id/products", get(list_category_products))
}

/// The full active category tree
async fn list_tree(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let tree = state
        .services
        .categories
        .list_tree()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(tree))
}

/// Create a category (staff only)
async fn create_category(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let category = state
        .services
        .categories
        .create_category(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

/// Get a single category
async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get_category(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

/// Update a category (staff only)
async fn update_category(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_staff().map_err(map_service_error)?;

    let category = state
        .services
        .categories
        .update_category(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

/// Chain from the category up to its root
async fn get_ancestors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let chain = state
        .services
        .categories
        .get_ancestors(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(chain))
}

/// All active categories beneath this one
async fn get_descendants(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let descendants = state
        .services
        .categories
        .get_descendants(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(descendants))
}

/// Products in this category and all of its descendants
async fn list_category_products(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let mut ids: Vec<Uuid> = vec![id];
    let descendants = state
        .services
        .categories
        .get_descendants(id)
        .await
        .map_err(map_service_error)?;
    ids.extend(descendants.iter().map(|c| c.id));

    let products = state
        .services
        .catalog
        .list_products_by_category(&ids)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}
