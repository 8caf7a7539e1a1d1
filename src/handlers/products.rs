use super::common::{
    actor_from_headers, created_response, no_content_response, success_response, validate_input,
};
use crate::{
    entities::{product, stock_movement},
    errors::ServiceError,
    services::products::{ProductFilter, ProductInput, ProductWithCategory, StatusBucket},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

fn default_unit() -> String {
    "pcs".to_string()
}

fn default_reorder_level() -> i32 {
    5
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default = "default_unit")]
    #[validate(length(min = 1, max = 16))]
    pub unit: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[serde(default = "default_reorder_level")]
    #[validate(range(min = 0))]
    pub reorder_level: i32,
    pub price: Decimal,
}

impl ProductRequest {
    fn into_input(self) -> ProductInput {
        ProductInput {
            name: self.name,
            sku: self.sku,
            category_id: self.category_id,
            description: self.description,
            unit: self.unit,
            quantity: self.quantity,
            reorder_level: self.reorder_level,
            price: self.price,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// Case-insensitive match over name, SKU, and category name
    pub search: Option<String>,
    pub category: Option<Uuid>,
    pub status: Option<StatusBucket>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementHistoryParams {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub unit: String,
    pub quantity: i32,
    pub reorder_level: i32,
    pub price: Decimal,
    pub stock_value: Decimal,
    pub stock_status: product::StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductResponse {
    fn new(product: product::Model, category_name: Option<String>) -> Self {
        Self {
            id: product.id,
            category_name,
            stock_value: product.stock_value(),
            stock_status: product.stock_status(),
            name: product.name,
            sku: product.sku,
            category_id: product.category_id,
            description: product.description,
            unit: product.unit,
            quantity: product.quantity,
            reorder_level: product.reorder_level,
            price: product.price,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

impl From<ProductWithCategory> for ProductResponse {
    fn from(row: ProductWithCategory) -> Self {
        Self::new(row.product, row.category_name)
    }
}

pub fn products_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/movements", get(product_movements))
}

/// List products with optional search and filters
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListParams),
    responses(
        (status = 200, description = "Product list returned", body = [ProductResponse]),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state
        .services
        .products
        .list(ProductFilter {
            search: params.search,
            category_id: params.category,
            stock_status: params.status,
        })
        .await?;

    let response: Vec<ProductResponse> = rows.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(response))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<ProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let actor = actor_from_headers(&headers);

    let created = state
        .services
        .products
        .create(payload.into_input(), actor)
        .await?;

    info!(product_id = %created.id, "Created product");
    let category_name = category_name_for(&state, created.category_id).await?;
    Ok(created_response(ProductResponse::new(created, category_name)))
}

/// Fetch one product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product returned", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.get(id).await?;
    let category_name = category_name_for(&state, product.category_id).await?;
    Ok(success_response(ProductResponse::new(product, category_name)))
}

/// Replace a product's fields
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<ProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let actor = actor_from_headers(&headers);

    let updated = state
        .services
        .products
        .update(id, payload.into_input(), actor)
        .await?;

    info!(product_id = %updated.id, "Updated product");
    let category_name = category_name_for(&state, updated.category_id).await?;
    Ok(success_response(ProductResponse::new(updated, category_name)))
}

/// Delete a product and its movement history
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    state.services.products.delete(id, actor).await?;
    info!(product_id = %id, "Deleted product");
    Ok(no_content_response())
}

/// Movement history for one product, newest first
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/movements",
    params(("id" = Uuid, Path, description = "Product id"), MovementHistoryParams),
    responses(
        (status = 200, description = "Movement history returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn product_movements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<MovementHistoryParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = params.limit.unwrap_or(50).min(500);
    let movements: Vec<stock_movement::Model> =
        state.services.products.movements(id, limit).await?;
    Ok(success_response(movements))
}

async fn category_name_for(
    state: &AppState,
    category_id: Option<Uuid>,
) -> Result<Option<String>, ServiceError> {
    match category_id {
        Some(id) => Ok(Some(state.services.categories.get(id).await?.name)),
        None => Ok(None),
    }
}
