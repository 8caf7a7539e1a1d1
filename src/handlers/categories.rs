use super::common::{
    actor_from_headers, created_response, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ServiceError,
    services::categories::{CategoryInput, CategoryWithCount},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryWithCount> for CategoryResponse {
    fn from(row: CategoryWithCount) -> Self {
        Self {
            id: row.category.id,
            name: row.category.name,
            description: row.category.description,
            product_count: row.product_count,
            created_at: row.category.created_at,
        }
    }
}

pub fn categories_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

/// List categories alphabetically with product counts
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Category list returned", body = [CategoryResponse])
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state.services.categories.list().await?;
    let response: Vec<CategoryResponse> = rows.into_iter().map(CategoryResponse::from).collect();
    Ok(success_response(response))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created"),
        (status = 409, description = "Duplicate name", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let actor = actor_from_headers(&headers);

    let created = state
        .services
        .categories
        .create(
            CategoryInput {
                name: payload.name,
                description: payload.description,
            },
            actor,
        )
        .await?;

    info!(category_id = %created.id, "Created category");
    Ok(created_response(created))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.services.categories.get(id).await?;
    Ok(success_response(category))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let actor = actor_from_headers(&headers);

    let updated = state
        .services
        .categories
        .update(
            id,
            CategoryInput {
                name: payload.name,
                description: payload.description,
            },
            actor,
        )
        .await?;

    info!(category_id = %updated.id, "Updated category");
    Ok(success_response(updated))
}

/// Delete a category, detaching its products
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor_from_headers(&headers);
    state.services.categories.delete(id, actor).await?;
    info!(category_id = %id, "Deleted category");
    Ok(no_content_response())
}
