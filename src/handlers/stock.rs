use super::common::{actor_from_headers, created_response, success_response, validate_input};
use crate::{
    entities::stock_movement::{self, Entity as StockMovement, MovementType},
    errors::ServiceError,
    services::ledger::NewMovement,
    AppState,
};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockMovementRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementListParams {
    pub product_id: Option<Uuid>,
    /// "IN" or "OUT"
    pub movement_type: Option<String>,
    pub limit: Option<u64>,
}

pub fn stock_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/in", post(stock_in))
        .route("/out", post(stock_out))
        .route("/movements", get(list_movements))
}

/// Record incoming stock
#[utoipa::path(
    post,
    path = "/api/v1/stock/in",
    request_body = StockMovementRequest,
    responses(
        (status = 201, description = "Stock received"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn stock_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<StockMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let actor = actor_from_headers(&headers);

    let movement = state
        .services
        .ledger
        .record_stock_in(NewMovement {
            product_id: payload.product_id,
            quantity: payload.quantity,
            reference: payload.reference,
            notes: payload.notes,
            actor,
        })
        .await?;

    info!(
        product_id = %movement.product_id,
        quantity = movement.quantity,
        "Recorded stock in"
    );
    Ok(created_response(movement))
}

/// Record outgoing stock
#[utoipa::path(
    post,
    path = "/api/v1/stock/out",
    request_body = StockMovementRequest,
    responses(
        (status = 201, description = "Stock issued"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn stock_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<StockMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let actor = actor_from_headers(&headers);

    let movement = state
        .services
        .ledger
        .record_stock_out(NewMovement {
            product_id: payload.product_id,
            quantity: payload.quantity,
            reference: payload.reference,
            notes: payload.notes,
            actor,
        })
        .await?;

    info!(
        product_id = %movement.product_id,
        quantity = movement.quantity,
        "Recorded stock out"
    );
    Ok(created_response(movement))
}

/// List movements across all products, newest first
#[utoipa::path(
    get,
    path = "/api/v1/stock/movements",
    params(MovementListParams),
    responses(
        (status = 200, description = "Movement list returned"),
        (status = 400, description = "Invalid movement type", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn list_movements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MovementListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement_type = params
        .movement_type
        .as_deref()
        .map(|raw| {
            raw.to_ascii_uppercase()
                .parse::<MovementType>()
                .map_err(|_| {
                    ServiceError::ValidationError(format!(
                        "Unknown movement type '{}', expected IN or OUT",
                        raw
                    ))
                })
        })
        .transpose()?;

    let mut query = StockMovement::find().order_by_desc(stock_movement::Column::OccurredAt);
    if let Some(product_id) = params.product_id {
        query = query.filter(stock_movement::Column::ProductId.eq(product_id));
    }
    if let Some(mt) = movement_type {
        query = query.filter(stock_movement::Column::MovementType.eq(mt.as_str()));
    }
    let limit = params.limit.unwrap_or(100).min(1000);
    let movements = query
        .limit(limit)
        .all(state.db.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

    Ok(success_response(movements))
}
