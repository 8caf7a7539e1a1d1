use super::common::success_response;
use crate::{errors::ServiceError, AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeParams {
    /// Inclusive start day, YYYY-MM-DD
    pub date_from: Option<String>,
    /// Inclusive end day, YYYY-MM-DD
    pub date_to: Option<String>,
}

impl DateRangeParams {
    fn parse(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ServiceError> {
        Ok((
            parse_day(self.date_from.as_deref())?,
            parse_day(self.date_to.as_deref())?,
        ))
    }
}

fn parse_day(raw: Option<&str>) -> Result<Option<NaiveDate>, ServiceError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| ServiceError::ValidationError(format!("Invalid date '{}': {}", s, e)))
    })
    .transpose()
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockParams {
    pub limit: Option<u64>,
}

pub fn reports_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/inventory", get(inventory_snapshot))
        .route("/stock-out", get(stock_out_report))
        .route("/low-stock", get(low_stock))
        .route("/daily-movements", get(daily_movements))
        .route("/stock-out-totals", get(stock_out_totals))
}

/// Aggregated dashboard payload
#[utoipa::path(
    get,
    path = "/api/v1/reports/dashboard",
    responses(
        (status = 200, description = "Dashboard summary returned")
    ),
    tag = "reports"
)]
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.reporting.dashboard().await?;
    Ok(success_response(summary))
}

/// Point-in-time inventory snapshot
#[utoipa::path(
    get,
    path = "/api/v1/reports/inventory",
    responses(
        (status = 200, description = "Inventory snapshot returned")
    ),
    tag = "reports"
)]
pub async fn inventory_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let snapshot = state.services.reporting.inventory_snapshot().await?;
    Ok(success_response(snapshot))
}

/// Outgoing stock grouped per product over an optional day range
#[utoipa::path(
    get,
    path = "/api/v1/reports/stock-out",
    params(DateRangeParams),
    responses(
        (status = 200, description = "Stock-out report returned"),
        (status = 400, description = "Invalid date", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn stock_out_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateRangeParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (date_from, date_to) = params.parse()?;
    let report = state
        .services
        .reporting
        .stock_out_report(date_from, date_to)
        .await?;
    Ok(success_response(report))
}

/// Products at or below their reorder level
#[utoipa::path(
    get,
    path = "/api/v1/reports/low-stock",
    params(LowStockParams),
    responses(
        (status = 200, description = "Low-stock list returned")
    ),
    tag = "reports"
)]
pub async fn low_stock(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LowStockParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = params.limit.unwrap_or(20).min(200);
    let products = state.services.reporting.low_stock_list(limit).await?;
    Ok(success_response(products))
}

/// IN and OUT quantities per day over the trailing week
#[utoipa::path(
    get,
    path = "/api/v1/reports/daily-movements",
    responses(
        (status = 200, description = "Daily movement series returned")
    ),
    tag = "reports"
)]
pub async fn daily_movements(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let points = state.services.reporting.daily_series(7).await?;
    Ok(success_response(points))
}

/// Value of outgoing stock over the standard calendar windows
#[utoipa::path(
    get,
    path = "/api/v1/reports/stock-out-totals",
    responses(
        (status = 200, description = "Window totals returned")
    ),
    tag = "reports"
)]
pub async fn stock_out_totals(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let totals = state
        .services
        .reporting
        .stock_out_window_totals(Utc::now().date_naive())
        .await?;
    Ok(success_response(totals))
}
