use super::common::success_response;
use crate::{
    entities::activity_log::ActivityAction,
    errors::ServiceError,
    services::activity::ActivityFilter,
    AppState,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityListParams {
    /// Action name, e.g. CREATE or STOCK_OUT
    pub action: Option<String>,
    /// Inclusive start day, YYYY-MM-DD
    pub date_from: Option<NaiveDate>,
    /// Inclusive end day, YYYY-MM-DD
    pub date_to: Option<NaiveDate>,
    pub limit: Option<u64>,
}

pub fn activity_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_activity))
}

/// List audit entries, newest first
#[utoipa::path(
    get,
    path = "/api/v1/activity",
    params(ActivityListParams),
    responses(
        (status = 200, description = "Audit entries returned"),
        (status = 400, description = "Unknown action", body = crate::errors::ErrorResponse)
    ),
    tag = "activity"
)]
pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let action = params
        .action
        .as_deref()
        .map(|raw| {
            raw.to_ascii_uppercase()
                .parse::<ActivityAction>()
                .map_err(|_| {
                    ServiceError::ValidationError(format!("Unknown activity action '{}'", raw))
                })
        })
        .transpose()?;

    let entries = state
        .services
        .activity
        .list(ActivityFilter {
            action,
            date_from: params.date_from,
            date_to: params.date_to,
            limit: Some(params.limit.unwrap_or(100).min(1000)),
        })
        .await?;

    Ok(success_response(entries))
}
