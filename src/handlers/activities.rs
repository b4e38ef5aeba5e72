//! Activity ledger read endpoints.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    entities::ActivityType, errors::ServiceError, services::activities::ActivityFilter,
    ApiResponse, AppState, PaginatedResponse,
};

pub fn activities_router() -> Router<AppState> {
    Router::new().route("/", get(list_activities))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityListParams {
    pub warehouse_id: Option<Uuid>,
    pub cell_id: Option<Uuid>,
    pub activity_type: Option<ActivityType>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// List activity rows, newest first
#[utoipa::path(
    get,
    path = "/api/v1/activities",
    params(ActivityListParams),
    responses(
        (status = 200, description = "Activity list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "activities"
)]
pub async fn list_activities(
    State(state): State<AppState>,
    Query(params): Query<ActivityListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(50);
    let (rows, total) = state
        .services
        .activities
        .list(
            ActivityFilter {
                warehouse_id: params.warehouse_id,
                cell_id: params.cell_id,
                activity_type: params.activity_type,
            },
            page,
            per_page,
        )
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        total_pages: total.div_ceil(per_page.max(1)),
        items: rows,
        total,
        page,
        per_page,
    })))
}
