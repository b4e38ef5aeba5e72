//! Product batch endpoints, including on-demand reconciliation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    errors::ServiceError, services::product_batches::CreateBatchRequest, ApiResponse, AppState,
    PaginatedResponse,
};

pub fn product_batches_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_batches).post(create_batch))
        .route("/:id", get(get_batch).delete(archive_batch))
        .route("/:id/recalculate", post(recalculate_batch))
        .route("/recalculate", post(recalculate_all))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// List active batches, newest first
#[utoipa::path(
    get,
    path = "/api/v1/product-batches",
    params(PageParams),
    responses(
        (status = 200, description = "Batch list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "product-batches"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(20);
    let (batches, total) = state.services.batches.list_batches(page, per_page).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        total_pages: total.div_ceil(per_page.max(1)),
        items: batches,
        total,
        page,
        per_page,
    })))
}

/// Register a batch explicitly
#[utoipa::path(
    post,
    path = "/api/v1/product-batches",
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch number already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "product-batches"
)]
pub async fn create_batch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let batch = state.services.batches.create_batch(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(batch))))
}

/// Fetch one batch
#[utoipa::path(
    get,
    path = "/api/v1/product-batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch returned"),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "product-batches"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let batch = state.services.batches.get_batch(id).await?;
    Ok(Json(ApiResponse::success(batch)))
}

/// Archive a batch (soft delete)
#[utoipa::path(
    delete,
    path = "/api/v1/product-batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch archived"),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "product-batches"
)]
pub async fn archive_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.batches.archive_batch(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "archived": id
    }))))
}

/// Recompute one batch's current quantity from the ledger
#[utoipa::path(
    post,
    path = "/api/v1/product-batches/{id}/recalculate",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch reconciled"),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "product-batches"
)]
pub async fn recalculate_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let current = state.services.reconciliation.reconcile(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "batch_id": id,
        "current_quantity": current
    }))))
}

/// Recompute every active batch, best-effort
#[utoipa::path(
    post,
    path = "/api/v1/product-batches/recalculate",
    responses(
        (status = 200, description = "Bulk reconciliation summary returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "product-batches"
)]
pub async fn recalculate_all(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.reconciliation.reconcile_all().await?;
    Ok(Json(ApiResponse::success(summary)))
}
