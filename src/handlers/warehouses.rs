//! Warehouse and cell grid endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::warehouses::{
        CellExportRequest, CellImportRequest, CreateWarehouseRequest, ResizeRequest,
    },
    ApiResponse, AppState, PaginatedResponse,
};

pub fn warehouses_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route("/:id", get(get_warehouse).delete(archive_warehouse))
        .route("/:id/cells", get(get_cells))
        .route("/:id/size", axum::routing::put(resize_warehouse))
        .route("/:id/cells/:cell_id/import", post(import_into_cell))
        .route("/:id/cells/:cell_id/export", post(export_from_cell))
        .route("/:id/cells/:cell_id/clear-product", post(clear_product))
        .route("/:id/cells/:cell_id/clear", axum::routing::delete(clear_cell))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClearProductRequest {
    pub actor: Option<String>,
}

/// List active warehouses
#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    params(PageParams),
    responses(
        (status = 200, description = "Warehouse list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(20);
    let (warehouses, total) = state
        .services
        .warehouses
        .list_warehouses(page, per_page)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        total_pages: total.div_ceil(per_page.max(1)),
        items: warehouses,
        total,
        page,
        per_page,
    })))
}

/// Create a warehouse with its cell grid
#[utoipa::path(
    post,
    path = "/api/v1/warehouses",
    request_body = CreateWarehouseRequest,
    responses(
        (status = 201, description = "Warehouse created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Warehouse code already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<CreateWarehouseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse = state.services.warehouses.create_warehouse(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(warehouse))))
}

/// Fetch one warehouse
#[utoipa::path(
    get,
    path = "/api/v1/warehouses/{id}",
    params(("id" = Uuid, Path, description = "Warehouse id")),
    responses(
        (status = 200, description = "Warehouse returned"),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse = state.services.warehouses.get_warehouse(id).await?;
    Ok(Json(ApiResponse::success(warehouse)))
}

/// Archive a warehouse (soft delete)
#[utoipa::path(
    delete,
    path = "/api/v1/warehouses/{id}",
    params(("id" = Uuid, Path, description = "Warehouse id")),
    responses(
        (status = 200, description = "Warehouse archived"),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn archive_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.warehouses.archive_warehouse(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "archived": id
    }))))
}

/// All cells of a warehouse in grid order
#[utoipa::path(
    get,
    path = "/api/v1/warehouses/{id}/cells",
    params(("id" = Uuid, Path, description = "Warehouse id")),
    responses(
        (status = 200, description = "Cell grid returned"),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn get_cells(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let cells = state.services.warehouses.get_cells(id).await?;
    Ok(Json(ApiResponse::success(cells)))
}

/// Resize the cell grid
#[utoipa::path(
    put,
    path = "/api/v1/warehouses/{id}/size",
    params(("id" = Uuid, Path, description = "Warehouse id")),
    request_body = ResizeRequest,
    responses(
        (status = 200, description = "Warehouse resized"),
        (status = 400, description = "Blocked by occupied cells or invalid bounds", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn resize_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResizeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse = state.services.warehouses.resize(id, payload).await?;
    Ok(Json(ApiResponse::success(warehouse)))
}

/// Import stock directly into a cell
#[utoipa::path(
    post,
    path = "/api/v1/warehouses/{id}/cells/{cell_id}/import",
    params(
        ("id" = Uuid, Path, description = "Warehouse id"),
        ("cell_id" = Uuid, Path, description = "Cell id")
    ),
    request_body = CellImportRequest,
    responses(
        (status = 200, description = "Stock imported"),
        (status = 400, description = "Over capacity or invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse, cell or product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn import_into_cell(
    State(state): State<AppState>,
    Path((id, cell_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CellImportRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let cell = state
        .services
        .warehouses
        .import_into_cell(id, cell_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(cell)))
}

/// Export stock directly from a cell
#[utoipa::path(
    post,
    path = "/api/v1/warehouses/{id}/cells/{cell_id}/export",
    params(
        ("id" = Uuid, Path, description = "Warehouse id"),
        ("cell_id" = Uuid, Path, description = "Cell id")
    ),
    request_body = CellExportRequest,
    responses(
        (status = 200, description = "Stock exported"),
        (status = 404, description = "Warehouse, cell or product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn export_from_cell(
    State(state): State<AppState>,
    Path((id, cell_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CellExportRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let cell = state
        .services
        .warehouses
        .export_from_cell(id, cell_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(cell)))
}

/// Empty one product from a cell, keeping the activity ledger
#[utoipa::path(
    post,
    path = "/api/v1/warehouses/{id}/cells/{cell_id}/clear-product",
    params(
        ("id" = Uuid, Path, description = "Warehouse id"),
        ("cell_id" = Uuid, Path, description = "Cell id")
    ),
    request_body = ClearProductRequest,
    responses(
        (status = 200, description = "Product cleared from cell"),
        (status = 404, description = "Warehouse or cell not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn clear_product(
    State(state): State<AppState>,
    Path((id, cell_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ClearProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let cell = state
        .services
        .warehouses
        .clear_product(id, cell_id, payload.actor)
        .await?;
    Ok(Json(ApiResponse::success(cell)))
}

/// Purge a cell: delete its associations and activity rows
#[utoipa::path(
    delete,
    path = "/api/v1/warehouses/{id}/cells/{cell_id}/clear",
    params(
        ("id" = Uuid, Path, description = "Warehouse id"),
        ("cell_id" = Uuid, Path, description = "Cell id")
    ),
    responses(
        (status = 200, description = "Cell purged"),
        (status = 400, description = "Cell still holds stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse or cell not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn clear_cell(
    State(state): State<AppState>,
    Path((id, cell_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let cell = state.services.warehouses.clear_cell(id, cell_id).await?;
    Ok(Json(ApiResponse::success(cell)))
}
