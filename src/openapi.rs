use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Depot API",
        version = "0.3.0",
        description = r#"
Warehouse back-office API: grid-addressed storage cells, batch-tracked
stock, and import/export orders that mutate inventory atomically.

Batch quantities are not trusted counters; they are recomputed from the
order and activity ledgers on every reconciliation pass.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Import/export order processing"),
        (name = "warehouses", description = "Warehouses, cell grids and direct cell movements"),
        (name = "product-batches", description = "Batch catalog and stock reconciliation"),
        (name = "activities", description = "Append-only activity ledger"),
        (name = "health", description = "Service health")
    ),
    paths(
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::archive_order,

        crate::handlers::warehouses::list_warehouses,
        crate::handlers::warehouses::create_warehouse,
        crate::handlers::warehouses::get_warehouse,
        crate::handlers::warehouses::archive_warehouse,
        crate::handlers::warehouses::get_cells,
        crate::handlers::warehouses::resize_warehouse,
        crate::handlers::warehouses::import_into_cell,
        crate::handlers::warehouses::export_from_cell,
        crate::handlers::warehouses::clear_product,
        crate::handlers::warehouses::clear_cell,

        crate::handlers::product_batches::list_batches,
        crate::handlers::product_batches::create_batch,
        crate::handlers::product_batches::get_batch,
        crate::handlers::product_batches::archive_batch,
        crate::handlers::product_batches::recalculate_batch,
        crate::handlers::product_batches::recalculate_all,

        crate::handlers::activities::list_activities,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            crate::entities::RecordStatus,
            crate::entities::OrderType,
            crate::entities::ActivityType,
            crate::entities::CellStatus,

            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderLineRequest,
            crate::services::orders::UpdateOrderRequest,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderListResponse,

            crate::services::warehouses::CreateWarehouseRequest,
            crate::services::warehouses::ResizeRequest,
            crate::services::warehouses::CellImportRequest,
            crate::services::warehouses::CellExportRequest,
            crate::services::warehouses::WarehouseResponse,
            crate::handlers::warehouses::ClearProductRequest,

            crate::services::product_batches::CreateBatchRequest,
            crate::services::product_batches::BatchResponse,
            crate::services::reconciliation::ReconcileSummary,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Depot API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/warehouses"));
        assert!(json.contains("/api/v1/product-batches"));
    }
}
