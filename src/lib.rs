//! Depot API: warehouse back-office service.
//!
//! Warehouses expose a grid of storage cells; import/export orders and
//! direct cell movements mutate stock through a shared movement core, and
//! batch quantities are reconciled from the resulting ledgers.

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::events::EventSender;
use crate::handlers::AppServices;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub services: AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: EventSender,
    ) -> Self {
        let services = AppServices {
            orders: Arc::new(services::orders::OrderService::new(
                db.clone(),
                event_sender.clone(),
            )),
            warehouses: Arc::new(services::warehouses::WarehouseService::new(
                db.clone(),
                event_sender.clone(),
            )),
            batches: Arc::new(services::product_batches::ProductBatchService::new(
                db.clone(),
            )),
            reconciliation: Arc::new(services::reconciliation::ReconciliationService::new(
                db.clone(),
                event_sender.clone(),
            )),
            activities: Arc::new(services::activities::ActivityService::new(db.clone())),
        };
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

/// Standard response envelope.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

/// Standard API result type for JSON responses.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/orders", handlers::orders::orders_router())
        .nest("/warehouses", handlers::warehouses::warehouses_router())
        .nest(
            "/product-batches",
            handlers::product_batches::product_batches_router(),
        )
        .nest("/activities", handlers::activities::activities_router())
}

/// Full application router: versioned API, health endpoints, Swagger UI.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .merge(openapi::swagger_ui())
        .with_state(state)
}

/// Liveness plus a database round-trip.
async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_ok = state
        .db
        .execute_unprepared("SELECT 1")
        .await
        .is_ok();

    Ok(Json(ApiResponse::success(json!({
        "status": if db_ok { "healthy" } else { "degraded" },
        "database": if db_ok { "up" } else { "down" },
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(Json(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}
