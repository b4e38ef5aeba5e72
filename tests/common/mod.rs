//! Shared test fixture: an in-memory database with migrations applied and
//! the full service set wired to a drained event channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use depot_api::entities::{
    product, warehouse_cell, RecordStatus,
};
use depot_api::events::{self, EventSender};
use depot_api::migrator::Migrator;
use depot_api::services::{
    activities::ActivityService, orders::OrderService, product_batches::ProductBatchService,
    reconciliation::ReconciliationService, warehouses::WarehouseService,
};

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub orders: OrderService,
    pub warehouses: WarehouseService,
    pub batches: ProductBatchService,
    pub reconciliation: ReconciliationService,
    pub activities: ActivityService,
}

pub async fn setup() -> TestApp {
    // A single connection keeps every query on the same in-memory database.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    let db = Arc::new(Database::connect(opt).await.expect("connect sqlite"));
    Migrator::up(db.as_ref(), None).await.expect("migrations");

    let (tx, rx) = tokio::sync::mpsc::channel(64);
    tokio::spawn(events::process_events(rx));
    let sender = EventSender::new(tx);

    TestApp {
        orders: OrderService::new(db.clone(), sender.clone()),
        warehouses: WarehouseService::new(db.clone(), sender.clone()),
        batches: ProductBatchService::new(db.clone()),
        reconciliation: ReconciliationService::new(db.clone(), sender),
        activities: ActivityService::new(db.clone()),
        db,
    }
}

pub async fn seed_product(db: &DatabaseConnection, sku: &str, name: &str) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(name.to_string()),
        unit: Set(Some("kg".to_string())),
        supplier: Set(None),
        production_date: Set(None),
        expiry_date: Set(None),
        status: Set(RecordStatus::Active),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("seed product")
}

pub async fn cell_by_code(
    db: &DatabaseConnection,
    warehouse_id: Uuid,
    code: &str,
) -> warehouse_cell::Model {
    warehouse_cell::Entity::find()
        .filter(warehouse_cell::Column::WarehouseId.eq(warehouse_id))
        .filter(warehouse_cell::Column::CellCode.eq(code))
        .one(db)
        .await
        .expect("query cell")
        .unwrap_or_else(|| panic!("cell {code} not found"))
}

