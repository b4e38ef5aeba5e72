//! End-to-end order flow: import raises cell and batch stock, export draws
//! it down, an oversized export is rejected without side effects, and
//! archiving the import order washes the quantity out on reconciliation.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use depot_api::entities::{warehouse_cell_product, ActivityType, CellStatus, OrderType, RecordStatus};
use depot_api::errors::ServiceError;
use depot_api::services::activities::ActivityFilter;
use depot_api::services::orders::{CreateOrderRequest, OrderLineRequest};
use depot_api::services::warehouses::{
    CellExportRequest, CellImportRequest, CreateWarehouseRequest,
};

fn line(
    product_id: uuid::Uuid,
    cell_id: uuid::Uuid,
    quantity: rust_decimal::Decimal,
    batch: &str,
) -> OrderLineRequest {
    OrderLineRequest {
        product_id,
        warehouse_cell_id: cell_id,
        quantity,
        product_batch_id: None,
        batch_number: Some(batch.to_string()),
        unit_price: Some(dec!(2.50)),
        total_price: Some(quantity * dec!(2.50)),
        production_date: None,
        expiry_date: None,
        supplier: None,
    }
}

#[tokio::test]
async fn import_then_export_then_reject_oversized_export() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-1", "Rice").await;
    let warehouse = app
        .warehouses
        .create_warehouse(CreateWarehouseRequest {
            code: "WH1".into(),
            name: "Main".into(),
            width: 10,
            height: 10,
            default_cell_capacity: Some(dec!(500)),
        })
        .await
        .expect("create warehouse");
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;

    // Import 100 units of batch LOT-1.
    let import = app
        .orders
        .create_order(CreateOrderRequest {
            order_name: Some("inbound rice".into()),
            order_type: OrderType::Import,
            warehouse_id: warehouse.id,
            counterparty: Some("ACME Farms".into()),
            order_date: None,
            notes: None,
            actor: Some("alice".into()),
            details: vec![line(product.id, cell.id, dec!(100), "LOT-1")],
        })
        .await
        .expect("import order");

    let today = Utc::now().date_naive().format("%Y%m%d").to_string();
    assert_eq!(import.order_number, format!("IMP{today}0001"));
    assert_eq!(import.total_value, dec!(250.00));

    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;
    assert_eq!(cell.current_amount, dec!(100));
    assert_eq!(cell.status, CellStatus::Occupied);
    assert_eq!(cell.batch_number.as_deref(), Some("LOT-1"));

    let (batches, _) = app.batches.list_batches(1, 10).await.expect("list batches");
    let batch = batches
        .iter()
        .find(|b| b.batch_number == "LOT-1")
        .expect("batch created by import");
    assert_eq!(batch.current_quantity, dec!(100));

    // Export 40 of the same batch.
    app.orders
        .create_order(CreateOrderRequest {
            order_name: None,
            order_type: OrderType::Export,
            warehouse_id: warehouse.id,
            counterparty: Some("Retailer".into()),
            order_date: None,
            notes: None,
            actor: Some("bob".into()),
            details: vec![line(product.id, cell.id, dec!(40), "LOT-1")],
        })
        .await
        .expect("export order");

    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;
    assert_eq!(cell.current_amount, dec!(60));

    let batch = app.batches.get_batch(batch.id).await.expect("get batch");
    assert_eq!(batch.current_quantity, dec!(60));

    let assoc = warehouse_cell_product::Entity::find()
        .filter(warehouse_cell_product::Column::CellId.eq(cell.id))
        .one(app.db.as_ref())
        .await
        .expect("query association")
        .expect("association exists");
    assert_eq!(assoc.remaining_quantity, dec!(60));

    // An export larger than the remaining stock is rejected whole.
    let err = app
        .orders
        .create_order(CreateOrderRequest {
            order_name: None,
            order_type: OrderType::Export,
            warehouse_id: warehouse.id,
            counterparty: None,
            order_date: None,
            notes: None,
            actor: None,
            details: vec![line(product.id, cell.id, dec!(1000), "LOT-1")],
        })
        .await
        .expect_err("oversized export must fail");
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // Nothing changed: cell, batch and ledger are as before the attempt.
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;
    assert_eq!(cell.current_amount, dec!(60));
    let batch = app.batches.get_batch(batch.id).await.expect("get batch");
    assert_eq!(batch.current_quantity, dec!(60));
    let (rows, total) = app
        .activities
        .list(
            ActivityFilter {
                warehouse_id: Some(warehouse.id),
                cell_id: None,
                activity_type: Some(ActivityType::Export),
            },
            1,
            10,
        )
        .await
        .expect("list activities");
    assert_eq!(total, 1);
    assert_eq!(rows[0].quantity, dec!(40));
    assert_eq!(rows[0].batch_number.as_deref(), Some("LOT-1"));
}

#[tokio::test]
async fn archiving_the_import_order_reverses_the_batch_on_reconcile() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-2", "Flour").await;
    let warehouse = app
        .warehouses
        .create_warehouse(CreateWarehouseRequest {
            code: "WH2".into(),
            name: "Annex".into(),
            width: 3,
            height: 3,
            default_cell_capacity: Some(dec!(200)),
        })
        .await
        .expect("create warehouse");
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "B02").await;

    let import = app
        .orders
        .create_order(CreateOrderRequest {
            order_name: None,
            order_type: OrderType::Import,
            warehouse_id: warehouse.id,
            counterparty: None,
            order_date: None,
            notes: None,
            actor: None,
            details: vec![line(product.id, cell.id, dec!(80), "LOT-2")],
        })
        .await
        .expect("import order");

    let (batches, _) = app.batches.list_batches(1, 10).await.expect("list");
    let batch = batches
        .iter()
        .find(|b| b.batch_number == "LOT-2")
        .expect("batch exists");
    assert_eq!(batch.current_quantity, dec!(80));

    app.orders.archive_order(import.id).await.expect("archive");

    // Archived orders drop out of the imported side of the formula.
    let current = app
        .reconciliation
        .reconcile(batch.id)
        .await
        .expect("reconcile");
    assert_eq!(current, dec!(0));
}

#[tokio::test]
async fn import_over_cell_capacity_is_rejected() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-3", "Sugar").await;
    let warehouse = app
        .warehouses
        .create_warehouse(CreateWarehouseRequest {
            code: "WH3".into(),
            name: "Small".into(),
            width: 2,
            height: 2,
            default_cell_capacity: Some(dec!(100)),
        })
        .await
        .expect("create warehouse");
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;

    let err = app
        .orders
        .create_order(CreateOrderRequest {
            order_name: None,
            order_type: OrderType::Import,
            warehouse_id: warehouse.id,
            counterparty: None,
            order_date: None,
            notes: None,
            actor: None,
            details: vec![line(product.id, cell.id, dec!(150), "LOT-3")],
        })
        .await
        .expect_err("over-capacity import must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;
    assert_eq!(cell.current_amount, dec!(0));
    assert_eq!(cell.status, CellStatus::Empty);
}

#[tokio::test]
async fn export_of_an_untracked_product_writes_a_shortfall_marker() {
    let app = common::setup().await;
    let tracked = common::seed_product(app.db.as_ref(), "SKU-5A", "Pepper").await;
    let untracked = common::seed_product(app.db.as_ref(), "SKU-5B", "Paprika").await;
    let warehouse = app
        .warehouses
        .create_warehouse(CreateWarehouseRequest {
            code: "WH5".into(),
            name: "Mixed".into(),
            width: 2,
            height: 2,
            default_cell_capacity: Some(dec!(100)),
        })
        .await
        .expect("create warehouse");
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;

    app.warehouses
        .import_into_cell(
            warehouse.id,
            cell.id,
            CellImportRequest {
                product_id: tracked.id,
                quantity: dec!(40),
                batch_number: Some("LOT-5".into()),
                unit_price: None,
                production_date: None,
                expiry_date: None,
                supplier: None,
                actor: None,
                notes: None,
            },
        )
        .await
        .expect("import");

    // A product with no import association in the cell draws from the
    // cell aggregate and leaves a negative marker row behind.
    app.warehouses
        .export_from_cell(
            warehouse.id,
            cell.id,
            CellExportRequest {
                product_id: untracked.id,
                quantity: dec!(15),
                batch_number: None,
                actor: None,
                notes: None,
            },
        )
        .await
        .expect("export against the pool");

    let cell_after = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;
    assert_eq!(cell_after.current_amount, dec!(25));

    let marker = warehouse_cell_product::Entity::find()
        .filter(warehouse_cell_product::Column::CellId.eq(cell.id))
        .filter(warehouse_cell_product::Column::ProductId.eq(untracked.id))
        .one(app.db.as_ref())
        .await
        .expect("query marker")
        .expect("shortfall marker exists");
    assert_eq!(marker.quantity, dec!(-15));
    assert_eq!(marker.remaining_quantity, dec!(0));
    assert!(marker.batch_number.is_none());
    assert_eq!(marker.status, RecordStatus::Active);

    // The pool still caps the export.
    let err = app
        .warehouses
        .export_from_cell(
            warehouse.id,
            cell.id,
            CellExportRequest {
                product_id: untracked.id,
                quantity: dec!(100),
                batch_number: None,
                actor: None,
                notes: None,
            },
        )
        .await
        .expect_err("export beyond the pool must fail");
    assert_matches!(err, ServiceError::InsufficientStock(_));
}

#[tokio::test]
async fn order_numbers_increment_within_a_day() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-4", "Salt").await;
    let warehouse = app
        .warehouses
        .create_warehouse(CreateWarehouseRequest {
            code: "WH4".into(),
            name: "Seq".into(),
            width: 2,
            height: 2,
            default_cell_capacity: Some(dec!(1000)),
        })
        .await
        .expect("create warehouse");
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;

    let today = Utc::now().date_naive().format("%Y%m%d").to_string();
    for seq in 1..=3u64 {
        let order = app
            .orders
            .create_order(CreateOrderRequest {
                order_name: None,
                order_type: OrderType::Import,
                warehouse_id: warehouse.id,
                counterparty: None,
                order_date: None,
                notes: None,
                actor: None,
                details: vec![line(product.id, cell.id, dec!(10), "LOT-4")],
            })
            .await
            .expect("import order");
        assert_eq!(order.order_number, format!("IMP{today}{seq:04}"));
    }
}
