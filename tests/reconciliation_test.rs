//! Reconciliation formula tests: current = max(0, imported - exported -
//! cleared), recomputed from the ledgers rather than counted forward.

mod common;

use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use depot_api::entities::{warehouse_cell_product, OrderType, RecordStatus};
use depot_api::services::orders::{CreateOrderRequest, OrderLineRequest};
use depot_api::services::warehouses::{CellExportRequest, CreateWarehouseRequest};

async fn setup_with_stock(
    batch: &str,
    quantity: rust_decimal::Decimal,
) -> (common::TestApp, uuid::Uuid, uuid::Uuid, uuid::Uuid) {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-R", "Beans").await;
    let warehouse = app
        .warehouses
        .create_warehouse(CreateWarehouseRequest {
            code: "WHR".into(),
            name: "Reconcile".into(),
            width: 4,
            height: 4,
            default_cell_capacity: Some(dec!(1000)),
        })
        .await
        .expect("create warehouse");
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;

    app.orders
        .create_order(CreateOrderRequest {
            order_name: None,
            order_type: OrderType::Import,
            warehouse_id: warehouse.id,
            counterparty: None,
            order_date: None,
            notes: None,
            actor: None,
            details: vec![OrderLineRequest {
                product_id: product.id,
                warehouse_cell_id: cell.id,
                quantity,
                product_batch_id: None,
                batch_number: Some(batch.to_string()),
                unit_price: None,
                total_price: None,
                production_date: None,
                expiry_date: None,
                supplier: None,
            }],
        })
        .await
        .expect("import order");

    (app, warehouse.id, cell.id, product.id)
}

async fn batch_id_by_number(app: &common::TestApp, number: &str) -> uuid::Uuid {
    let (batches, _) = app.batches.list_batches(1, 50).await.expect("list");
    batches
        .iter()
        .find(|b| b.batch_number == number)
        .unwrap_or_else(|| panic!("batch {number} not found"))
        .id
}

#[tokio::test]
async fn exports_and_clears_subtract_from_the_batch() {
    let (app, warehouse_id, cell_id, product_id) = setup_with_stock("LOT-R1", dec!(200)).await;
    let batch_id = batch_id_by_number(&app, "LOT-R1").await;

    app.warehouses
        .export_from_cell(
            warehouse_id,
            cell_id,
            CellExportRequest {
                product_id,
                quantity: dec!(50),
                batch_number: Some("LOT-R1".into()),
                actor: None,
                notes: None,
            },
        )
        .await
        .expect("export");

    let current = app.reconciliation.reconcile(batch_id).await.expect("reconcile");
    assert_eq!(current, dec!(150));

    // Clearing the product records the remaining 150 as a ClearProduct row.
    app.warehouses
        .clear_product(warehouse_id, cell_id, Some("carol".into()))
        .await
        .expect("clear product");

    let current = app.reconciliation.reconcile(batch_id).await.expect("reconcile");
    assert_eq!(current, dec!(0));
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let (app, _, _, _) = setup_with_stock("LOT-R2", dec!(75)).await;
    let batch_id = batch_id_by_number(&app, "LOT-R2").await;

    let first = app.reconciliation.reconcile(batch_id).await.expect("first");
    let second = app.reconciliation.reconcile(batch_id).await.expect("second");
    let third = app.reconciliation.reconcile(batch_id).await.expect("third");
    assert_eq!(first, dec!(75));
    assert_eq!(second, first);
    assert_eq!(third, first);
}

#[tokio::test]
async fn current_quantity_clamps_at_zero() {
    let (app, warehouse_id, cell_id, product_id) = setup_with_stock("LOT-R3", dec!(30)).await;
    let batch_id = batch_id_by_number(&app, "LOT-R3").await;

    app.warehouses
        .export_from_cell(
            warehouse_id,
            cell_id,
            CellExportRequest {
                product_id,
                quantity: dec!(30),
                batch_number: Some("LOT-R3".into()),
                actor: None,
                notes: None,
            },
        )
        .await
        .expect("export everything");

    // Drawing an association down to zero retires it.
    let assoc = warehouse_cell_product::Entity::find()
        .filter(warehouse_cell_product::Column::CellId.eq(cell_id))
        .one(app.db.as_ref())
        .await
        .expect("query association")
        .expect("association exists");
    assert_eq!(assoc.remaining_quantity, dec!(0));
    assert_eq!(assoc.status, RecordStatus::Archived);

    // Clearing after a full export adds a zero-quantity clear row; even if
    // extra subtraction rows existed the result stays clamped at zero.
    app.warehouses
        .clear_product(warehouse_id, cell_id, None)
        .await
        .expect("clear product");

    let current = app.reconciliation.reconcile(batch_id).await.expect("reconcile");
    assert_eq!(current, dec!(0));
}

#[tokio::test]
async fn reconcile_all_reports_every_active_batch() {
    let (app, warehouse_id, _, product_id) = setup_with_stock("LOT-R4", dec!(10)).await;

    // A second batch in another cell.
    let cell = common::cell_by_code(app.db.as_ref(), warehouse_id, "B02").await;
    app.orders
        .create_order(CreateOrderRequest {
            order_name: None,
            order_type: OrderType::Import,
            warehouse_id,
            counterparty: None,
            order_date: None,
            notes: None,
            actor: None,
            details: vec![OrderLineRequest {
                product_id,
                warehouse_cell_id: cell.id,
                quantity: dec!(20),
                product_batch_id: None,
                batch_number: Some("LOT-R5".into()),
                unit_price: None,
                total_price: None,
                production_date: None,
                expiry_date: None,
                supplier: None,
            }],
        })
        .await
        .expect("second import");

    let summary = app.reconciliation.reconcile_all().await.expect("bulk");
    assert_eq!(summary.reconciled, 2);
    assert_eq!(summary.failed, 0);
}
