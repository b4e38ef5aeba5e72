//! Cell grid behavior: creation, resize in both directions, blocking
//! cells, and the two clearing operations.

mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use depot_api::entities::{warehouse_activity, warehouse_cell_product, CellStatus};
use depot_api::errors::ServiceError;
use depot_api::services::warehouses::{
    CellExportRequest, CellImportRequest, CreateWarehouseRequest, ResizeRequest,
};

async fn make_warehouse(
    app: &common::TestApp,
    code: &str,
    width: i32,
    height: i32,
) -> depot_api::services::warehouses::WarehouseResponse {
    app.warehouses
        .create_warehouse(CreateWarehouseRequest {
            code: code.into(),
            name: format!("{code} warehouse"),
            width,
            height,
            default_cell_capacity: Some(dec!(100)),
        })
        .await
        .expect("create warehouse")
}

fn import_req(product_id: uuid::Uuid, quantity: rust_decimal::Decimal) -> CellImportRequest {
    CellImportRequest {
        product_id,
        quantity,
        batch_number: Some("LOT-G".into()),
        unit_price: None,
        production_date: None,
        expiry_date: None,
        supplier: None,
        actor: None,
        notes: None,
    }
}

#[tokio::test]
async fn creation_builds_the_full_grid_with_codes() {
    let app = common::setup().await;
    let warehouse = make_warehouse(&app, "GRID", 4, 3).await;

    let cells = app.warehouses.get_cells(warehouse.id).await.expect("cells");
    assert_eq!(cells.len(), 12);
    assert_eq!(cells.first().map(|c| c.cell_code.as_str()), Some("A01"));
    assert_eq!(cells.last().map(|c| c.cell_code.as_str()), Some("C04"));
    assert!(cells.iter().all(|c| c.status == CellStatus::Empty));
}

#[tokio::test]
async fn grow_then_shrink_back_is_lossless_while_empty() {
    let app = common::setup().await;
    let warehouse = make_warehouse(&app, "RSZ", 2, 2).await;

    let resized = app
        .warehouses
        .resize(
            warehouse.id,
            ResizeRequest {
                width: 3,
                height: 4,
                default_cell_capacity: None,
            },
        )
        .await
        .expect("grow");
    assert_eq!((resized.width, resized.height), (3, 4));
    let cells = app.warehouses.get_cells(warehouse.id).await.expect("cells");
    assert_eq!(cells.len(), 12);
    assert!(cells.iter().any(|c| c.cell_code == "D03"));

    let resized = app
        .warehouses
        .resize(
            warehouse.id,
            ResizeRequest {
                width: 2,
                height: 2,
                default_cell_capacity: None,
            },
        )
        .await
        .expect("shrink");
    assert_eq!((resized.width, resized.height), (2, 2));
    let cells = app.warehouses.get_cells(warehouse.id).await.expect("cells");
    assert_eq!(cells.len(), 4);
}

#[tokio::test]
async fn shrink_is_blocked_by_occupied_cells_and_names_them() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-G1", "Corn").await;
    let warehouse = make_warehouse(&app, "BLK", 10, 10).await;

    // Stock a cell in row 8, which a shrink to 5 rows would delete.
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "H03").await;
    app.warehouses
        .import_into_cell(warehouse.id, cell.id, import_req(product.id, dec!(25)))
        .await
        .expect("import");

    let err = app
        .warehouses
        .resize(
            warehouse.id,
            ResizeRequest {
                width: 10,
                height: 5,
                default_cell_capacity: None,
            },
        )
        .await
        .expect_err("shrink through stock must fail");
    assert_matches!(err, ServiceError::InvalidOperation(ref msg) if msg.contains("H03"));

    // Nothing was deleted.
    let cells = app.warehouses.get_cells(warehouse.id).await.expect("cells");
    assert_eq!(cells.len(), 100);
}

#[tokio::test]
async fn shrink_succeeds_over_a_fully_exported_cell() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-G5", "Millet").await;
    let warehouse = make_warehouse(&app, "EMT", 3, 3).await;

    // Stock C03, then export everything: the cell is empty again but still
    // owns its archived association row.
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "C03").await;
    app.warehouses
        .import_into_cell(warehouse.id, cell.id, import_req(product.id, dec!(10)))
        .await
        .expect("import");
    app.warehouses
        .export_from_cell(
            warehouse.id,
            cell.id,
            CellExportRequest {
                product_id: product.id,
                quantity: dec!(10),
                batch_number: Some("LOT-G".into()),
                actor: None,
                notes: None,
            },
        )
        .await
        .expect("export everything");

    let resized = app
        .warehouses
        .resize(
            warehouse.id,
            ResizeRequest {
                width: 2,
                height: 2,
                default_cell_capacity: None,
            },
        )
        .await
        .expect("shrink over the emptied cell");
    assert_eq!((resized.width, resized.height), (2, 2));
    let cells = app.warehouses.get_cells(warehouse.id).await.expect("cells");
    assert_eq!(cells.len(), 4);

    // The deleted cell took its association rows with it.
    let assoc_count = warehouse_cell_product::Entity::find()
        .filter(warehouse_cell_product::Column::CellId.eq(cell.id))
        .count(app.db.as_ref())
        .await
        .expect("count associations");
    assert_eq!(assoc_count, 0);
}

#[tokio::test]
async fn resize_rejects_out_of_range_grids() {
    let app = common::setup().await;
    let warehouse = make_warehouse(&app, "OOB", 2, 2).await;

    for (width, height) in [(100, 5), (5, 27), (0, 3), (3, 0)] {
        let err = app
            .warehouses
            .resize(
                warehouse.id,
                ResizeRequest {
                    width,
                    height,
                    default_cell_capacity: None,
                },
            )
            .await
            .expect_err("invalid bounds");
        assert_matches!(err, ServiceError::ValidationError(_));
    }
}

#[tokio::test]
async fn cell_goes_full_at_ninety_percent() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-G2", "Oats").await;
    let warehouse = make_warehouse(&app, "FUL", 2, 2).await;
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;

    app.warehouses
        .import_into_cell(warehouse.id, cell.id, import_req(product.id, dec!(90)))
        .await
        .expect("import");

    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A01").await;
    assert_eq!(cell.status, CellStatus::Full);
}

#[tokio::test]
async fn clear_product_keeps_the_ledger() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-G3", "Barley").await;
    let warehouse = make_warehouse(&app, "CLP", 2, 2).await;
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "B02").await;

    app.warehouses
        .import_into_cell(warehouse.id, cell.id, import_req(product.id, dec!(40)))
        .await
        .expect("import");

    let cleared = app
        .warehouses
        .clear_product(warehouse.id, cell.id, Some("dave".into()))
        .await
        .expect("clear product");
    assert_eq!(cleared.current_amount, dec!(0));
    assert_eq!(cleared.status, CellStatus::Empty);
    assert!(cleared.product_id.is_none());
    assert!(cleared.batch_number.is_none());

    // Import and ClearProduct rows both survive.
    let activity_count = warehouse_activity::Entity::find()
        .filter(warehouse_activity::Column::CellId.eq(cell.id))
        .count(app.db.as_ref())
        .await
        .expect("count activities");
    assert_eq!(activity_count, 2);
}

#[tokio::test]
async fn clear_cell_refuses_while_stocked_then_purges() {
    let app = common::setup().await;
    let product = common::seed_product(app.db.as_ref(), "SKU-G4", "Rye").await;
    let warehouse = make_warehouse(&app, "PRG", 2, 2).await;
    let cell = common::cell_by_code(app.db.as_ref(), warehouse.id, "A02").await;

    app.warehouses
        .import_into_cell(warehouse.id, cell.id, import_req(product.id, dec!(15)))
        .await
        .expect("import");

    let err = app
        .warehouses
        .clear_cell(warehouse.id, cell.id)
        .await
        .expect_err("purge of a stocked cell must fail");
    assert_matches!(err, ServiceError::InvalidOperation(_));

    app.warehouses
        .clear_product(warehouse.id, cell.id, None)
        .await
        .expect("clear product first");

    let purged = app
        .warehouses
        .clear_cell(warehouse.id, cell.id)
        .await
        .expect("purge");
    assert_eq!(purged.current_amount, dec!(0));

    let activity_count = warehouse_activity::Entity::find()
        .filter(warehouse_activity::Column::CellId.eq(cell.id))
        .count(app.db.as_ref())
        .await
        .expect("count activities");
    assert_eq!(activity_count, 0);

    let assoc_count = warehouse_cell_product::Entity::find()
        .filter(warehouse_cell_product::Column::CellId.eq(cell.id))
        .count(app.db.as_ref())
        .await
        .expect("count associations");
    assert_eq!(assoc_count, 0);
}
