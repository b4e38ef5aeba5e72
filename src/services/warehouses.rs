//! Warehouses and their cell grids.
//!
//! A warehouse owns a `height` x `width` grid of cells addressed by row
//! letter and column number ("A01"). Cells are created and deleted only by
//! the resize operation; everything else mutates them in place.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        product_batch::{self, Entity as ProductBatch},
        warehouse::{self, Entity as Warehouse},
        warehouse_activity::{self, Entity as WarehouseActivity},
        warehouse_cell::{self, Entity as WarehouseCell},
        warehouse_cell_product::{self, Entity as WarehouseCellProduct},
        ActivityType, CellStatus, RecordStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        activities, reconciliation,
        stock::{self, ExportMove, ImportMove},
    },
};

/// Grid bounds: rows map to letters A..Z, columns to 01..99.
pub const MAX_GRID_HEIGHT: i32 = 26;
pub const MAX_GRID_WIDTH: i32 = 99;

/// Capacity assigned to newly created cells when none is requested.
const DEFAULT_CELL_CAPACITY: Decimal = dec!(100);

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateWarehouseRequest {
    pub code: String,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub default_cell_capacity: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResizeRequest {
    pub width: i32,
    pub height: i32,
    pub default_cell_capacity: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CellImportRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub batch_number: Option<String>,
    pub unit_price: Option<Decimal>,
    pub production_date: Option<chrono::NaiveDate>,
    pub expiry_date: Option<chrono::NaiveDate>,
    pub supplier: Option<String>,
    pub actor: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CellExportRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub batch_number: Option<String>,
    pub actor: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub status: RecordStatus,
}

impl From<warehouse::Model> for WarehouseResponse {
    fn from(m: warehouse::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            name: m.name,
            width: m.width,
            height: m.height,
            status: m.status,
        }
    }
}

fn validate_dimensions(width: i32, height: i32) -> Result<(), ServiceError> {
    if width < 1 || height < 1 {
        return Err(ServiceError::ValidationError(
            "grid dimensions must be at least 1x1".to_string(),
        ));
    }
    if height > MAX_GRID_HEIGHT {
        return Err(ServiceError::ValidationError(format!(
            "grid height {height} exceeds the maximum of {MAX_GRID_HEIGHT} rows"
        )));
    }
    if width > MAX_GRID_WIDTH {
        return Err(ServiceError::ValidationError(format!(
            "grid width {width} exceeds the maximum of {MAX_GRID_WIDTH} columns"
        )));
    }
    Ok(())
}

fn new_cell(
    warehouse_id: Uuid,
    row: i32,
    col: i32,
    capacity: Decimal,
) -> warehouse_cell::ActiveModel {
    warehouse_cell::ActiveModel {
        id: Set(Uuid::new_v4()),
        warehouse_id: Set(warehouse_id),
        grid_row: Set(row),
        grid_col: Set(col),
        cell_code: Set(stock::cell_code(row, col)),
        max_capacity: Set(capacity),
        current_amount: Set(Decimal::ZERO),
        product_id: Set(None),
        product_name: Set(None),
        batch_number: Set(None),
        production_date: Set(None),
        expiry_date: Set(None),
        supplier: Set(None),
        status: Set(CellStatus::Empty),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
}

#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn load_warehouse(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        Warehouse::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("warehouse {id} not found")))
    }

    /// Creates a warehouse and its full cell grid in one transaction.
    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_warehouse(
        &self,
        request: CreateWarehouseRequest,
    ) -> Result<WarehouseResponse, ServiceError> {
        let db = self.db_pool.as_ref();

        if request.code.trim().is_empty() || request.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "warehouse code and name are required".to_string(),
            ));
        }
        validate_dimensions(request.width, request.height)?;

        let duplicate = Warehouse::find()
            .filter(warehouse::Column::Code.eq(request.code.clone()))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "warehouse code {} already exists",
                request.code
            )));
        }

        let capacity = request.default_cell_capacity.unwrap_or(DEFAULT_CELL_CAPACITY);
        if capacity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "default cell capacity must be greater than zero".to_string(),
            ));
        }

        let warehouse = db
            .transaction::<_, warehouse::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let warehouse = warehouse::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        code: Set(request.code.clone()),
                        name: Set(request.name.clone()),
                        width: Set(request.width),
                        height: Set(request.height),
                        status: Set(RecordStatus::Active),
                        created_at: Set(Utc::now()),
                        updated_at: Set(None),
                    }
                    .insert(txn)
                    .await?;

                    for row in 0..request.height {
                        for col in 0..request.width {
                            new_cell(warehouse.id, row, col, capacity).insert(txn).await?;
                        }
                    }
                    Ok(warehouse)
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        Ok(warehouse.into())
    }

    pub async fn get_warehouse(&self, id: Uuid) -> Result<WarehouseResponse, ServiceError> {
        Ok(self.load_warehouse(id).await?.into())
    }

    pub async fn list_warehouses(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<WarehouseResponse>, u64), ServiceError> {
        let paginator = Warehouse::find()
            .filter(warehouse::Column::Status.eq(RecordStatus::Active))
            .order_by_asc(warehouse::Column::Code)
            .paginate(self.db_pool.as_ref(), per_page.max(1));
        let total = paginator.num_items().await?;
        let warehouses = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((warehouses.into_iter().map(Into::into).collect(), total))
    }

    /// All cells of a warehouse in grid order, for rendering the layout.
    pub async fn get_cells(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<warehouse_cell::Model>, ServiceError> {
        self.load_warehouse(warehouse_id).await?;
        let cells = WarehouseCell::find()
            .filter(warehouse_cell::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(warehouse_cell::Column::GridRow)
            .order_by_asc(warehouse_cell::Column::GridCol)
            .all(self.db_pool.as_ref())
            .await?;
        Ok(cells)
    }

    /// Resizes the grid. Cells falling outside the new bounds must be
    /// empty; the operation is rejected listing every blocking cell code.
    /// Empty out-of-range cells are deleted, missing positions created.
    #[instrument(skip(self, request), fields(width = request.width, height = request.height))]
    pub async fn resize(
        &self,
        warehouse_id: Uuid,
        request: ResizeRequest,
    ) -> Result<WarehouseResponse, ServiceError> {
        let db = self.db_pool.as_ref();
        validate_dimensions(request.width, request.height)?;
        let warehouse = self.load_warehouse(warehouse_id).await?;

        let warehouse = db
            .transaction::<_, warehouse::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let cells = WarehouseCell::find()
                        .filter(warehouse_cell::Column::WarehouseId.eq(warehouse.id))
                        .all(txn)
                        .await?;

                    let out_of_range = |c: &warehouse_cell::Model| {
                        c.grid_row >= request.height || c.grid_col >= request.width
                    };

                    let mut blocking: Vec<String> = cells
                        .iter()
                        .filter(|c| out_of_range(c) && c.current_amount > Decimal::ZERO)
                        .map(|c| c.cell_code.clone())
                        .collect();
                    if !blocking.is_empty() {
                        blocking.sort();
                        return Err(ServiceError::InvalidOperation(format!(
                            "cells still holding stock block the resize: {}",
                            blocking.join(", ")
                        )));
                    }

                    // An emptied cell can still own archived or shortfall
                    // association rows; drop them before the cell itself.
                    let doomed: Vec<Uuid> = cells
                        .iter()
                        .filter(|c| out_of_range(c))
                        .map(|c| c.id)
                        .collect();
                    if !doomed.is_empty() {
                        WarehouseCellProduct::delete_many()
                            .filter(warehouse_cell_product::Column::CellId.is_in(doomed))
                            .exec(txn)
                            .await?;
                    }
                    for cell in cells.iter().filter(|c| out_of_range(c)) {
                        cell.clone().delete(txn).await?;
                    }

                    let capacity = request
                        .default_cell_capacity
                        .unwrap_or(DEFAULT_CELL_CAPACITY);
                    for row in 0..request.height {
                        for col in 0..request.width {
                            let exists = cells
                                .iter()
                                .any(|c| c.grid_row == row && c.grid_col == col);
                            if !exists {
                                new_cell(warehouse.id, row, col, capacity)
                                    .insert(txn)
                                    .await?;
                            }
                        }
                    }

                    let mut active: warehouse::ActiveModel = warehouse.into();
                    active.width = Set(request.width);
                    active.height = Set(request.height);
                    active.updated_at = Set(Some(Utc::now()));
                    Ok(active.update(txn).await?)
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        if let Err(e) = self
            .event_sender
            .send(Event::WarehouseResized {
                warehouse_id: warehouse.id,
                width: warehouse.width,
                height: warehouse.height,
            })
            .await
        {
            warn!(%warehouse_id, error = %e, "failed to emit resize event");
        }
        Ok(warehouse.into())
    }

    /// Direct import into one cell, outside any order.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = %request.quantity))]
    pub async fn import_into_cell(
        &self,
        warehouse_id: Uuid,
        cell_id: Uuid,
        request: CellImportRequest,
    ) -> Result<warehouse_cell::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        self.load_warehouse(warehouse_id).await?;

        let mv = ImportMove {
            product_id: request.product_id,
            cell_id,
            quantity: request.quantity,
            batch_number: request.batch_number,
            unit_price: request.unit_price,
            production_date: request.production_date,
            expiry_date: request.expiry_date,
            supplier: request.supplier,
            actor: request.actor,
            notes: request.notes,
        };

        let applied = db
            .transaction::<_, stock::AppliedMove, ServiceError>(move |txn| {
                Box::pin(async move { stock::apply_import(txn, warehouse_id, &mv).await })
            })
            .await
            .map_err(unwrap_txn_error)?;

        self.reconcile_by_number(applied.batch_number.as_deref()).await;
        if let Err(e) = self
            .event_sender
            .send(Event::StockImported {
                warehouse_id,
                cell_id,
                product_id: applied.product.id,
                quantity: request.quantity,
            })
            .await
        {
            warn!(%cell_id, error = %e, "failed to emit import event");
        }
        Ok(applied.cell)
    }

    /// Direct export from one cell, outside any order.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = %request.quantity))]
    pub async fn export_from_cell(
        &self,
        warehouse_id: Uuid,
        cell_id: Uuid,
        request: CellExportRequest,
    ) -> Result<warehouse_cell::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        self.load_warehouse(warehouse_id).await?;

        let mv = ExportMove {
            product_id: request.product_id,
            cell_id,
            quantity: request.quantity,
            batch_number: request.batch_number,
            actor: request.actor,
            notes: request.notes,
        };

        let applied = db
            .transaction::<_, stock::AppliedMove, ServiceError>(move |txn| {
                Box::pin(async move { stock::apply_export(txn, warehouse_id, &mv).await })
            })
            .await
            .map_err(unwrap_txn_error)?;

        self.reconcile_by_number(applied.batch_number.as_deref()).await;
        if let Err(e) = self
            .event_sender
            .send(Event::StockExported {
                warehouse_id,
                cell_id,
                product_id: applied.product.id,
                quantity: request.quantity,
            })
            .await
        {
            warn!(%cell_id, error = %e, "failed to emit export event");
        }
        Ok(applied.cell)
    }

    /// Empties one product from a cell, keeping the ledger. The cleared
    /// amount is recorded as a ClearProduct activity so it subtracts from
    /// the batch on the next reconciliation.
    #[instrument(skip(self))]
    pub async fn clear_product(
        &self,
        warehouse_id: Uuid,
        cell_id: Uuid,
        actor: Option<String>,
    ) -> Result<warehouse_cell::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        self.load_warehouse(warehouse_id).await?;

        let (cell, batch_number) = db
            .transaction::<_, (warehouse_cell::Model, Option<String>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let cell = load_cell(txn, warehouse_id, cell_id).await?;
                        let batch_number = cell.batch_number.clone();

                        activities::record(
                            txn,
                            activities::NewActivity {
                                warehouse_id,
                                cell_id,
                                activity_type: ActivityType::ClearProduct,
                                product_id: cell.product_id,
                                batch_number: batch_number.clone(),
                                quantity: cell.current_amount,
                                actor,
                                notes: None,
                            },
                        )
                        .await?;

                        archive_associations(txn, cell_id).await?;
                        let cell = reset_occupancy(txn, cell).await?;
                        Ok((cell, batch_number))
                    })
                },
            )
            .await
            .map_err(unwrap_txn_error)?;

        self.reconcile_by_number(batch_number.as_deref()).await;
        if let Err(e) = self.event_sender.send(Event::ProductCleared { cell_id }).await {
            warn!(%cell_id, error = %e, "failed to emit clear event");
        }
        Ok(cell)
    }

    /// Full purge: removes the cell's associations AND its activity rows.
    /// Refused while any active association still holds stock, since the
    /// purge would erase quantities the batches still account for.
    #[instrument(skip(self))]
    pub async fn clear_cell(
        &self,
        warehouse_id: Uuid,
        cell_id: Uuid,
    ) -> Result<warehouse_cell::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        self.load_warehouse(warehouse_id).await?;

        let cell = db
            .transaction::<_, warehouse_cell::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let cell = load_cell(txn, warehouse_id, cell_id).await?;

                    let associations = WarehouseCellProduct::find()
                        .filter(warehouse_cell_product::Column::CellId.eq(cell_id))
                        .filter(warehouse_cell_product::Column::Status.eq(RecordStatus::Active))
                        .all(txn)
                        .await?;
                    let held: Decimal = associations
                        .iter()
                        .filter(|a| a.remaining_quantity > Decimal::ZERO)
                        .map(|a| a.remaining_quantity)
                        .sum();
                    if held > Decimal::ZERO {
                        return Err(ServiceError::InvalidOperation(format!(
                            "cell {} still holds {} units; clear the product first",
                            cell.cell_code, held
                        )));
                    }

                    WarehouseCellProduct::delete_many()
                        .filter(warehouse_cell_product::Column::CellId.eq(cell_id))
                        .exec(txn)
                        .await?;
                    WarehouseActivity::delete_many()
                        .filter(warehouse_activity::Column::CellId.eq(cell_id))
                        .exec(txn)
                        .await?;

                    reset_occupancy(txn, cell).await
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        if let Err(e) = self.event_sender.send(Event::CellPurged(cell_id)).await {
            warn!(%cell_id, error = %e, "failed to emit purge event");
        }
        Ok(cell)
    }

    /// Soft delete of the warehouse header. Cells stay in place.
    #[instrument(skip(self))]
    pub async fn archive_warehouse(&self, id: Uuid) -> Result<(), ServiceError> {
        let warehouse = self.load_warehouse(id).await?;
        let mut active: warehouse::ActiveModel = warehouse.into();
        active.status = Set(RecordStatus::Archived);
        active.updated_at = Set(Some(Utc::now()));
        active.update(self.db_pool.as_ref()).await?;
        Ok(())
    }

    /// Best-effort post-commit reconciliation of the batch a movement was
    /// attributed to, looked up by number.
    async fn reconcile_by_number(&self, batch_number: Option<&str>) {
        let Some(number) = batch_number else {
            return;
        };
        let db = self.db_pool.as_ref();
        let batch = match ProductBatch::find()
            .filter(product_batch::Column::BatchNumber.eq(number))
            .one(db)
            .await
        {
            Ok(Some(batch)) => batch,
            Ok(None) => return,
            Err(e) => {
                warn!(batch_number = number, error = %e, "batch lookup for reconciliation failed");
                return;
            }
        };
        if let Err(e) = reconciliation::reconcile_batch(db, batch.id).await {
            warn!(batch_id = %batch.id, error = %e, "post-movement reconciliation failed");
            metrics::increment_counter!("depot_reconciliation_failures");
        }
    }
}

fn unwrap_txn_error(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

async fn load_cell(
    txn: &DatabaseTransaction,
    warehouse_id: Uuid,
    cell_id: Uuid,
) -> Result<warehouse_cell::Model, ServiceError> {
    let cell = WarehouseCell::find_by_id(cell_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("warehouse cell {cell_id} not found")))?;
    if cell.warehouse_id != warehouse_id {
        return Err(ServiceError::ValidationError(format!(
            "cell {} does not belong to warehouse {}",
            cell.cell_code, warehouse_id
        )));
    }
    Ok(cell)
}

async fn archive_associations(
    txn: &DatabaseTransaction,
    cell_id: Uuid,
) -> Result<(), ServiceError> {
    let associations = WarehouseCellProduct::find()
        .filter(warehouse_cell_product::Column::CellId.eq(cell_id))
        .filter(warehouse_cell_product::Column::Status.eq(RecordStatus::Active))
        .all(txn)
        .await?;
    for assoc in associations {
        let mut active: warehouse_cell_product::ActiveModel = assoc.into();
        active.status = Set(RecordStatus::Archived);
        active.updated_at = Set(Some(Utc::now()));
        active.update(txn).await?;
    }
    Ok(())
}

async fn reset_occupancy(
    txn: &DatabaseTransaction,
    cell: warehouse_cell::Model,
) -> Result<warehouse_cell::Model, ServiceError> {
    let mut active: warehouse_cell::ActiveModel = cell.into();
    active.current_amount = Set(Decimal::ZERO);
    active.product_id = Set(None);
    active.product_name = Set(None);
    active.batch_number = Set(None);
    active.production_date = Set(None);
    active.expiry_date = Set(None);
    active.supplier = Set(None);
    active.status = Set(CellStatus::Empty);
    active.updated_at = Set(Some(Utc::now()));
    Ok(active.update(txn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_validation() {
        assert!(validate_dimensions(1, 1).is_ok());
        assert!(validate_dimensions(99, 26).is_ok());
        assert!(validate_dimensions(0, 5).is_err());
        assert!(validate_dimensions(5, 0).is_err());
        assert!(validate_dimensions(100, 5).is_err());
        assert!(validate_dimensions(5, 27).is_err());
    }

    #[test]
    fn new_cells_start_empty() {
        let cell = new_cell(Uuid::new_v4(), 2, 4, dec!(50));
        assert_eq!(cell.cell_code.clone().unwrap(), "C05");
        assert_eq!(cell.current_amount.clone().unwrap(), Decimal::ZERO);
        assert_eq!(cell.status.clone().unwrap(), CellStatus::Empty);
    }
}
