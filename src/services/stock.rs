//! Cell-level stock movements shared by the order processor and the
//! standalone cell import/export endpoints.
//!
//! Every function takes a `ConnectionTrait` so callers decide the
//! transaction boundary: the order processor applies all its lines inside
//! one transaction, the cell endpoints open one per request.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::{
    entities::{
        import_order::{self, Entity as ImportOrder},
        import_order_detail::{self, Entity as ImportOrderDetail},
        product::{self, Entity as Product},
        warehouse_cell::{self, Entity as WarehouseCell},
        warehouse_cell_product::{self, Entity as WarehouseCellProduct},
        ActivityType, CellStatus, OrderType, RecordStatus,
    },
    errors::ServiceError,
    services::activities,
};

/// Occupancy ratio at or above which a cell displays as Full.
const FULL_RATIO: Decimal = dec!(0.9);

/// One inbound movement into a cell.
#[derive(Debug, Clone)]
pub struct ImportMove {
    pub product_id: Uuid,
    pub cell_id: Uuid,
    pub quantity: Decimal,
    pub batch_number: Option<String>,
    pub unit_price: Option<Decimal>,
    pub production_date: Option<chrono::NaiveDate>,
    pub expiry_date: Option<chrono::NaiveDate>,
    pub supplier: Option<String>,
    pub actor: Option<String>,
    pub notes: Option<String>,
}

/// One outbound movement from a cell.
#[derive(Debug, Clone)]
pub struct ExportMove {
    pub product_id: Uuid,
    pub cell_id: Uuid,
    pub quantity: Decimal,
    pub batch_number: Option<String>,
    pub actor: Option<String>,
    pub notes: Option<String>,
}

/// What a movement touched, for activity attribution and reconciliation.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub cell: warehouse_cell::Model,
    pub product: product::Model,
    /// Batch the movement was attributed to, when one could be resolved.
    pub batch_number: Option<String>,
}

/// Display status from amount vs. capacity. A heuristic for the grid UI,
/// not a constraint.
pub fn derive_status(amount: Decimal, capacity: Decimal) -> CellStatus {
    if amount <= Decimal::ZERO {
        CellStatus::Empty
    } else if capacity > Decimal::ZERO && amount >= capacity * FULL_RATIO {
        CellStatus::Full
    } else {
        CellStatus::Occupied
    }
}

/// Grid code for a cell position: row letter + two-digit column, "A01".
/// Callers validate row < 26 and col < 99 before cells are created.
pub fn cell_code(row: i32, col: i32) -> String {
    let letter = (b'A' + (row.clamp(0, 25) as u8)) as char;
    format!("{}{:02}", letter, col + 1)
}

async fn load_cell_in_warehouse<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    cell_id: Uuid,
) -> Result<warehouse_cell::Model, ServiceError> {
    let cell = WarehouseCell::find_by_id(cell_id)
        .one(conn)
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

async fn load_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("product {product_id} not found")))
}

fn require_positive(quantity: Decimal) -> Result<(), ServiceError> {
    if quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "quantity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Applies an import: adds to the cell balance, upserts the
/// (cell, product, batch) association, and appends an Import activity.
///
/// Rejected when the movement would push the cell past its capacity.
/// Provenance fields resolve explicit value first, then the product
/// master, then whatever is already stored.
pub async fn apply_import<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    mv: &ImportMove,
) -> Result<AppliedMove, ServiceError> {
    require_positive(mv.quantity)?;
    let product = load_product(conn, mv.product_id).await?;
    let cell = load_cell_in_warehouse(conn, warehouse_id, mv.cell_id).await?;

    let new_amount = cell.current_amount + mv.quantity;
    if new_amount > cell.max_capacity {
        return Err(ServiceError::ValidationError(format!(
            "import of {} would exceed capacity {} of cell {} (current {})",
            mv.quantity, cell.max_capacity, cell.cell_code, cell.current_amount
        )));
    }

    let production_date = mv
        .production_date
        .or(product.production_date)
        .or(cell.production_date);
    let expiry_date = mv.expiry_date.or(product.expiry_date).or(cell.expiry_date);
    let supplier = mv
        .supplier
        .clone()
        .or_else(|| product.supplier.clone())
        .or_else(|| cell.supplier.clone());
    let batch_number = mv.batch_number.clone().or_else(|| cell.batch_number.clone());

    let now = Utc::now();
    let mut active_cell: warehouse_cell::ActiveModel = cell.clone().into();
    active_cell.current_amount = Set(new_amount);
    active_cell.product_id = Set(Some(product.id));
    active_cell.product_name = Set(Some(product.name.clone()));
    active_cell.batch_number = Set(batch_number.clone());
    active_cell.production_date = Set(production_date);
    active_cell.expiry_date = Set(expiry_date);
    active_cell.supplier = Set(supplier.clone());
    active_cell.status = Set(derive_status(new_amount, cell.max_capacity));
    active_cell.updated_at = Set(Some(now));
    let cell = active_cell.update(conn).await?;

    upsert_association(conn, &cell, &product, mv, production_date, expiry_date, supplier).await?;

    activities::record(
        conn,
        activities::NewActivity {
            warehouse_id,
            cell_id: cell.id,
            activity_type: ActivityType::Import,
            product_id: Some(product.id),
            batch_number: mv.batch_number.clone(),
            quantity: mv.quantity,
            actor: mv.actor.clone(),
            notes: mv.notes.clone(),
        },
    )
    .await?;

    Ok(AppliedMove {
        cell,
        product,
        batch_number: mv.batch_number.clone(),
    })
}

async fn upsert_association<C: ConnectionTrait>(
    conn: &C,
    cell: &warehouse_cell::Model,
    product: &product::Model,
    mv: &ImportMove,
    production_date: Option<chrono::NaiveDate>,
    expiry_date: Option<chrono::NaiveDate>,
    supplier: Option<String>,
) -> Result<(), ServiceError> {
    let mut query = WarehouseCellProduct::find()
        .filter(warehouse_cell_product::Column::CellId.eq(cell.id))
        .filter(warehouse_cell_product::Column::ProductId.eq(product.id))
        .filter(warehouse_cell_product::Column::Status.eq(RecordStatus::Active));
    query = match &mv.batch_number {
        Some(batch) => query.filter(warehouse_cell_product::Column::BatchNumber.eq(batch.clone())),
        None => query.filter(warehouse_cell_product::Column::BatchNumber.is_null()),
    };

    let now = Utc::now();
    match query.one(conn).await? {
        Some(existing) => {
            let mut active: warehouse_cell_product::ActiveModel = existing.clone().into();
            active.quantity = Set(existing.quantity + mv.quantity);
            active.remaining_quantity = Set(existing.remaining_quantity + mv.quantity);
            active.production_date = Set(production_date.or(existing.production_date));
            active.expiry_date = Set(expiry_date.or(existing.expiry_date));
            active.supplier = Set(supplier.or(existing.supplier.clone()));
            if mv.unit_price.is_some() {
                active.unit_price = Set(mv.unit_price);
            }
            active.updated_at = Set(Some(now));
            active.update(conn).await?;
        }
        None => {
            warehouse_cell_product::ActiveModel {
                id: Set(Uuid::new_v4()),
                cell_id: Set(cell.id),
                product_id: Set(product.id),
                batch_number: Set(mv.batch_number.clone()),
                quantity: Set(mv.quantity),
                remaining_quantity: Set(mv.quantity),
                unit_price: Set(mv.unit_price),
                total_price: Set(mv.unit_price.map(|p| p * mv.quantity)),
                production_date: Set(production_date),
                expiry_date: Set(expiry_date),
                supplier: Set(supplier),
                status: Set(RecordStatus::Active),
                created_at: Set(now),
                updated_at: Set(None),
            }
            .insert(conn)
            .await?;
        }
    }
    Ok(())
}

/// Applies an export: subtracts from the cell balance (clamped at zero),
/// draws down the matching association, and appends an Export activity.
///
/// Association lookup order: exact (cell, product, batch), then
/// (cell, product) ignoring batch, then the cell aggregate (or the sum of
/// prior import lines for cell+product) as the available pool. The pool
/// path writes a negative-quantity association to mark the shortfall; its
/// batch attribution is unknown so batch_number stays null there.
pub async fn apply_export<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    mv: &ExportMove,
) -> Result<AppliedMove, ServiceError> {
    require_positive(mv.quantity)?;
    let product = load_product(conn, mv.product_id).await?;
    let cell = load_cell_in_warehouse(conn, warehouse_id, mv.cell_id).await?;

    let association = find_association(conn, &cell, &product, mv.batch_number.as_deref()).await?;
    let resolved_batch = mv.batch_number.clone().or_else(|| {
        association
            .as_ref()
            .and_then(|a| a.batch_number.clone())
            .or_else(|| cell.batch_number.clone())
    });

    let now = Utc::now();
    match association {
        Some(assoc) => {
            if mv.quantity > assoc.remaining_quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "requested {} but only {} available in cell {}",
                    mv.quantity, assoc.remaining_quantity, cell.cell_code
                )));
            }
            let remaining = assoc.remaining_quantity - mv.quantity;
            let mut active: warehouse_cell_product::ActiveModel = assoc.clone().into();
            active.quantity = Set(assoc.quantity - mv.quantity);
            active.remaining_quantity = Set(remaining);
            if remaining == Decimal::ZERO {
                active.status = Set(RecordStatus::Archived);
            }
            active.updated_at = Set(Some(now));
            active.update(conn).await?;
        }
        None => {
            let mut pool = cell.current_amount;
            if pool == Decimal::ZERO {
                pool = imported_total_for_cell(conn, cell.id, product.id).await?;
            }
            if mv.quantity > pool {
                return Err(ServiceError::InsufficientStock(format!(
                    "requested {} but only {} available in cell {}",
                    mv.quantity, pool, cell.cell_code
                )));
            }
            // Shortfall marker: an export with no import association to
            // draw from. Batch attribution is unknown here.
            warehouse_cell_product::ActiveModel {
                id: Set(Uuid::new_v4()),
                cell_id: Set(cell.id),
                product_id: Set(product.id),
                batch_number: Set(None),
                quantity: Set(-mv.quantity),
                remaining_quantity: Set(Decimal::ZERO),
                unit_price: Set(None),
                total_price: Set(None),
                production_date: Set(None),
                expiry_date: Set(None),
                supplier: Set(None),
                status: Set(RecordStatus::Active),
                created_at: Set(now),
                updated_at: Set(None),
            }
            .insert(conn)
            .await?;
        }
    }

    let new_amount = (cell.current_amount - mv.quantity).max(Decimal::ZERO);
    let mut active_cell: warehouse_cell::ActiveModel = cell.clone().into();
    active_cell.current_amount = Set(new_amount);
    active_cell.status = Set(derive_status(new_amount, cell.max_capacity));
    active_cell.updated_at = Set(Some(now));
    let cell = active_cell.update(conn).await?;

    activities::record(
        conn,
        activities::NewActivity {
            warehouse_id,
            cell_id: cell.id,
            activity_type: ActivityType::Export,
            product_id: Some(product.id),
            batch_number: resolved_batch.clone(),
            quantity: mv.quantity,
            actor: mv.actor.clone(),
            notes: mv.notes.clone(),
        },
    )
    .await?;

    Ok(AppliedMove {
        cell,
        product,
        batch_number: resolved_batch,
    })
}

async fn find_association<C: ConnectionTrait>(
    conn: &C,
    cell: &warehouse_cell::Model,
    product: &product::Model,
    batch_number: Option<&str>,
) -> Result<Option<warehouse_cell_product::Model>, ServiceError> {
    let base = WarehouseCellProduct::find()
        .filter(warehouse_cell_product::Column::CellId.eq(cell.id))
        .filter(warehouse_cell_product::Column::ProductId.eq(product.id))
        .filter(warehouse_cell_product::Column::Status.eq(RecordStatus::Active));

    let exact = match batch_number {
        Some(batch) => {
            base.clone()
                .filter(warehouse_cell_product::Column::BatchNumber.eq(batch))
                .one(conn)
                .await?
        }
        None => {
            base.clone()
                .filter(warehouse_cell_product::Column::BatchNumber.is_null())
                .one(conn)
                .await?
        }
    };
    if exact.is_some() {
        return Ok(exact);
    }

    // Fall back to any batch of the product in this cell. Which batch is
    // actually depleted by a batch-less export is ambiguous; oldest first.
    let fallback = base
        .order_by_asc(warehouse_cell_product::Column::CreatedAt)
        .one(conn)
        .await?;
    Ok(fallback)
}

async fn imported_total_for_cell<C: ConnectionTrait>(
    conn: &C,
    cell_id: Uuid,
    product_id: Uuid,
) -> Result<Decimal, ServiceError> {
    let lines = ImportOrderDetail::find()
        .filter(import_order_detail::Column::WarehouseCellId.eq(cell_id))
        .filter(import_order_detail::Column::ProductId.eq(product_id))
        .join(
            sea_orm::JoinType::InnerJoin,
            import_order_detail::Relation::Order.def(),
        )
        .filter(import_order::Column::OrderType.eq(OrderType::Import))
        .filter(import_order::Column::Status.eq(RecordStatus::Active))
        .all(conn)
        .await?;
    Ok(lines.iter().map(|l| l.quantity).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, "A01")]
    #[test_case(0, 9, "A10")]
    #[test_case(7, 0, "H01")]
    #[test_case(25, 98, "Z99")]
    fn cell_codes(row: i32, col: i32, expected: &str) {
        assert_eq!(cell_code(row, col), expected);
    }

    #[test]
    fn status_empty_at_zero() {
        assert_eq!(derive_status(dec!(0), dec!(100)), CellStatus::Empty);
    }

    #[test]
    fn status_occupied_below_threshold() {
        assert_eq!(derive_status(dec!(50), dec!(100)), CellStatus::Occupied);
        assert_eq!(derive_status(dec!(89.9), dec!(100)), CellStatus::Occupied);
    }

    #[test]
    fn status_full_at_ninety_percent() {
        assert_eq!(derive_status(dec!(90), dec!(100)), CellStatus::Full);
        assert_eq!(derive_status(dec!(100), dec!(100)), CellStatus::Full);
    }

    #[test]
    fn status_with_zero_capacity() {
        assert_eq!(derive_status(dec!(0), dec!(0)), CellStatus::Empty);
        assert_eq!(derive_status(dec!(5), dec!(0)), CellStatus::Occupied);
    }
}
