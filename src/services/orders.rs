//! Import/export order processing.
//!
//! An order applies as a single unit of work: every line is validated and
//! applied inside one database transaction, so a bad line rolls back the
//! whole order instead of leaving earlier lines half-applied. Referenced
//! batches are reconciled after commit, best-effort.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        import_order::{self, Entity as ImportOrder},
        import_order_detail::{self, Entity as ImportOrderDetail},
        product_batch::{self, Entity as ProductBatch},
        warehouse::Entity as Warehouse,
        OrderType, RecordStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        product_batches::resolve_or_create_batch,
        reconciliation,
        stock::{self, ExportMove, ImportMove},
    },
};

/// Attempts at a fresh order number before giving up. Collisions only
/// happen when two creations race the same sequence value.
const ORDER_NUMBER_ATTEMPTS: u64 = 3;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub order_name: Option<String>,
    pub order_type: OrderType,
    pub warehouse_id: Uuid,
    pub counterparty: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub actor: Option<String>,
    #[serde(default)]
    pub details: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub warehouse_cell_id: Uuid,
    pub quantity: Decimal,
    pub product_batch_id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub order_name: Option<String>,
    pub order_type: OrderType,
    pub warehouse_id: Uuid,
    pub counterparty: Option<String>,
    pub order_date: DateTime<Utc>,
    pub total_value: Decimal,
    pub notes: Option<String>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl From<import_order::Model> for OrderResponse {
    fn from(m: import_order::Model) -> Self {
        Self {
            id: m.id,
            order_number: m.order_number,
            order_name: m.order_name,
            order_type: m.order_type,
            warehouse_id: m.warehouse_id,
            counterparty: m.counterparty,
            order_date: m.order_date,
            total_value: m.total_value,
            notes: m.notes,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub details: Vec<import_order_detail::Model>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub order_name: Option<String>,
    pub counterparty: Option<String>,
    pub notes: Option<String>,
}

/// Formats `{IMP|EXP}{yyyyMMdd}{seq:04}`.
pub fn format_order_number(order_type: OrderType, date: NaiveDate, sequence: u64) -> String {
    let prefix = match order_type {
        OrderType::Import => "IMP",
        OrderType::Export => "EXP",
    };
    format!("{}{}{:04}", prefix, date.format("%Y%m%d"), sequence)
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates and applies an import/export order.
    #[instrument(skip(self, request), fields(warehouse_id = %request.warehouse_id, order_type = %request.order_type, lines = request.details.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let db = self.db_pool.as_ref();

        let warehouse = Warehouse::find_by_id(request.warehouse_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("warehouse {} not found", request.warehouse_id))
            })?;
        if warehouse.status != RecordStatus::Active {
            return Err(ServiceError::ValidationError(format!(
                "warehouse {} is archived",
                warehouse.code
            )));
        }

        for line in &request.details {
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "line quantity must be greater than zero".to_string(),
                ));
            }
        }

        // Sequence base: active-order count + 1. The unique index on
        // order_number plus the retry below absorbs concurrent creations
        // (or archive gaps) landing on the same value.
        let count = ImportOrder::find()
            .filter(import_order::Column::Status.eq(RecordStatus::Active))
            .count(db)
            .await?;
        let today = Utc::now().date_naive();

        let mut last_err = None;
        for attempt in 0..ORDER_NUMBER_ATTEMPTS {
            let order_number = format_order_number(request.order_type, today, count + 1 + attempt);
            match self.try_create(order_number, &request).await {
                Ok((order, batch_ids)) => {
                    self.after_commit(&order, batch_ids).await;
                    return Ok(order.into());
                }
                Err(ServiceError::DatabaseError(db_err)) if is_unique_violation(&db_err) => {
                    warn!(attempt, "order number collision, retrying");
                    last_err = Some(ServiceError::DatabaseError(db_err));
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            ServiceError::Conflict("could not allocate a unique order number".to_string())
        }))
    }

    /// One transactional attempt: insert header, apply every line, persist
    /// the aggregated total. Any failure rolls the whole attempt back.
    async fn try_create(
        &self,
        order_number: String,
        request: &CreateOrderRequest,
    ) -> Result<(import_order::Model, Vec<Uuid>), ServiceError> {
        let db = self.db_pool.as_ref();
        let request = request.clone();

        db.transaction::<_, (import_order::Model, Vec<Uuid>), ServiceError>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let order = import_order::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_number: Set(order_number),
                    order_name: Set(request.order_name.clone()),
                    order_type: Set(request.order_type),
                    warehouse_id: Set(request.warehouse_id),
                    counterparty: Set(request.counterparty.clone()),
                    order_date: Set(request.order_date.unwrap_or(now)),
                    total_value: Set(Decimal::ZERO),
                    notes: Set(request.notes.clone()),
                    status: Set(RecordStatus::Active),
                    created_at: Set(now),
                    updated_at: Set(None),
                }
                .insert(txn)
                .await?;

                let mut total = Decimal::ZERO;
                let mut batch_ids = BTreeSet::new();

                for line in &request.details {
                    let (batch_id, batch_number) =
                        apply_line(txn, &order, line, request.actor.as_deref(), &mut batch_ids)
                            .await?;

                    import_order_detail::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(order.id),
                        product_id: Set(line.product_id),
                        warehouse_cell_id: Set(line.warehouse_cell_id),
                        product_batch_id: Set(batch_id),
                        batch_number: Set(batch_number),
                        quantity: Set(line.quantity),
                        unit_price: Set(line.unit_price),
                        total_price: Set(line.total_price),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    total += line.total_price.unwrap_or(Decimal::ZERO);
                }

                let mut active_order: import_order::ActiveModel = order.clone().into();
                active_order.total_value = Set(total);
                active_order.updated_at = Set(Some(Utc::now()));
                let order = active_order.update(txn).await?;

                Ok((order, batch_ids.into_iter().collect()))
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    /// Post-commit side effects: batch reconciliation and the created
    /// event. Best-effort by contract; failures are logged and counted,
    /// never propagated to the caller whose order already committed.
    async fn after_commit(&self, order: &import_order::Model, batch_ids: Vec<Uuid>) {
        let db = self.db_pool.as_ref();
        for batch_id in batch_ids {
            if let Err(e) = reconciliation::reconcile_batch(db, batch_id).await {
                warn!(%batch_id, error = %e, "post-order batch reconciliation failed");
                metrics::increment_counter!("depot_reconciliation_failures");
            }
        }
        if let Err(e) = self
            .event_sender
            .send(Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
            })
            .await
        {
            warn!(order_id = %order.id, error = %e, "failed to emit order created event");
        }
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderWithDetails, ServiceError> {
        let db = self.db_pool.as_ref();
        let order = ImportOrder::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id} not found")))?;
        let details = ImportOrderDetail::find()
            .filter(import_order_detail::Column::OrderId.eq(id))
            .order_by_asc(import_order_detail::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(OrderWithDetails {
            order: order.into(),
            details,
        })
    }

    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        order_type: Option<OrderType>,
    ) -> Result<OrderListResponse, ServiceError> {
        let per_page = per_page.clamp(1, 100);
        let mut query = ImportOrder::find()
            .filter(import_order::Column::Status.eq(RecordStatus::Active));
        if let Some(order_type) = order_type {
            query = query.filter(import_order::Column::OrderType.eq(order_type));
        }

        let paginator = query
            .order_by_desc(import_order::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(OrderListResponse {
            orders: orders.into_iter().map(Into::into).collect(),
            total,
            page: page.max(1),
            per_page,
            total_pages: total.div_ceil(per_page),
        })
    }

    /// Mutates header fields only; line items are immutable once applied.
    #[instrument(skip(self, request))]
    pub async fn update_order(
        &self,
        id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let db = self.db_pool.as_ref();
        let order = ImportOrder::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id} not found")))?;

        let mut active: import_order::ActiveModel = order.into();
        if let Some(name) = request.order_name {
            active.order_name = Set(Some(name));
        }
        if let Some(counterparty) = request.counterparty {
            active.counterparty = Set(Some(counterparty));
        }
        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;
        Ok(updated.into())
    }

    /// Soft delete. Archived orders drop out of listings and of the
    /// imported side of reconciliation.
    #[instrument(skip(self))]
    pub async fn archive_order(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let order = ImportOrder::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id} not found")))?;

        let mut active: import_order::ActiveModel = order.into();
        active.status = Set(RecordStatus::Archived);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;

        if let Err(e) = self.event_sender.send(Event::OrderArchived(id)).await {
            warn!(order_id = %id, error = %e, "failed to emit order archived event");
        }
        Ok(())
    }
}

/// Applies one line against the warehouse and returns the batch id and
/// number the movement resolved to, recording any referenced batch id for
/// post-commit reconciliation.
async fn apply_line(
    txn: &DatabaseTransaction,
    order: &import_order::Model,
    line: &OrderLineRequest,
    actor: Option<&str>,
    batch_ids: &mut BTreeSet<Uuid>,
) -> Result<(Option<Uuid>, Option<String>), ServiceError> {
    // Resolve the batch reference up front: an explicit id must exist; a
    // bare batch number on an import creates the batch on first use.
    let mut batch_number = line.batch_number.clone();
    let mut resolved_batch_id = line.product_batch_id;
    if let Some(batch_id) = line.product_batch_id {
        let batch = ProductBatch::find_by_id(batch_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product batch {batch_id} not found"))
            })?;
        batch_number.get_or_insert(batch.batch_number.clone());
        batch_ids.insert(batch.id);
    } else if let Some(number) = &batch_number {
        match order.order_type {
            OrderType::Import => {
                let batch = resolve_or_create_batch(
                    txn,
                    line.product_id,
                    number,
                    line.quantity,
                    line.unit_price,
                    line.production_date,
                    line.expiry_date,
                )
                .await?;
                batch_ids.insert(batch.id);
                resolved_batch_id = Some(batch.id);
            }
            OrderType::Export => {
                if let Some(batch) = ProductBatch::find()
                    .filter(product_batch::Column::BatchNumber.eq(number.clone()))
                    .one(txn)
                    .await?
                {
                    batch_ids.insert(batch.id);
                    resolved_batch_id = Some(batch.id);
                }
            }
        }
    }

    match order.order_type {
        OrderType::Import => {
            stock::apply_import(
                txn,
                order.warehouse_id,
                &ImportMove {
                    product_id: line.product_id,
                    cell_id: line.warehouse_cell_id,
                    quantity: line.quantity,
                    batch_number: batch_number.clone(),
                    unit_price: line.unit_price,
                    production_date: line.production_date,
                    expiry_date: line.expiry_date,
                    supplier: line.supplier.clone(),
                    actor: actor.map(str::to_string),
                    notes: Some(format!("order {}", order.order_number)),
                },
            )
            .await?;
        }
        OrderType::Export => {
            let applied = stock::apply_export(
                txn,
                order.warehouse_id,
                &ExportMove {
                    product_id: line.product_id,
                    cell_id: line.warehouse_cell_id,
                    quantity: line.quantity,
                    batch_number: batch_number.clone(),
                    actor: actor.map(str::to_string),
                    notes: Some(format!("order {}", order.order_number)),
                },
            )
            .await?;
            // A batch-less export may still resolve to a batch through the
            // association chain; reconcile that batch too.
            if batch_number.is_none() {
                if let Some(resolved) = &applied.batch_number {
                    if let Some(batch) = ProductBatch::find()
                        .filter(product_batch::Column::BatchNumber.eq(resolved.clone()))
                        .one(txn)
                        .await?
                    {
                        batch_ids.insert(batch.id);
                        resolved_batch_id = Some(batch.id);
                    }
                    batch_number = Some(resolved.clone());
                }
            }
        }
    }

    Ok((resolved_batch_id, batch_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            format_order_number(OrderType::Import, date, 1),
            "IMP202403070001"
        );
        assert_eq!(
            format_order_number(OrderType::Export, date, 42),
            "EXP202403070042"
        );
    }

    #[test]
    fn order_number_sequence_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(
            format_order_number(OrderType::Import, date, 12345),
            "IMP2024123112345"
        );
    }
}
