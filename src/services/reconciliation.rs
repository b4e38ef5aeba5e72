//! Batch stock reconciliation.
//!
//! A batch's current quantity is recomputed from the ledger rather than
//! trusted as a running counter: the sum of import order lines referencing
//! the batch, minus Export and ClearProduct activity for its batch number,
//! clamped at zero. Drift introduced anywhere upstream washes out on the
//! next reconcile.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
    RelationTrait, Set,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        import_order::{self},
        import_order_detail::{self, Entity as ImportOrderDetail},
        product_batch::{self, Entity as ProductBatch},
        warehouse_activity::{self, Entity as WarehouseActivity},
        ActivityType, OrderType, RecordStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Recomputes and persists one batch's current quantity.
///
/// Generic over the connection so callers can run it inside their own
/// transaction or straight on the pool.
pub async fn reconcile_batch<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> Result<Decimal, ServiceError> {
    let batch = ProductBatch::find_by_id(batch_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("product batch {batch_id} not found")))?;

    let imported = imported_total(conn, batch_id).await?;
    let exported = activity_total(conn, &batch.batch_number, ActivityType::Export).await?;
    let cleared = activity_total(conn, &batch.batch_number, ActivityType::ClearProduct).await?;

    let current = (imported - exported - cleared).max(Decimal::ZERO);

    let mut active: product_batch::ActiveModel = batch.into();
    active.current_quantity = Set(current);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await?;

    Ok(current)
}

/// Sum of import order lines referencing the batch. Only lines of active
/// Import-type orders count; export orders reference batches too but
/// their subtraction flows through the activity ledger.
async fn imported_total<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> Result<Decimal, ServiceError> {
    let lines = ImportOrderDetail::find()
        .filter(import_order_detail::Column::ProductBatchId.eq(batch_id))
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

async fn activity_total<C: ConnectionTrait>(
    conn: &C,
    batch_number: &str,
    activity_type: ActivityType,
) -> Result<Decimal, ServiceError> {
    let rows = WarehouseActivity::find()
        .filter(warehouse_activity::Column::BatchNumber.eq(batch_number))
        .filter(warehouse_activity::Column::ActivityType.eq(activity_type))
        .all(conn)
        .await?;
    Ok(rows.iter().map(|r| r.quantity).sum())
}

/// Outcome of a bulk reconciliation pass.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, utoipa::ToSchema)]
pub struct ReconcileSummary {
    pub reconciled: u64,
    pub failed: u64,
}

#[derive(Clone)]
pub struct ReconciliationService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ReconciliationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Reconciles a single batch and reports the new current quantity.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, batch_id: Uuid) -> Result<Decimal, ServiceError> {
        let current = reconcile_batch(self.db_pool.as_ref(), batch_id).await?;
        if let Err(e) = self
            .event_sender
            .send(Event::BatchReconciled {
                batch_id,
                current_quantity: current,
            })
            .await
        {
            warn!(error = %e, %batch_id, "failed to emit reconciliation event");
        }
        Ok(current)
    }

    /// Reconciles every active batch. Best-effort: a failing batch is
    /// counted, logged, and skipped so one bad row cannot stall the rest.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<ReconcileSummary, ServiceError> {
        let db = self.db_pool.as_ref();
        let batches = ProductBatch::find()
            .filter(product_batch::Column::Status.eq(RecordStatus::Active))
            .all(db)
            .await?;

        let mut summary = ReconcileSummary::default();
        for batch in batches {
            match reconcile_batch(db, batch.id).await {
                Ok(_) => summary.reconciled += 1,
                Err(e) => {
                    warn!(batch_id = %batch.id, error = %e, "batch reconciliation failed");
                    metrics::increment_counter!("depot_reconciliation_failures");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }
}
