//! Activity ledger: the append-only audit trail behind every cell
//! mutation and the subtraction side of batch reconciliation.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        warehouse_activity::{self, Entity as WarehouseActivity},
        ActivityType,
    },
    errors::ServiceError,
};

/// Input for one ledger row.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub warehouse_id: Uuid,
    pub cell_id: Uuid,
    pub activity_type: ActivityType,
    pub product_id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub quantity: Decimal,
    pub actor: Option<String>,
    pub notes: Option<String>,
}

/// Appends one activity row. Rows are never updated afterwards.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    activity: NewActivity,
) -> Result<warehouse_activity::Model, ServiceError> {
    let row = warehouse_activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        warehouse_id: Set(activity.warehouse_id),
        cell_id: Set(activity.cell_id),
        activity_type: Set(activity.activity_type),
        product_id: Set(activity.product_id),
        batch_number: Set(activity.batch_number),
        quantity: Set(activity.quantity),
        actor: Set(activity.actor),
        notes: Set(activity.notes),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(row)
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub warehouse_id: Option<Uuid>,
    pub cell_id: Option<Uuid>,
    pub activity_type: Option<ActivityType>,
}

/// Read side of the ledger.
#[derive(Clone)]
pub struct ActivityService {
    db_pool: Arc<DbPool>,
}

impl ActivityService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn list(
        &self,
        filter: ActivityFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<warehouse_activity::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let mut query = WarehouseActivity::find();
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(warehouse_activity::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(cell_id) = filter.cell_id {
            query = query.filter(warehouse_activity::Column::CellId.eq(cell_id));
        }
        if let Some(activity_type) = filter.activity_type {
            query = query.filter(warehouse_activity::Column::ActivityType.eq(activity_type));
        }

        let paginator = query
            .order_by_desc(warehouse_activity::Column::CreatedAt)
            .paginate(db, per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }
}
