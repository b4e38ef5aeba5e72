//! Product batch catalog. Batches come into being either explicitly or on
//! the first import line that references a new batch number.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        product::Entity as Product,
        product_batch::{self, Entity as ProductBatch},
        RecordStatus,
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBatchRequest {
    pub product_id: Uuid,
    pub batch_number: String,
    pub initial_quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub production_date: Option<chrono::NaiveDate>,
    pub expiry_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_number: String,
    pub initial_quantity: Decimal,
    pub current_quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub production_date: Option<chrono::NaiveDate>,
    pub expiry_date: Option<chrono::NaiveDate>,
    pub status: crate::entities::RecordStatus,
}

impl From<product_batch::Model> for BatchResponse {
    fn from(m: product_batch::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            batch_number: m.batch_number,
            initial_quantity: m.initial_quantity,
            current_quantity: m.current_quantity,
            unit_price: m.unit_price,
            production_date: m.production_date,
            expiry_date: m.expiry_date,
            status: m.status,
        }
    }
}

/// Finds an active batch by number, creating it when absent. Used by the
/// order processor for first imports of a new batch number.
pub async fn resolve_or_create_batch<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    batch_number: &str,
    initial_quantity: Decimal,
    unit_price: Option<Decimal>,
    production_date: Option<chrono::NaiveDate>,
    expiry_date: Option<chrono::NaiveDate>,
) -> Result<product_batch::Model, ServiceError> {
    if let Some(existing) = ProductBatch::find()
        .filter(product_batch::Column::BatchNumber.eq(batch_number))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let batch = product_batch::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        batch_number: Set(batch_number.to_string()),
        initial_quantity: Set(initial_quantity),
        current_quantity: Set(Decimal::ZERO),
        unit_price: Set(unit_price),
        production_date: Set(production_date),
        expiry_date: Set(expiry_date),
        status: Set(RecordStatus::Active),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(conn)
    .await?;
    Ok(batch)
}

#[derive(Clone)]
pub struct ProductBatchService {
    db_pool: Arc<DbPool>,
}

impl ProductBatchService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(batch_number = %request.batch_number))]
    pub async fn create_batch(
        &self,
        request: CreateBatchRequest,
    ) -> Result<BatchResponse, ServiceError> {
        let db = self.db_pool.as_ref();

        if request.batch_number.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "batch number is required".to_string(),
            ));
        }
        if request.initial_quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "initial quantity cannot be negative".to_string(),
            ));
        }

        Product::find_by_id(request.product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product {} not found", request.product_id))
            })?;

        let duplicate = ProductBatch::find()
            .filter(product_batch::Column::BatchNumber.eq(request.batch_number.clone()))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "batch number {} already exists",
                request.batch_number
            )));
        }

        let batch = product_batch::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(request.product_id),
            batch_number: Set(request.batch_number),
            initial_quantity: Set(request.initial_quantity),
            current_quantity: Set(request.initial_quantity),
            unit_price: Set(request.unit_price),
            production_date: Set(request.production_date),
            expiry_date: Set(request.expiry_date),
            status: Set(RecordStatus::Active),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        Ok(batch.into())
    }

    pub async fn get_batch(&self, id: Uuid) -> Result<BatchResponse, ServiceError> {
        let batch = ProductBatch::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product batch {id} not found")))?;
        Ok(batch.into())
    }

    pub async fn list_batches(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<BatchResponse>, u64), ServiceError> {
        let paginator = ProductBatch::find()
            .filter(product_batch::Column::Status.eq(RecordStatus::Active))
            .order_by_desc(product_batch::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), per_page.max(1));
        let total = paginator.num_items().await?;
        let batches = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((batches.into_iter().map(Into::into).collect(), total))
    }

    /// Soft delete. The batch stays queryable for audit joins.
    #[instrument(skip(self))]
    pub async fn archive_batch(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let batch = ProductBatch::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product batch {id} not found")))?;

        let mut active: product_batch::ActiveModel = batch.into();
        active.status = Set(RecordStatus::Archived);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;
        Ok(())
    }
}
