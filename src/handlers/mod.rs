pub mod activities;
pub mod orders;
pub mod product_batches;
pub mod warehouses;

use std::sync::Arc;

use crate::services::{
    activities::ActivityService, orders::OrderService, product_batches::ProductBatchService,
    reconciliation::ReconciliationService, warehouses::WarehouseService,
};

/// Service handles shared across the handler layer.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub warehouses: Arc<WarehouseService>,
    pub batches: Arc<ProductBatchService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub activities: Arc<ActivityService>,
}
