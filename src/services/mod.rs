pub mod activities;
pub mod orders;
pub mod product_batches;
pub mod reconciliation;
pub mod stock;
pub mod warehouses;
