//! Database entities for the depot stock core.
//!
//! One module per table, SeaORM `DeriveEntityModel` style. Closed string
//! enums replace the free-text type/status columns of earlier revisions so
//! the reconciliation ledger cannot be broken by a typo.

pub mod import_order;
pub mod import_order_detail;
pub mod product;
pub mod product_batch;
pub mod warehouse;
pub mod warehouse_activity;
pub mod warehouse_cell;
pub mod warehouse_cell_product;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Uniform soft-delete state shared by every archivable entity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// Direction of an import/export order. Immutable once the order exists;
/// determines the sign of every cell adjustment the order applies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum OrderType {
    #[sea_orm(string_value = "Import")]
    Import,
    #[sea_orm(string_value = "Export")]
    Export,
}

/// Kind of cell mutation recorded in the activity ledger.
///
/// Reconciliation matches on these exhaustively, so adding a variant means
/// deciding whether it counts against a batch's current quantity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ActivityType {
    #[sea_orm(string_value = "Import")]
    Import,
    #[sea_orm(string_value = "Export")]
    Export,
    #[sea_orm(string_value = "ClearProduct")]
    ClearProduct,
    #[sea_orm(string_value = "Maintenance")]
    Maintenance,
    #[sea_orm(string_value = "StaffAssignment")]
    StaffAssignment,
}

/// Display state of a warehouse cell, derived from amount vs. capacity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum CellStatus {
    #[sea_orm(string_value = "Empty")]
    Empty,
    #[sea_orm(string_value = "Occupied")]
    Occupied,
    #[sea_orm(string_value = "Full")]
    Full,
}
