use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::CellStatus;

/// A single grid position inside a warehouse, keyed by
/// (warehouse_id, grid_row, grid_col) with a generated code like "A01".
///
/// Invariant: 0 <= current_amount <= max_capacity. Imports are rejected
/// over capacity, exports clamp at zero. Cells are cleared rather than
/// deleted; only a grid shrink deletes them, and only while empty.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_cells")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub grid_row: i32,
    pub grid_col: i32,
    pub cell_code: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub max_capacity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub current_amount: Decimal,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub batch_number: Option<String>,
    pub production_date: Option<Date>,
    pub expiry_date: Option<Date>,
    pub supplier: Option<String>,
    pub status: CellStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
    #[sea_orm(has_many = "super::warehouse_cell_product::Entity")]
    CellProducts,
    #[sea_orm(has_many = "super::warehouse_activity::Entity")]
    Activities,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl Related<super::warehouse_cell_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CellProducts.def()
    }
}

impl Related<super::warehouse_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
