use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::RecordStatus;

/// Warehouse header. `width` x `height` define the cell grid; the cells
/// themselves are created and deleted by the resize operation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub status: RecordStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::warehouse_cell::Entity")]
    Cells,
    #[sea_orm(has_many = "super::import_order::Entity")]
    Orders,
}

impl Related<super::warehouse_cell::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cells.def()
    }
}

impl Related<super::import_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
