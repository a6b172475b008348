use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only shortfall record: shipped minus received, valued at the line's
/// snapshotted unit price. Rows exist only for under-delivered lines and are
/// never mutated after insertion.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_losses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub transfer_order_id: Uuid,
    pub transfer_order_item_id: Uuid,
    pub inventory_item_id: Uuid,

    pub qty_lost: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub loss_amount: Decimal,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transfer_order::Entity",
        from = "Column::TransferOrderId",
        to = "super::transfer_order::Column::Id"
    )]
    TransferOrder,
    #[sea_orm(
        belongs_to = "super::transfer_order_item::Entity",
        from = "Column::TransferOrderItemId",
        to = "super::transfer_order_item::Column::Id"
    )]
    TransferOrderItem,
}

impl Related<super::transfer_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferOrder.def()
    }
}

impl Related<super::transfer_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferOrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
