use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a transfer order, referencing a source-store inventory item.
///
/// `unit_price` and `subtotal` are snapshotted when the line is created and
/// never re-read from the catalog, so later price changes cannot drift into
/// the loss valuation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub transfer_order_id: Uuid,
    pub inventory_item_id: Uuid,

    pub qty_reserved: i32,
    pub qty_received: Option<i32>,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub subtotal: Decimal,

    pub status: String,

    /// Cached at order creation: does a same-SKU item already exist at the
    /// destination store?
    pub has_destination_product: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
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
        belongs_to = "super::inventory_item::Entity",
        from = "Column::InventoryItemId",
        to = "super::inventory_item::Column::Id"
    )]
    InventoryItem,
}

impl Related<super::transfer_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferOrder.def()
    }
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
