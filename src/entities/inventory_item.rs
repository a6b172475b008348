use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-store inventory record. The SKU is unique within a store; SKU equality
/// across two stores identifies "the same product" for transfer purposes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub store_id: Uuid,
    pub sku: String,
    pub name: String,
    pub barcode: Option<String>,
    pub unit: String,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price_per_unit: Decimal,

    pub stock_quantity: i32,
    pub min_stock: i32,

    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,

    /// Optimistic concurrency token for stock mutations.
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_category::Entity",
        from = "Column::CategoryId",
        to = "super::inventory_category::Column::Id"
    )]
    InventoryCategory,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::transfer_order_item::Entity")]
    TransferOrderItem,
}

impl Related<super::inventory_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryCategory.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::transfer_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferOrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
