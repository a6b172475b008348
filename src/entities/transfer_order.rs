use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single request to move specified quantities of specific items from one
/// store to another. Created by the source store; later transitions may be
/// driven by either party depending on the current status.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable sequential code, date-scoped: TS-YYYYMMDD-NNNN
    #[sea_orm(unique)]
    pub transaction_code: String,

    pub store_from_id: Uuid,
    pub store_to_id: Uuid,
    pub store_created_by: Uuid,

    pub status: String,

    pub drafted_by: Uuid,
    pub drafted_at: DateTime<Utc>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_by: Option<Uuid>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub logistic_provider: Option<String>,
    pub tracking_number: Option<String>,
    pub delivery_note: Option<String>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub canceled_by: Option<Uuid>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub cancel_note: Option<String>,

    /// Optimistic concurrency token; bumped on every committed transition.
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transfer_order_item::Entity")]
    TransferOrderItem,
    #[sea_orm(has_many = "super::transfer_loss::Entity")]
    TransferLoss,
}

impl Related<super::transfer_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferOrderItem.def()
    }
}

impl Related<super::transfer_loss::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferLoss.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
