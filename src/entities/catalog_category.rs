use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sales-facing category, resolved per store by name match against the
/// inventory category during provisioning.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub store_id: Uuid,
    pub name: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::catalog_product::Entity")]
    CatalogProduct,
}

impl Related<super::catalog_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
