//! Inventory ledger accessor: the only code path that mutates
//! `inventory_items.stock_quantity`.
//!
//! Both operations run inside the caller's transaction and work from a fresh
//! read, never a stale value. Writes are version-guarded so two concurrent
//! mutations of the same row cannot both commit.

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;
use uuid::Uuid;

use crate::{
    entities::inventory_item::{self, Entity as InventoryItem},
    errors::ServiceError,
};

/// Decrements stock, failing when the current quantity is below `qty`.
/// Returns the post-mutation quantity.
pub async fn decrement<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    inventory_item_id: Uuid,
    qty: i32,
) -> Result<i32, ServiceError> {
    let item = load_item(conn, store_id, inventory_item_id).await?;

    if item.stock_quantity < qty {
        return Err(ServiceError::InsufficientStock(format!(
            "item {} at store {}: available {}, requested {}",
            inventory_item_id, store_id, item.stock_quantity, qty
        )));
    }

    apply(conn, item, -qty).await
}

/// Increments stock with no upper bound. Returns the post-mutation quantity.
pub async fn increment<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    inventory_item_id: Uuid,
    qty: i32,
) -> Result<i32, ServiceError> {
    let item = load_item(conn, store_id, inventory_item_id).await?;
    apply(conn, item, qty).await
}

async fn load_item<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    inventory_item_id: Uuid,
) -> Result<inventory_item::Model, ServiceError> {
    InventoryItem::find()
        .filter(inventory_item::Column::Id.eq(inventory_item_id))
        .filter(inventory_item::Column::StoreId.eq(store_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "inventory item {} not found at store {}",
                inventory_item_id, store_id
            ))
        })
}

async fn apply<C: ConnectionTrait>(
    conn: &C,
    item: inventory_item::Model,
    delta: i32,
) -> Result<i32, ServiceError> {
    let new_quantity = item.stock_quantity + delta;

    let update = inventory_item::ActiveModel {
        stock_quantity: Set(new_quantity),
        version: Set(item.version + 1),
        updated_at: Set(Some(Utc::now())),
        ..Default::default()
    };

    let result = InventoryItem::update_many()
        .set(update)
        .filter(inventory_item::Column::Id.eq(item.id))
        .filter(inventory_item::Column::Version.eq(item.version))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected != 1 {
        return Err(ServiceError::ConcurrentModification(item.id));
    }

    debug!(
        item_id = %item.id,
        store_id = %item.store_id,
        delta,
        new_quantity,
        "stock quantity updated"
    );

    Ok(new_quantity)
}
