use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::StoreContext,
    db::DbPool,
    entities::{
        catalog_category::{self, Entity as CatalogCategory},
        catalog_product::{self, Entity as CatalogProduct},
        inventory_category::{self, Entity as InventoryCategory},
        inventory_item::{self, Entity as InventoryItem},
        supplier::{self, Entity as Supplier},
        transfer_order_item::{self, Entity as TransferOrderItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::transfer_status::TransferStatus,
};

/// Well-known code for the idempotently-provisioned default category and
/// supplier at a destination store.
pub const DEFAULT_CODE: &str = "DEFAULT";
const DEFAULT_NAME: &str = "Default";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningReport {
    /// Destination inventory items created.
    pub items_created: usize,
    /// Catalog products created.
    pub products_created: usize,
    /// Lines skipped because the destination already had the SKU.
    pub skipped: usize,
}

/// Prepares a destination store to receive a transfer: for every line whose
/// SKU has no mirror at the destination yet, creates the inventory item (zero
/// starting stock), the default category/supplier, and the linked catalog
/// product.
///
/// Idempotent: a second run finds either the cached flag or the now-present
/// SKU and skips. Kept separate from the state machine so transitions can be
/// tested without a catalog backend.
#[derive(Clone)]
pub struct CatalogProvisioningService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CatalogProvisioningService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self), fields(order_id = %order_id, store = %ctx.store_id))]
    pub async fn provision_for_order(
        &self,
        ctx: StoreContext,
        order_id: Uuid,
    ) -> Result<ProvisioningReport, ServiceError> {
        let report = self
            .db
            .transaction::<_, ProvisioningReport, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = super::transfer_orders::load_order(txn, order_id).await?;

                    if ctx.store_id != order.store_from_id && ctx.store_id != order.store_to_id {
                        return Err(ServiceError::Unauthorized(format!(
                            "store {} is not a party to transfer order {}",
                            ctx.store_id, order.id
                        )));
                    }

                    let status = TransferStatus::parse(&order.status)?;
                    if status.is_terminal() {
                        return Err(ServiceError::InvalidStatus(format!(
                            "cannot provision transfer order {} in terminal status {}",
                            order.id, status
                        )));
                    }

                    let items = TransferOrderItem::find()
                        .filter(transfer_order_item::Column::TransferOrderId.eq(order_id))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut report = ProvisioningReport::default();

                    for item in items {
                        if item.has_destination_product {
                            report.skipped += 1;
                            continue;
                        }

                        let source = InventoryItem::find_by_id(item.inventory_item_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "source inventory item {} not found",
                                    item.inventory_item_id
                                ))
                            })?;

                        let existing = InventoryItem::find()
                            .filter(inventory_item::Column::StoreId.eq(order.store_to_id))
                            .filter(inventory_item::Column::Sku.eq(source.sku.clone()))
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        if existing.is_none() {
                            provision_line(txn, order.store_to_id, &source, &mut report).await?;
                        } else {
                            report.skipped += 1;
                        }

                        let mut line: transfer_order_item::ActiveModel = item.into();
                        line.has_destination_product = Set(true);
                        line.updated_at = Set(Some(Utc::now()));
                        line.update(txn).await.map_err(ServiceError::db_error)?;
                    }

                    Ok(report)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.event_sender
            .send(Event::DestinationProvisioned {
                transfer_order_id: order_id,
                items_created: report.items_created,
                products_created: report.products_created,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            order_id = %order_id,
            items_created = report.items_created,
            products_created = report.products_created,
            skipped = report.skipped,
            "destination provisioning completed"
        );

        Ok(report)
    }
}

/// Creates the destination mirror item and its catalog rows for one line.
async fn provision_line<C: ConnectionTrait>(
    txn: &C,
    store_to_id: Uuid,
    source: &inventory_item::Model,
    report: &mut ProvisioningReport,
) -> Result<(), ServiceError> {
    let now = Utc::now();

    let category_id = ensure_default_category(txn, store_to_id).await?;
    let supplier_id = ensure_default_supplier(txn, store_to_id).await?;

    let mirror = inventory_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_to_id),
        sku: Set(source.sku.clone()),
        name: Set(source.name.clone()),
        barcode: Set(source.barcode.clone()),
        unit: Set(source.unit.clone()),
        price_per_unit: Set(source.price_per_unit),
        stock_quantity: Set(0),
        min_stock: Set(source.min_stock),
        category_id: Set(Some(category_id)),
        supplier_id: Set(Some(supplier_id)),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(None),
    };
    let mirror = mirror.insert(txn).await.map_err(ServiceError::db_error)?;
    report.items_created += 1;

    // A same-name product linked to any other inventory item means two
    // unrelated products share a name; refuse rather than silently merge.
    if let Some(conflicting) = CatalogProduct::find()
        .filter(catalog_product::Column::StoreId.eq(store_to_id))
        .filter(catalog_product::Column::Name.eq(source.name.clone()))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
    {
        if conflicting.inventory_item_id != mirror.id {
            return Err(ServiceError::Conflict(format!(
                "catalog product '{}' already exists at store {} under inventory item {}",
                source.name, store_to_id, conflicting.inventory_item_id
            )));
        }
        return Ok(());
    }

    let catalog_category_id =
        resolve_catalog_category(txn, store_to_id, source.category_id).await?;

    let product = catalog_product::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_to_id),
        inventory_item_id: Set(mirror.id),
        name: Set(source.name.clone()),
        price: Set(source.price_per_unit),
        catalog_category_id: Set(Some(catalog_category_id)),
        created_at: Set(now),
        updated_at: Set(None),
    };
    product.insert(txn).await.map_err(ServiceError::db_error)?;
    report.products_created += 1;

    Ok(())
}

async fn ensure_default_category<C: ConnectionTrait>(
    txn: &C,
    store_id: Uuid,
) -> Result<Uuid, ServiceError> {
    if let Some(category) = InventoryCategory::find()
        .filter(inventory_category::Column::StoreId.eq(store_id))
        .filter(inventory_category::Column::Code.eq(DEFAULT_CODE))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
    {
        return Ok(category.id);
    }

    let category = inventory_category::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        code: Set(DEFAULT_CODE.to_string()),
        name: Set(DEFAULT_NAME.to_string()),
        created_at: Set(Utc::now()),
    };
    let category = category.insert(txn).await.map_err(ServiceError::db_error)?;
    Ok(category.id)
}

async fn ensure_default_supplier<C: ConnectionTrait>(
    txn: &C,
    store_id: Uuid,
) -> Result<Uuid, ServiceError> {
    if let Some(existing) = Supplier::find()
        .filter(supplier::Column::StoreId.eq(store_id))
        .filter(supplier::Column::Code.eq(DEFAULT_CODE))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
    {
        return Ok(existing.id);
    }

    let created = supplier::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        code: Set(DEFAULT_CODE.to_string()),
        name: Set(DEFAULT_NAME.to_string()),
        created_at: Set(Utc::now()),
    };
    let created = created.insert(txn).await.map_err(ServiceError::db_error)?;
    Ok(created.id)
}

/// Resolves the destination catalog category by name-match against the
/// source item's inventory category, creating it if absent.
async fn resolve_catalog_category<C: ConnectionTrait>(
    txn: &C,
    store_id: Uuid,
    source_category_id: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    let name = match source_category_id {
        Some(id) => InventoryCategory::find_by_id(id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|c| c.name)
            .unwrap_or_else(|| DEFAULT_NAME.to_string()),
        None => DEFAULT_NAME.to_string(),
    };

    if let Some(category) = CatalogCategory::find()
        .filter(catalog_category::Column::StoreId.eq(store_id))
        .filter(catalog_category::Column::Name.eq(name.clone()))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
    {
        return Ok(category.id);
    }

    let category = catalog_category::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        name: Set(name),
        created_at: Set(Utc::now()),
    };
    let category = category.insert(txn).await.map_err(ServiceError::db_error)?;
    Ok(category.id)
}
