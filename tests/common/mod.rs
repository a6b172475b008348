#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use tokio::task::JoinHandle;
use uuid::Uuid;

use transferflow::{
    config::AppConfig,
    db::{self, DbPool},
    entities::{catalog_product, inventory_category, inventory_item, transfer_order},
    events, AppServices, StoreContext,
};

/// Test harness backed by an in-memory SQLite database with the full schema
/// applied. A single pooled connection keeps the in-memory database shared.
pub struct TestHarness {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    _event_task: JoinHandle<()>,
}

pub async fn setup() -> TestHarness {
    let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;

    let pool = db::establish_connection(&cfg)
        .await
        .expect("failed to create test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");

    let (sender, rx) = events::channel(128);
    let event_task = tokio::spawn(events::process_events(rx));

    let db = Arc::new(pool);
    let services = AppServices::new(db.clone(), Arc::new(sender));

    TestHarness {
        db,
        services,
        _event_task: event_task,
    }
}

pub fn ctx(store_id: Uuid) -> StoreContext {
    StoreContext::new(Uuid::new_v4(), store_id)
}

impl TestHarness {
    pub async fn seed_item(
        &self,
        store_id: Uuid,
        sku: &str,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> inventory_item::Model {
        self.seed_item_in_category(store_id, sku, name, price, stock, None)
            .await
    }

    pub async fn seed_item_in_category(
        &self,
        store_id: Uuid,
        sku: &str,
        name: &str,
        price: Decimal,
        stock: i32,
        category_id: Option<Uuid>,
    ) -> inventory_item::Model {
        inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            sku: Set(sku.to_string()),
            name: Set(name.to_string()),
            barcode: Set(None),
            unit: Set("pcs".to_string()),
            price_per_unit: Set(price),
            stock_quantity: Set(stock),
            min_stock: Set(0),
            category_id: Set(category_id),
            supplier_id: Set(None),
            version: Set(0),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed inventory item")
    }

    pub async fn seed_inventory_category(
        &self,
        store_id: Uuid,
        code: &str,
        name: &str,
    ) -> inventory_category::Model {
        inventory_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed inventory category")
    }

    pub async fn seed_catalog_product(
        &self,
        store_id: Uuid,
        name: &str,
        inventory_item_id: Uuid,
        price: Decimal,
    ) -> catalog_product::Model {
        catalog_product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            inventory_item_id: Set(inventory_item_id),
            name: Set(name.to_string()),
            price: Set(price),
            catalog_category_id: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed catalog product")
    }

    pub async fn stock_of(&self, item_id: Uuid) -> i32 {
        inventory_item::Entity::find_by_id(item_id)
            .one(self.db.as_ref())
            .await
            .expect("failed to read inventory item")
            .expect("inventory item missing")
            .stock_quantity
    }

    pub async fn order_count(&self) -> u64 {
        transfer_order::Entity::find()
            .count(self.db.as_ref())
            .await
            .expect("failed to count transfer orders")
    }
}
