//! Inter-store stock transfer subsystem.
//!
//! Moves inventory quantities from a source store to a destination store
//! through a drafted/approved/shipped/received pipeline, keeping both stock
//! ledgers consistent, provisioning destination catalog records on demand,
//! and reconciling shipment/receipt discrepancies into an append-only loss
//! ledger.

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

pub use auth::StoreContext;
pub use errors::ServiceError;

use db::DbPool;
use events::EventSender;
use services::{
    catalog_provisioning::CatalogProvisioningService, transfer_losses::TransferLossService,
    transfer_orders::TransferOrderService,
};

/// Bundle of the transfer services sharing one connection pool and event
/// channel.
#[derive(Clone)]
pub struct AppServices {
    pub transfer_orders: TransferOrderService,
    pub catalog_provisioning: CatalogProvisioningService,
    pub transfer_losses: TransferLossService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            transfer_orders: TransferOrderService::new(db.clone(), event_sender.clone()),
            catalog_provisioning: CatalogProvisioningService::new(db.clone(), event_sender),
            transfer_losses: TransferLossService::new(db),
        }
    }
}
