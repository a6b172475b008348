// Transfer workflow core
pub mod transfer_orders;
pub mod transfer_status;

// Ledger and reconciliation
pub mod stock_ledger;
pub mod transfer_losses;

// Destination catalog provisioning
pub mod catalog_provisioning;
