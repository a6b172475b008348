pub mod catalog_category;
pub mod catalog_product;
pub mod inventory_category;
pub mod inventory_item;
pub mod supplier;
pub mod transfer_loss;
pub mod transfer_order;
pub mod transfer_order_item;
