mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{ctx, setup};
use transferflow::services::transfer_orders::{
    CreateTransferOrderCommand, ReceiptLineInput, ReceiveDisposition, ReceiveTransferOrderCommand,
    ShipTransferOrderCommand, TransferLineInput, UpdateTransferOrderCommand,
};
use transferflow::ServiceError;

fn create_cmd(store_to: Uuid, item: Uuid, qty: i32) -> CreateTransferOrderCommand {
    CreateTransferOrderCommand {
        store_to_id: store_to,
        items: vec![TransferLineInput {
            inventory_item_id: item,
            qty_reserved: qty,
        }],
    }
}

fn ship_cmd() -> ShipTransferOrderCommand {
    ShipTransferOrderCommand {
        logistic_provider: Some("ACME Logistics".to_string()),
        tracking_number: Some("TRK-0001".to_string()),
        delivery_note: None,
    }
}

fn receive_cmd(
    line_id: Uuid,
    qty: i32,
    disposition: ReceiveDisposition,
) -> ReceiveTransferOrderCommand {
    ReceiveTransferOrderCommand {
        disposition,
        lines: vec![ReceiptLineInput {
            transfer_order_item_id: line_id,
            qty_received: qty,
        }],
    }
}

#[tokio::test]
async fn partial_receipt_records_loss_and_reconciles_both_ledgers() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-001", "Arabica Beans", dec!(2.50), 10).await;
    let dst_item = app.seed_item(dest, "SKU-001", "Arabica Beans", dec!(2.50), 0).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 10))
        .await
        .unwrap();
    assert_eq!(created.order.status, "drafted");
    assert_eq!(created.items[0].unit_price, dec!(2.50));
    assert_eq!(created.items[0].subtotal, dec!(25.00));
    assert!(created.items[0].has_destination_product);

    svc.approve(ctx(source), created.order.id).await.unwrap();

    // Stock untouched until ship.
    assert_eq!(app.stock_of(src_item.id).await, 10);

    svc.ship(ctx(source), created.order.id, ship_cmd()).await.unwrap();
    assert_eq!(app.stock_of(src_item.id).await, 0);
    assert_eq!(app.stock_of(dst_item.id).await, 0);

    let line_id = created.items[0].id;
    let received = svc
        .receive(
            ctx(dest),
            created.order.id,
            receive_cmd(line_id, 8, ReceiveDisposition::ReceivedWithIssue),
        )
        .await
        .unwrap();

    assert_eq!(received.order.status, "received_with_issue");
    assert_eq!(received.items[0].qty_received, Some(8));
    assert_eq!(received.items[0].status, "received_with_issue");
    assert_eq!(app.stock_of(dst_item.id).await, 8);
    assert_eq!(app.stock_of(src_item.id).await, 0);

    let losses = app
        .services
        .transfer_losses
        .list_losses(created.order.id)
        .await
        .unwrap();
    assert_eq!(losses.len(), 1);
    assert_eq!(losses[0].qty_lost, 2);
    assert_eq!(losses[0].unit_price, dec!(2.50));
    assert_eq!(losses[0].loss_amount, dec!(5.00));
    assert_eq!(losses[0].transfer_order_item_id, line_id);
}

#[tokio::test]
async fn clean_receipt_leaves_no_loss_rows() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-002", "Robusta Beans", dec!(1.25), 6).await;
    let dst_item = app.seed_item(dest, "SKU-002", "Robusta Beans", dec!(1.25), 3).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 6))
        .await
        .unwrap();
    svc.approve(ctx(source), created.order.id).await.unwrap();
    svc.ship(ctx(source), created.order.id, ship_cmd()).await.unwrap();

    let received = svc
        .receive(
            ctx(dest),
            created.order.id,
            receive_cmd(created.items[0].id, 6, ReceiveDisposition::Received),
        )
        .await
        .unwrap();

    assert_eq!(received.order.status, "received");
    assert_eq!(received.items[0].status, "received");
    assert_eq!(app.stock_of(src_item.id).await, 0);
    assert_eq!(app.stock_of(dst_item.id).await, 9);

    let losses = app
        .services
        .transfer_losses
        .list_losses(created.order.id)
        .await
        .unwrap();
    assert!(losses.is_empty());
}

#[tokio::test]
async fn create_with_insufficient_stock_persists_nothing() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-003", "Matcha", dec!(9.00), 3).await;

    let err = app
        .services
        .transfer_orders
        .create(ctx(source), create_cmd(dest, src_item.id, 5))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(app.order_count().await, 0);
    assert_eq!(app.stock_of(src_item.id).await, 3);
}

#[tokio::test]
async fn ship_from_drafted_is_rejected_and_stock_untouched() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-004", "Oat Milk", dec!(3.10), 12).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 4))
        .await
        .unwrap();

    let err = svc
        .ship(ctx(source), created.order.id, ship_cmd())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    let reloaded = svc.get(created.order.id).await.unwrap();
    assert_eq!(reloaded.order.status, "drafted");
    assert_eq!(app.stock_of(src_item.id).await, 12);
}

#[tokio::test]
async fn receive_by_source_store_is_unauthorized() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-005", "Espresso Cups", dec!(0.80), 20).await;
    app.seed_item(dest, "SKU-005", "Espresso Cups", dec!(0.80), 0).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 5))
        .await
        .unwrap();
    svc.approve(ctx(source), created.order.id).await.unwrap();
    svc.ship(ctx(source), created.order.id, ship_cmd()).await.unwrap();

    let err = svc
        .receive(
            ctx(source),
            created.order.id,
            receive_cmd(created.items[0].id, 5, ReceiveDisposition::Received),
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Unauthorized(_));
    let reloaded = svc.get(created.order.id).await.unwrap();
    assert_eq!(reloaded.order.status, "shipped");
}

#[tokio::test]
async fn approve_by_destination_store_is_unauthorized() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-006", "Filters", dec!(0.05), 100).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 50))
        .await
        .unwrap();

    let err = svc.approve(ctx(dest), created.order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));
}

#[tokio::test]
async fn cancel_from_drafted_never_touches_stock() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-007", "Syrup", dec!(4.40), 8).await;
    let dst_item = app.seed_item(dest, "SKU-007", "Syrup", dec!(4.40), 2).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 8))
        .await
        .unwrap();

    let canceled = svc
        .cancel(ctx(source), created.order.id, Some("restock planned locally".to_string()))
        .await
        .unwrap();

    assert_eq!(canceled.status, "canceled");
    assert_eq!(canceled.cancel_note.as_deref(), Some("restock planned locally"));
    assert_eq!(app.stock_of(src_item.id).await, 8);
    assert_eq!(app.stock_of(dst_item.id).await, 2);

    let reloaded = svc.get(created.order.id).await.unwrap();
    assert!(reloaded.items.iter().all(|i| i.status == "canceled"));

    // Terminal: no further transitions.
    let err = svc.approve(ctx(source), created.order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn update_replaces_lines_wholesale() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let first = app.seed_item(source, "SKU-008", "Cocoa", dec!(6.00), 10).await;
    let second = app.seed_item(source, "SKU-009", "Vanilla", dec!(11.00), 4).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, first.id, 10))
        .await
        .unwrap();

    let updated = svc
        .update(
            ctx(source),
            created.order.id,
            UpdateTransferOrderCommand {
                items: vec![TransferLineInput {
                    inventory_item_id: second.id,
                    qty_reserved: 3,
                }],
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.items[0].inventory_item_id, second.id);
    assert_eq!(updated.items[0].qty_reserved, 3);
    assert_eq!(updated.items[0].unit_price, dec!(11.00));
    assert!(updated.order.version > created.order.version);
}

#[tokio::test]
async fn update_while_approved_is_destination_only() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-010", "Paper Bags", dec!(0.20), 50).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 30))
        .await
        .unwrap();
    svc.approve(ctx(source), created.order.id).await.unwrap();

    let cmd = UpdateTransferOrderCommand {
        items: vec![TransferLineInput {
            inventory_item_id: src_item.id,
            qty_reserved: 20,
        }],
    };

    let err = svc
        .update(ctx(source), created.order.id, cmd.clone())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    let updated = svc.update(ctx(dest), created.order.id, cmd).await.unwrap();
    assert_eq!(updated.order.status, "approved");
    assert_eq!(updated.items[0].qty_reserved, 20);
    assert_eq!(updated.items[0].status, "on_progress");
}

#[tokio::test]
async fn transaction_codes_are_sequential_within_a_day() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let item = app.seed_item(source, "SKU-011", "Lids", dec!(0.10), 100).await;

    let svc = &app.services.transfer_orders;
    let first = svc
        .create(ctx(source), create_cmd(dest, item.id, 10))
        .await
        .unwrap();
    let second = svc
        .create(ctx(source), create_cmd(dest, item.id, 10))
        .await
        .unwrap();

    assert!(first.order.transaction_code.starts_with("TS-"));
    assert!(first.order.transaction_code.ends_with("-0001"));
    assert!(second.order.transaction_code.ends_with("-0002"));
    assert_ne!(first.order.transaction_code, second.order.transaction_code);
}

#[tokio::test]
async fn receive_without_destination_mirror_fails_and_rolls_back() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    // No destination item with this SKU is ever seeded.
    let src_item = app.seed_item(source, "SKU-012", "Chai Mix", dec!(5.00), 7).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 7))
        .await
        .unwrap();
    svc.approve(ctx(source), created.order.id).await.unwrap();
    svc.ship(ctx(source), created.order.id, ship_cmd()).await.unwrap();

    let err = svc
        .receive(
            ctx(dest),
            created.order.id,
            receive_cmd(created.items[0].id, 7, ReceiveDisposition::Received),
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));

    // The failed receive left the order shipped and its line untouched.
    let reloaded = svc.get(created.order.id).await.unwrap();
    assert_eq!(reloaded.order.status, "shipped");
    assert_eq!(reloaded.items[0].qty_received, None);
}

#[tokio::test]
async fn listings_are_store_scoped() {
    let app = setup().await;
    let (store_a, store_b, store_c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let item_a = app.seed_item(store_a, "SKU-013", "Napkins", dec!(0.02), 500).await;
    let item_b = app.seed_item(store_b, "SKU-014", "Stirrers", dec!(0.01), 500).await;

    let svc = &app.services.transfer_orders;
    svc.create(ctx(store_a), create_cmd(store_b, item_a.id, 100))
        .await
        .unwrap();
    svc.create(ctx(store_b), create_cmd(store_c, item_b.id, 50))
        .await
        .unwrap();

    let (outbound_a, total_a) = svc.list_outbound(store_a, 1, 10).await.unwrap();
    assert_eq!(total_a, 1);
    assert_eq!(outbound_a[0].store_from_id, store_a);

    let (inbound_b, total_in_b) = svc.list_inbound(store_b, 1, 10).await.unwrap();
    assert_eq!(total_in_b, 1);
    assert_eq!(inbound_b[0].store_to_id, store_b);

    let (outbound_b, total_out_b) = svc.list_outbound(store_b, 1, 10).await.unwrap();
    assert_eq!(total_out_b, 1);
    assert_eq!(outbound_b[0].store_to_id, store_c);

    let (inbound_a, total_in_a) = svc.list_inbound(store_a, 1, 10).await.unwrap();
    assert_eq!(total_in_a, 0);
    assert!(inbound_a.is_empty());
}

#[tokio::test]
async fn approve_fails_when_stock_moved_since_drafting() {
    let app = setup().await;
    let (source, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let src_item = app.seed_item(source, "SKU-015", "Cold Brew", dec!(3.75), 10).await;

    let svc = &app.services.transfer_orders;
    let created = svc
        .create(ctx(source), create_cmd(dest, src_item.id, 10))
        .await
        .unwrap();

    // Concurrent sales consumed stock after drafting.
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    let mut depleted: transferflow::entities::inventory_item::ActiveModel =
        transferflow::entities::inventory_item::Entity::find_by_id(src_item.id)
            .one(app.db.as_ref())
            .await
            .unwrap()
            .unwrap()
            .into();
    depleted.stock_quantity = Set(4);
    depleted.update(app.db.as_ref()).await.unwrap();

    let err = svc.approve(ctx(source), created.order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let reloaded = svc.get(created.order.id).await.unwrap();
    assert_eq!(reloaded.order.status, "drafted");
}
