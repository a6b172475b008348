use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::StoreContext,
    db::DbPool,
    entities::{
        inventory_item::{self, Entity as InventoryItem},
        transfer_order::{self, Entity as TransferOrder},
        transfer_order_item::{self, Entity as TransferOrderItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        stock_ledger,
        transfer_losses::{compute_losses, persist_losses},
        transfer_status::{transition, StoreRole, TransferAction, TransferItemStatus, TransferStatus},
    },
};

lazy_static! {
    static ref TRANSFER_TRANSITIONS: IntCounter = IntCounter::new(
        "transfer_order_transitions_total",
        "Total number of committed transfer order transitions"
    )
    .expect("metric can be created");
    static ref TRANSFER_TRANSITION_FAILURES: IntCounter = IntCounter::new(
        "transfer_order_transition_failures_total",
        "Total number of rejected or failed transfer order transitions"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferLineInput {
    pub inventory_item_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub qty_reserved: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTransferOrderCommand {
    pub store_to_id: Uuid,

    #[validate(length(min = 1, message = "At least one line is required"))]
    pub items: Vec<TransferLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateTransferOrderCommand {
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub items: Vec<TransferLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShipTransferOrderCommand {
    #[validate(length(max = 100))]
    pub logistic_provider: Option<String>,
    #[validate(length(max = 100))]
    pub tracking_number: Option<String>,
    #[validate(length(max = 500))]
    pub delivery_note: Option<String>,
}

/// What the receiving store reports: a clean receipt, or one with
/// discrepancies that must be reconciled into the loss ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveDisposition {
    Received,
    ReceivedWithIssue,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptLineInput {
    pub transfer_order_item_id: Uuid,

    #[validate(range(min = 0, message = "Received quantity must not be negative"))]
    pub qty_received: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveTransferOrderCommand {
    pub disposition: ReceiveDisposition,
    pub lines: Vec<ReceiptLineInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferOrderWithItems {
    pub order: transfer_order::Model,
    pub items: Vec<transfer_order_item::Model>,
}

/// Owns the transfer order lifecycle:
/// `drafted -> approved -> shipped -> {received | received_with_issue}`,
/// with `drafted/approved -> canceled`.
///
/// Every transition executes inside one database transaction: the order is
/// re-read, checked against the transition table, and committed through an
/// optimistic version guard, so of two racing transitions at most one
/// commits. Stock is never decremented before `ship`; sufficiency checks at
/// create/approve are informational reservations only, which keeps the
/// source store free to sell during the approval window at the cost of a
/// final re-check at ship time.
#[derive(Clone)]
pub struct TransferOrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl TransferOrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Drafts a new transfer order from the calling (source) store.
    #[instrument(skip(self, cmd), fields(store_from = %ctx.store_id, store_to = %cmd.store_to_id))]
    pub async fn create(
        &self,
        ctx: StoreContext,
        cmd: CreateTransferOrderCommand,
    ) -> Result<TransferOrderWithItems, ServiceError> {
        validate_lines(&cmd)?;

        if cmd.store_to_id == ctx.store_id {
            TRANSFER_TRANSITION_FAILURES.inc();
            return Err(ServiceError::ValidationError(
                "cannot transfer stock to the same store".to_string(),
            ));
        }

        let result = self
            .db
            .transaction::<_, TransferOrderWithItems, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let order_id = Uuid::new_v4();

                    let lines = build_lines(
                        txn,
                        order_id,
                        ctx.store_id,
                        cmd.store_to_id,
                        &cmd.items,
                        TransferItemStatus::Pending,
                        now,
                    )
                    .await?;

                    let transaction_code = next_transaction_code(txn, now).await?;

                    let order = transfer_order::ActiveModel {
                        id: Set(order_id),
                        transaction_code: Set(transaction_code),
                        store_from_id: Set(ctx.store_id),
                        store_to_id: Set(cmd.store_to_id),
                        store_created_by: Set(ctx.store_id),
                        status: Set(TransferStatus::Drafted.to_string()),
                        drafted_by: Set(ctx.actor_id),
                        drafted_at: Set(now),
                        approved_by: Set(None),
                        approved_at: Set(None),
                        shipped_by: Set(None),
                        shipped_at: Set(None),
                        logistic_provider: Set(None),
                        tracking_number: Set(None),
                        delivery_note: Set(None),
                        received_by: Set(None),
                        received_at: Set(None),
                        canceled_by: Set(None),
                        canceled_at: Set(None),
                        cancel_note: Set(None),
                        version: Set(0),
                        created_at: Set(now),
                        updated_at: Set(None),
                    };

                    let order = order.insert(txn).await.map_err(ServiceError::db_error)?;

                    TransferOrderItem::insert_many(lines)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let items = load_items(txn, order_id).await?;

                    Ok(TransferOrderWithItems { order, items })
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_TRANSITION_FAILURES.inc();
                ServiceError::from(e)
            })?;

        self.emit(vec![Event::TransferDrafted(result.order.id)])
            .await?;
        TRANSFER_TRANSITIONS.inc();

        info!(
            order_id = %result.order.id,
            transaction_code = %result.order.transaction_code,
            "transfer order drafted"
        );

        Ok(result)
    }

    /// Replaces all line items while the order is still `drafted` (source
    /// store) or `approved` (destination store).
    #[instrument(skip(self, cmd), fields(order_id = %order_id, store = %ctx.store_id))]
    pub async fn update(
        &self,
        ctx: StoreContext,
        order_id: Uuid,
        cmd: UpdateTransferOrderCommand,
    ) -> Result<TransferOrderWithItems, ServiceError> {
        cmd.validate()?;
        for line in &cmd.items {
            line.validate()?;
        }

        let result = self
            .db
            .transaction::<_, TransferOrderWithItems, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = load_order(txn, order_id).await?;
                    let current = check_transition(&order, TransferAction::Update, &ctx)?;
                    debug_assert!(!current.is_terminal());

                    let now = Utc::now();
                    let line_status = match TransferStatus::parse(&order.status)? {
                        TransferStatus::Approved => TransferItemStatus::OnProgress,
                        _ => TransferItemStatus::Pending,
                    };

                    TransferOrderItem::delete_many()
                        .filter(transfer_order_item::Column::TransferOrderId.eq(order_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let lines = build_lines(
                        txn,
                        order_id,
                        order.store_from_id,
                        order.store_to_id,
                        &cmd.items,
                        line_status,
                        now,
                    )
                    .await?;

                    TransferOrderItem::insert_many(lines)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let update = transfer_order::ActiveModel {
                        version: Set(order.version + 1),
                        updated_at: Set(Some(now)),
                        ..Default::default()
                    };
                    commit_order(txn, &order, update).await?;

                    let order = load_order(txn, order_id).await?;
                    let items = load_items(txn, order_id).await?;
                    Ok(TransferOrderWithItems { order, items })
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_TRANSITION_FAILURES.inc();
                ServiceError::from(e)
            })?;

        self.emit(vec![Event::TransferUpdated(order_id)]).await?;
        TRANSFER_TRANSITIONS.inc();

        Ok(result)
    }

    /// Moves the order from `drafted` to `approved`, re-validating stock
    /// sufficiency since quantities may have moved since drafting.
    #[instrument(skip(self), fields(order_id = %order_id, store = %ctx.store_id))]
    pub async fn approve(
        &self,
        ctx: StoreContext,
        order_id: Uuid,
    ) -> Result<transfer_order::Model, ServiceError> {
        let order = self
            .db
            .transaction::<_, transfer_order::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = load_order(txn, order_id).await?;
                    let next = check_transition(&order, TransferAction::Approve, &ctx)?;

                    let items = load_items(txn, order_id).await?;
                    ensure_stock_sufficiency(txn, order.store_from_id, &items).await?;

                    set_line_status(txn, order_id, TransferItemStatus::OnProgress).await?;

                    let now = Utc::now();
                    let update = transfer_order::ActiveModel {
                        status: Set(next.to_string()),
                        approved_by: Set(Some(ctx.actor_id)),
                        approved_at: Set(Some(now)),
                        version: Set(order.version + 1),
                        updated_at: Set(Some(now)),
                        ..Default::default()
                    };
                    commit_order(txn, &order, update).await?;

                    load_order(txn, order_id).await
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_TRANSITION_FAILURES.inc();
                ServiceError::from(e)
            })?;

        self.emit(vec![Event::TransferApproved(order_id)]).await?;
        TRANSFER_TRANSITIONS.inc();

        info!(order_id = %order_id, "transfer order approved");
        Ok(order)
    }

    /// Cancels a `drafted` or `approved` order. Stock was never decremented
    /// for such orders, so no ledger mutation happens on either side.
    #[instrument(skip(self, note), fields(order_id = %order_id, store = %ctx.store_id))]
    pub async fn cancel(
        &self,
        ctx: StoreContext,
        order_id: Uuid,
        note: Option<String>,
    ) -> Result<transfer_order::Model, ServiceError> {
        let order = self
            .db
            .transaction::<_, transfer_order::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = load_order(txn, order_id).await?;
                    let next = check_transition(&order, TransferAction::Cancel, &ctx)?;

                    set_line_status(txn, order_id, TransferItemStatus::Canceled).await?;

                    let now = Utc::now();
                    let update = transfer_order::ActiveModel {
                        status: Set(next.to_string()),
                        canceled_by: Set(Some(ctx.actor_id)),
                        canceled_at: Set(Some(now)),
                        cancel_note: Set(note),
                        version: Set(order.version + 1),
                        updated_at: Set(Some(now)),
                        ..Default::default()
                    };
                    commit_order(txn, &order, update).await?;

                    load_order(txn, order_id).await
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_TRANSITION_FAILURES.inc();
                ServiceError::from(e)
            })?;

        self.emit(vec![Event::TransferCanceled(order_id)]).await?;
        TRANSFER_TRANSITIONS.inc();

        info!(order_id = %order_id, "transfer order canceled");
        Ok(order)
    }

    /// Ships an `approved` order: the one and only point where source stock
    /// is decremented, after a final sufficiency re-check inside the same
    /// transaction.
    #[instrument(skip(self, cmd), fields(order_id = %order_id, store = %ctx.store_id))]
    pub async fn ship(
        &self,
        ctx: StoreContext,
        order_id: Uuid,
        cmd: ShipTransferOrderCommand,
    ) -> Result<transfer_order::Model, ServiceError> {
        cmd.validate()?;

        let (order, stock_events) = self
            .db
            .transaction::<_, (transfer_order::Model, Vec<Event>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = load_order(txn, order_id).await?;
                    let next = check_transition(&order, TransferAction::Ship, &ctx)?;

                    let items = load_items(txn, order_id).await?;

                    let mut events = Vec::with_capacity(items.len());
                    for item in &items {
                        let new_quantity = stock_ledger::decrement(
                            txn,
                            order.store_from_id,
                            item.inventory_item_id,
                            item.qty_reserved,
                        )
                        .await?;
                        events.push(Event::StockDecremented {
                            store_id: order.store_from_id,
                            inventory_item_id: item.inventory_item_id,
                            quantity: item.qty_reserved,
                            new_quantity,
                        });
                    }

                    set_line_status(txn, order_id, TransferItemStatus::Shipped).await?;

                    let now = Utc::now();
                    let update = transfer_order::ActiveModel {
                        status: Set(next.to_string()),
                        shipped_by: Set(Some(ctx.actor_id)),
                        shipped_at: Set(Some(now)),
                        logistic_provider: Set(cmd.logistic_provider.clone()),
                        tracking_number: Set(cmd.tracking_number.clone()),
                        delivery_note: Set(cmd.delivery_note.clone()),
                        version: Set(order.version + 1),
                        updated_at: Set(Some(now)),
                        ..Default::default()
                    };
                    commit_order(txn, &order, update).await?;

                    let order = load_order(txn, order_id).await?;
                    Ok((order, events))
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_TRANSITION_FAILURES.inc();
                ServiceError::from(e)
            })?;

        let mut events = stock_events;
        events.push(Event::TransferShipped(order_id));
        self.emit(events).await?;
        TRANSFER_TRANSITIONS.inc();

        info!(order_id = %order_id, "transfer order shipped");
        Ok(order)
    }

    /// Receives a `shipped` order at the destination store.
    ///
    /// Each line's received quantity is credited to the destination mirror
    /// item (matched by SKU, which must exist). When the receiver reports
    /// `received_with_issue`, every under-delivered line is reconciled into
    /// the loss ledger at the snapshotted unit price.
    #[instrument(skip(self, cmd), fields(order_id = %order_id, store = %ctx.store_id))]
    pub async fn receive(
        &self,
        ctx: StoreContext,
        order_id: Uuid,
        cmd: ReceiveTransferOrderCommand,
    ) -> Result<TransferOrderWithItems, ServiceError> {
        for line in &cmd.lines {
            line.validate()?;
        }

        let (result, mut events) = self
            .db
            .transaction::<_, (TransferOrderWithItems, Vec<Event>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = load_order(txn, order_id).await?;
                    check_transition(&order, TransferAction::Receive, &ctx)?;

                    let items = load_items(txn, order_id).await?;
                    let receipts = match_receipt_lines(&order, &items, &cmd)?;

                    let now = Utc::now();
                    let mut events = Vec::new();
                    let mut total_received = 0;

                    for (item, qty_received) in &receipts {
                        let destination =
                            find_destination_mirror(txn, &order, item).await?;

                        let new_quantity = stock_ledger::increment(
                            txn,
                            order.store_to_id,
                            destination.id,
                            *qty_received,
                        )
                        .await?;
                        total_received += qty_received;

                        events.push(Event::StockIncremented {
                            store_id: order.store_to_id,
                            inventory_item_id: destination.id,
                            quantity: *qty_received,
                            new_quantity,
                        });

                        let line_status = if *qty_received < item.qty_reserved {
                            TransferItemStatus::ReceivedWithIssue
                        } else {
                            TransferItemStatus::Received
                        };

                        let mut line: transfer_order_item::ActiveModel = (*item).clone().into();
                        line.qty_received = Set(Some(*qty_received));
                        line.status = Set(line_status.to_string());
                        line.has_destination_product = Set(true);
                        line.updated_at = Set(Some(now));
                        line.update(txn).await.map_err(ServiceError::db_error)?;
                    }

                    let with_issue = cmd.disposition == ReceiveDisposition::ReceivedWithIssue;
                    if with_issue {
                        let losses = compute_losses(
                            receipts.iter().map(|&(item, qty)| (item, qty)),
                        );
                        for loss in &losses {
                            events.push(Event::TransferLossRecorded {
                                transfer_order_id: order_id,
                                transfer_order_item_id: loss.transfer_order_item_id,
                                qty_lost: loss.qty_lost,
                            });
                        }
                        persist_losses(txn, order_id, &losses).await?;
                    }

                    let final_status = if with_issue {
                        TransferStatus::ReceivedWithIssue
                    } else {
                        TransferStatus::Received
                    };

                    let update = transfer_order::ActiveModel {
                        status: Set(final_status.to_string()),
                        received_by: Set(Some(ctx.actor_id)),
                        received_at: Set(Some(now)),
                        version: Set(order.version + 1),
                        updated_at: Set(Some(now)),
                        ..Default::default()
                    };
                    commit_order(txn, &order, update).await?;

                    events.push(Event::TransferReceived {
                        transfer_order_id: order_id,
                        with_issue,
                        total_received,
                    });

                    let order = load_order(txn, order_id).await?;
                    let items = load_items(txn, order_id).await?;
                    Ok((TransferOrderWithItems { order, items }, events))
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_TRANSITION_FAILURES.inc();
                ServiceError::from(e)
            })?;

        events.sort_by_key(|e| matches!(e, Event::TransferReceived { .. }));
        self.emit(events).await?;
        TRANSFER_TRANSITIONS.inc();

        info!(order_id = %order_id, status = %result.order.status, "transfer order received");
        Ok(result)
    }

    /// Loads one order with its lines.
    #[instrument(skip(self))]
    pub async fn get(&self, order_id: Uuid) -> Result<TransferOrderWithItems, ServiceError> {
        let db = self.db.as_ref();
        let order = load_order(db, order_id).await?;
        let items = load_items(db, order_id).await?;
        Ok(TransferOrderWithItems { order, items })
    }

    /// Sender-side projection: orders authored by `store_id`.
    #[instrument(skip(self))]
    pub async fn list_outbound(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<transfer_order::Model>, u64), ServiceError> {
        self.list(transfer_order::Column::StoreFromId, store_id, page, limit)
            .await
    }

    /// Receiver-side projection: orders addressed to `store_id`.
    #[instrument(skip(self))]
    pub async fn list_inbound(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<transfer_order::Model>, u64), ServiceError> {
        self.list(transfer_order::Column::StoreToId, store_id, page, limit)
            .await
    }

    async fn list(
        &self,
        column: transfer_order::Column,
        store_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<transfer_order::Model>, u64), ServiceError> {
        if page == 0 || limit == 0 {
            return Err(ServiceError::ValidationError(
                "page and limit must be positive".to_string(),
            ));
        }

        let paginator = TransferOrder::find()
            .filter(column.eq(store_id))
            .order_by_desc(transfer_order::Column::CreatedAt)
            .paginate(self.db.as_ref(), limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let orders = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((orders, total))
    }

    async fn emit(&self, events: Vec<Event>) -> Result<(), ServiceError> {
        for event in events {
            self.event_sender
                .send(event)
                .await
                .map_err(ServiceError::EventError)?;
        }
        Ok(())
    }
}

fn validate_lines(cmd: &CreateTransferOrderCommand) -> Result<(), ServiceError> {
    cmd.validate()?;
    for line in &cmd.items {
        line.validate()?;
    }
    Ok(())
}

/// Resolves the transition table entry for `(order.status, action)` and
/// checks the caller's store against the required role. Returns the target
/// status on success.
fn check_transition(
    order: &transfer_order::Model,
    action: TransferAction,
    ctx: &StoreContext,
) -> Result<TransferStatus, ServiceError> {
    let current = TransferStatus::parse(&order.status)?;

    let Some((role, next)) = transition(current, action) else {
        return Err(ServiceError::InvalidStatus(format!(
            "cannot {} transfer order {} in status {}",
            action, order.id, current
        )));
    };

    let required_store = match role {
        StoreRole::Source => order.store_from_id,
        StoreRole::Destination => order.store_to_id,
    };

    if ctx.store_id != required_store {
        return Err(ServiceError::Unauthorized(format!(
            "store {} may not {} transfer order {} (required store: {})",
            ctx.store_id, action, order.id, required_store
        )));
    }

    Ok(next)
}

pub(crate) async fn load_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<transfer_order::Model, ServiceError> {
    TransferOrder::find_by_id(order_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("transfer order {} not found", order_id)))
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<transfer_order_item::Model>, ServiceError> {
    TransferOrderItem::find()
        .filter(transfer_order_item::Column::TransferOrderId.eq(order_id))
        .order_by_asc(transfer_order_item::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Commits an order mutation through the optimistic version guard: the update
/// only lands if nobody else bumped the version since our read.
async fn commit_order<C: ConnectionTrait>(
    conn: &C,
    order: &transfer_order::Model,
    update: transfer_order::ActiveModel,
) -> Result<(), ServiceError> {
    let result = TransferOrder::update_many()
        .set(update)
        .filter(transfer_order::Column::Id.eq(order.id))
        .filter(transfer_order::Column::Version.eq(order.version))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected != 1 {
        return Err(ServiceError::ConcurrentModification(order.id));
    }

    Ok(())
}

async fn set_line_status<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    status: TransferItemStatus,
) -> Result<(), ServiceError> {
    TransferOrderItem::update_many()
        .set(transfer_order_item::ActiveModel {
            status: Set(status.to_string()),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        })
        .filter(transfer_order_item::Column::TransferOrderId.eq(order_id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(())
}

/// Builds replacement/initial line rows: loads each source item, performs the
/// informational stock-sufficiency check, snapshots the unit price, and caches
/// whether a same-SKU item already exists at the destination.
async fn build_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    store_from_id: Uuid,
    store_to_id: Uuid,
    inputs: &[TransferLineInput],
    status: TransferItemStatus,
    now: DateTime<Utc>,
) -> Result<Vec<transfer_order_item::ActiveModel>, ServiceError> {
    let mut seen = HashSet::new();
    let mut lines = Vec::with_capacity(inputs.len());

    for input in inputs {
        if !seen.insert(input.inventory_item_id) {
            return Err(ServiceError::ValidationError(format!(
                "duplicate line for inventory item {}",
                input.inventory_item_id
            )));
        }

        let source = InventoryItem::find()
            .filter(inventory_item::Column::Id.eq(input.inventory_item_id))
            .filter(inventory_item::Column::StoreId.eq(store_from_id))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "inventory item {} not found at store {}",
                    input.inventory_item_id, store_from_id
                ))
            })?;

        if source.stock_quantity < input.qty_reserved {
            return Err(ServiceError::InsufficientStock(format!(
                "item {} at store {}: available {}, requested {}",
                source.id, store_from_id, source.stock_quantity, input.qty_reserved
            )));
        }

        let has_destination_product = InventoryItem::find()
            .filter(inventory_item::Column::StoreId.eq(store_to_id))
            .filter(inventory_item::Column::Sku.eq(source.sku.clone()))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .is_some();

        let unit_price = source.price_per_unit;
        lines.push(transfer_order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            transfer_order_id: Set(order_id),
            inventory_item_id: Set(source.id),
            qty_reserved: Set(input.qty_reserved),
            qty_received: Set(None),
            unit_price: Set(unit_price),
            subtotal: Set(unit_price * Decimal::from(input.qty_reserved)),
            status: Set(status.to_string()),
            has_destination_product: Set(has_destination_product),
            created_at: Set(now),
            updated_at: Set(None),
        });
    }

    Ok(lines)
}

/// Stock-sufficiency re-check for every line, used at approve time. Purely
/// informational: nothing is decremented here.
async fn ensure_stock_sufficiency<C: ConnectionTrait>(
    conn: &C,
    store_from_id: Uuid,
    items: &[transfer_order_item::Model],
) -> Result<(), ServiceError> {
    for item in items {
        let source = InventoryItem::find()
            .filter(inventory_item::Column::Id.eq(item.inventory_item_id))
            .filter(inventory_item::Column::StoreId.eq(store_from_id))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "inventory item {} not found at store {}",
                    item.inventory_item_id, store_from_id
                ))
            })?;

        if source.stock_quantity < item.qty_reserved {
            return Err(ServiceError::InsufficientStock(format!(
                "item {} at store {}: available {}, requested {}",
                source.id, store_from_id, source.stock_quantity, item.qty_reserved
            )));
        }
    }
    Ok(())
}

/// Pairs every order line with its reported receipt quantity, rejecting
/// missing lines, unknown lines, quantities above the reserved amount, and a
/// clean `received` disposition that actually has shortfalls.
fn match_receipt_lines<'a>(
    order: &transfer_order::Model,
    items: &'a [transfer_order_item::Model],
    cmd: &ReceiveTransferOrderCommand,
) -> Result<Vec<(&'a transfer_order_item::Model, i32)>, ServiceError> {
    let mut reported: HashMap<Uuid, i32> = HashMap::with_capacity(cmd.lines.len());
    for line in &cmd.lines {
        if reported
            .insert(line.transfer_order_item_id, line.qty_received)
            .is_some()
        {
            return Err(ServiceError::ValidationError(format!(
                "duplicate receipt line for item {}",
                line.transfer_order_item_id
            )));
        }
    }

    let mut receipts = Vec::with_capacity(items.len());
    for item in items {
        let qty_received = reported.remove(&item.id).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "missing receipt quantity for line {} of order {}",
                item.id, order.id
            ))
        })?;

        if qty_received > item.qty_reserved {
            return Err(ServiceError::ValidationError(format!(
                "line {}: received {} exceeds reserved {}",
                item.id, qty_received, item.qty_reserved
            )));
        }

        if cmd.disposition == ReceiveDisposition::Received && qty_received < item.qty_reserved {
            return Err(ServiceError::ValidationError(format!(
                "line {} is short ({} of {}); report received_with_issue instead",
                item.id, qty_received, item.qty_reserved
            )));
        }

        receipts.push((item, qty_received));
    }

    if let Some(unknown) = reported.keys().next() {
        return Err(ServiceError::ValidationError(format!(
            "receipt line {} does not belong to order {}",
            unknown, order.id
        )));
    }

    Ok(receipts)
}

/// Looks up the destination mirror item (same SKU at the receiving store).
/// Receipt hard-fails when it is missing; provisioning must have run first.
async fn find_destination_mirror<C: ConnectionTrait>(
    conn: &C,
    order: &transfer_order::Model,
    item: &transfer_order_item::Model,
) -> Result<inventory_item::Model, ServiceError> {
    let source = InventoryItem::find()
        .filter(inventory_item::Column::Id.eq(item.inventory_item_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "source inventory item {} not found",
                item.inventory_item_id
            ))
        })?;

    InventoryItem::find()
        .filter(inventory_item::Column::StoreId.eq(order.store_to_id))
        .filter(inventory_item::Column::Sku.eq(source.sku.clone()))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "no destination item with SKU {} at store {} for order {}",
                source.sku, order.store_to_id, order.id
            ))
        })
}

async fn next_transaction_code<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let prefix = format!("TS-{}", now.format("%Y%m%d"));
    let today = TransferOrder::find()
        .filter(transfer_order::Column::TransactionCode.starts_with(&prefix))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    // The code column is uniquely indexed; a racing create surfaces as a
    // database error instead of a duplicate code.
    Ok(format_transaction_code(&prefix, today + 1))
}

fn format_transaction_code(prefix: &str, seq: u64) -> String {
    format!("{}-{:04}", prefix, seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn order_in(status: TransferStatus) -> transfer_order::Model {
        let now = Utc::now();
        transfer_order::Model {
            id: Uuid::new_v4(),
            transaction_code: "TS-20240301-0001".to_string(),
            store_from_id: Uuid::new_v4(),
            store_to_id: Uuid::new_v4(),
            store_created_by: Uuid::new_v4(),
            status: status.to_string(),
            drafted_by: Uuid::new_v4(),
            drafted_at: now,
            approved_by: None,
            approved_at: None,
            shipped_by: None,
            shipped_at: None,
            logistic_provider: None,
            tracking_number: None,
            delivery_note: None,
            received_by: None,
            received_at: None,
            canceled_by: None,
            canceled_at: None,
            cancel_note: None,
            version: 0,
            created_at: now,
            updated_at: None,
        }
    }

    fn line_of(order: &transfer_order::Model, qty_reserved: i32) -> transfer_order_item::Model {
        transfer_order_item::Model {
            id: Uuid::new_v4(),
            transfer_order_id: order.id,
            inventory_item_id: Uuid::new_v4(),
            qty_reserved,
            qty_received: None,
            unit_price: dec!(2.00),
            subtotal: dec!(2.00) * Decimal::from(qty_reserved),
            status: "shipped".to_string(),
            has_destination_product: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn ctx_for(store_id: Uuid) -> StoreContext {
        StoreContext::new(Uuid::new_v4(), store_id)
    }

    #[test]
    fn transaction_code_format_is_date_scoped() {
        let day = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let prefix = format!("TS-{}", day.format("%Y%m%d"));
        assert_eq!(format_transaction_code(&prefix, 1), "TS-20240301-0001");
        assert_eq!(format_transaction_code(&prefix, 42), "TS-20240301-0042");
        assert_eq!(format_transaction_code(&prefix, 12345), "TS-20240301-12345");
    }

    #[test]
    fn ship_requires_source_store() {
        let order = order_in(TransferStatus::Approved);
        let err = check_transition(&order, TransferAction::Ship, &ctx_for(order.store_to_id))
            .unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized(_));

        let next = check_transition(&order, TransferAction::Ship, &ctx_for(order.store_from_id))
            .unwrap();
        assert_eq!(next, TransferStatus::Shipped);
    }

    #[test]
    fn receive_requires_destination_store() {
        let order = order_in(TransferStatus::Shipped);
        let err = check_transition(&order, TransferAction::Receive, &ctx_for(order.store_from_id))
            .unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized(_));
    }

    #[test]
    fn ship_from_drafted_is_an_invalid_transition() {
        let order = order_in(TransferStatus::Drafted);
        let err = check_transition(&order, TransferAction::Ship, &ctx_for(order.store_from_id))
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidStatus(_));
    }

    #[test]
    fn garbage_status_is_rejected() {
        let mut order = order_in(TransferStatus::Drafted);
        order.status = "teleported".to_string();
        let err = check_transition(&order, TransferAction::Approve, &ctx_for(order.store_from_id))
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidStatus(_));
    }

    #[test]
    fn receipt_lines_must_cover_every_order_line() {
        let order = order_in(TransferStatus::Shipped);
        let items = vec![line_of(&order, 10), line_of(&order, 4)];

        let cmd = ReceiveTransferOrderCommand {
            disposition: ReceiveDisposition::Received,
            lines: vec![ReceiptLineInput {
                transfer_order_item_id: items[0].id,
                qty_received: 10,
            }],
        };
        assert_matches!(
            match_receipt_lines(&order, &items, &cmd),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn clean_receive_rejects_shortfall() {
        let order = order_in(TransferStatus::Shipped);
        let items = vec![line_of(&order, 10)];

        let cmd = ReceiveTransferOrderCommand {
            disposition: ReceiveDisposition::Received,
            lines: vec![ReceiptLineInput {
                transfer_order_item_id: items[0].id,
                qty_received: 8,
            }],
        };
        assert_matches!(
            match_receipt_lines(&order, &items, &cmd),
            Err(ServiceError::ValidationError(_))
        );

        let cmd = ReceiveTransferOrderCommand {
            disposition: ReceiveDisposition::ReceivedWithIssue,
            ..cmd
        };
        let receipts = match_receipt_lines(&order, &items, &cmd).unwrap();
        assert_eq!(receipts[0].1, 8);
    }

    #[test]
    fn over_receipt_is_rejected() {
        let order = order_in(TransferStatus::Shipped);
        let items = vec![line_of(&order, 10)];

        let cmd = ReceiveTransferOrderCommand {
            disposition: ReceiveDisposition::ReceivedWithIssue,
            lines: vec![ReceiptLineInput {
                transfer_order_item_id: items[0].id,
                qty_received: 12,
            }],
        };
        assert_matches!(
            match_receipt_lines(&order, &items, &cmd),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn unknown_receipt_line_is_rejected() {
        let order = order_in(TransferStatus::Shipped);
        let items = vec![line_of(&order, 10)];

        let cmd = ReceiveTransferOrderCommand {
            disposition: ReceiveDisposition::Received,
            lines: vec![
                ReceiptLineInput {
                    transfer_order_item_id: items[0].id,
                    qty_received: 10,
                },
                ReceiptLineInput {
                    transfer_order_item_id: Uuid::new_v4(),
                    qty_received: 1,
                },
            ],
        };
        assert_matches!(
            match_receipt_lines(&order, &items, &cmd),
            Err(ServiceError::ValidationError(_))
        );
    }
}
