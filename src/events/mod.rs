use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after a transfer transition commits.
///
/// Events are strictly post-commit: a rolled-back transaction emits nothing,
/// so consumers never observe a transition that did not happen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TransferDrafted(Uuid),
    TransferUpdated(Uuid),
    TransferApproved(Uuid),
    TransferCanceled(Uuid),
    TransferShipped(Uuid),
    TransferReceived {
        transfer_order_id: Uuid,
        with_issue: bool,
        total_received: i32,
    },
    TransferLossRecorded {
        transfer_order_id: Uuid,
        transfer_order_item_id: Uuid,
        qty_lost: i32,
    },
    DestinationProvisioned {
        transfer_order_id: Uuid,
        items_created: usize,
        products_created: usize,
    },
    StockDecremented {
        store_id: Uuid,
        inventory_item_id: Uuid,
        quantity: i32,
        new_quantity: i32,
    },
    StockIncremented {
        store_id: Uuid,
        inventory_item_id: Uuid,
        quantity: i32,
        new_quantity: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Spawn this alongside the
/// services; real deployments replace it with an outbox or queue publisher.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::TransferReceived {
                transfer_order_id,
                with_issue: true,
                ..
            } => {
                warn!(order_id = %transfer_order_id, "transfer received with issue");
            }
            Event::TransferLossRecorded {
                transfer_order_id,
                qty_lost,
                ..
            } => {
                warn!(order_id = %transfer_order_id, qty_lost, "transfer loss recorded");
            }
            _ => {
                info!(?event, "event processed");
            }
        }
    }

    info!("event processing loop stopped");
}
