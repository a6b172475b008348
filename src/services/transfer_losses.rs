use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        transfer_loss::{self, Entity as TransferLoss},
        transfer_order_item,
    },
    errors::ServiceError,
};

/// A shortfall computed but not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LossDraft {
    pub transfer_order_item_id: Uuid,
    pub inventory_item_id: Uuid,
    pub qty_lost: i32,
    pub unit_price: Decimal,
    pub loss_amount: Decimal,
}

/// Computes the shortfall per line: `lost = reserved - received`, kept only
/// when positive, valued at the line's snapshotted unit price. Pure so the
/// receive handler can be tested without a database.
pub fn compute_losses<'a, I>(lines: I) -> Vec<LossDraft>
where
    I: IntoIterator<Item = (&'a transfer_order_item::Model, i32)>,
{
    lines
        .into_iter()
        .filter_map(|(item, qty_received)| {
            let qty_lost = item.qty_reserved - qty_received;
            if qty_lost <= 0 {
                return None;
            }
            Some(LossDraft {
                transfer_order_item_id: item.id,
                inventory_item_id: item.inventory_item_id,
                qty_lost,
                unit_price: item.unit_price,
                loss_amount: item.unit_price * Decimal::from(qty_lost),
            })
        })
        .collect()
}

/// Persists loss drafts inside the caller's transaction. Rows are append-only
/// and never mutated afterward.
pub async fn persist_losses<C: ConnectionTrait>(
    conn: &C,
    transfer_order_id: Uuid,
    drafts: &[LossDraft],
) -> Result<(), ServiceError> {
    if drafts.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let rows: Vec<transfer_loss::ActiveModel> = drafts
        .iter()
        .map(|draft| transfer_loss::ActiveModel {
            id: Set(Uuid::new_v4()),
            transfer_order_id: Set(transfer_order_id),
            transfer_order_item_id: Set(draft.transfer_order_item_id),
            inventory_item_id: Set(draft.inventory_item_id),
            qty_lost: Set(draft.qty_lost),
            unit_price: Set(draft.unit_price),
            loss_amount: Set(draft.loss_amount),
            created_at: Set(now),
        })
        .collect();

    TransferLoss::insert_many(rows)
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(())
}

/// Read side of the loss ledger.
#[derive(Clone)]
pub struct TransferLossService {
    db: Arc<DbPool>,
}

impl TransferLossService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_losses(
        &self,
        transfer_order_id: Uuid,
    ) -> Result<Vec<transfer_loss::Model>, ServiceError> {
        TransferLoss::find()
            .filter(transfer_loss::Column::TransferOrderId.eq(transfer_order_id))
            .order_by_asc(transfer_loss::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn line(qty_reserved: i32, unit_price: Decimal) -> transfer_order_item::Model {
        transfer_order_item::Model {
            id: Uuid::new_v4(),
            transfer_order_id: Uuid::new_v4(),
            inventory_item_id: Uuid::new_v4(),
            qty_reserved,
            qty_received: None,
            unit_price,
            subtotal: unit_price * Decimal::from(qty_reserved),
            status: "shipped".to_string(),
            has_destination_product: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn full_receipt_produces_no_loss() {
        let item = line(10, dec!(2.50));
        assert!(compute_losses([(&item, 10)]).is_empty());
    }

    #[test]
    fn shortfall_is_valued_at_snapshotted_price() {
        let item = line(10, dec!(2.50));
        let losses = compute_losses([(&item, 8)]);
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].qty_lost, 2);
        assert_eq!(losses[0].unit_price, dec!(2.50));
        assert_eq!(losses[0].loss_amount, dec!(5.00));
    }

    #[test]
    fn over_receipt_never_yields_negative_loss() {
        let item = line(5, dec!(1.00));
        assert!(compute_losses([(&item, 7)]).is_empty());
    }

    #[test]
    fn mixed_lines_only_short_ones_survive() {
        let full = line(3, dec!(4.00));
        let short = line(6, dec!(0.75));
        let losses = compute_losses([(&full, 3), (&short, 1)]);
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].transfer_order_item_id, short.id);
        assert_eq!(losses[0].qty_lost, 5);
        assert_eq!(losses[0].loss_amount, dec!(3.75));
    }
}
