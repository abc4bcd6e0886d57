//! Order lifecycle: lookups, admin status transitions, cancellation.
//!
//! Cancellation restores stock in the same transaction as the status write;
//! an order can never be cancelled without its stock coming back, and the
//! already-cancelled guard means it can never come back twice.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus, StatusEntry};
use crate::error::{Error, Result};
use crate::service::Requester;
use crate::store::{CommerceStore, StoreTx};

pub async fn get_order<S: CommerceStore>(
    store: &S,
    order_id: Uuid,
    requester: Requester,
) -> Result<Order> {
    let mut tx = store.begin().await?;
    let order = tx.order(order_id).await?.ok_or(Error::OrderNotFound)?;
    authorize(&order, requester)?;
    Ok(order)
}

/// A customer's own orders, or every order for an admin. Newest first.
pub async fn list_orders<S: CommerceStore>(
    store: &S,
    requester: Requester,
) -> Result<Vec<Order>> {
    let scope = if requester.is_admin() {
        None
    } else {
        Some(requester.user_id)
    };
    let mut tx = store.begin().await?;
    tx.orders_for(scope).await
}

/// Admin-only transition along the status table. Moving to `Cancelled`
/// goes through the same compensation path as [`cancel_order`].
pub async fn update_status<S: CommerceStore>(
    store: &S,
    order_id: Uuid,
    new_status: OrderStatus,
    note: Option<String>,
    requester: Requester,
) -> Result<Order> {
    if !requester.is_admin() {
        return Err(Error::Forbidden);
    }

    let mut tx = store.begin().await?;
    let order = tx.order(order_id).await?.ok_or(Error::OrderNotFound)?;

    if new_status == OrderStatus::Cancelled {
        if order.status == OrderStatus::Cancelled {
            return Err(Error::OrderNotCancellable {
                status: order.status,
            });
        }
        let reason = note.unwrap_or_else(|| "Cancelled by administrator".into());
        return cancel_in_tx(tx, order, reason).await;
    }

    if !order.status.can_transition_to(new_status) {
        return Err(Error::InvalidTransition {
            from: order.status,
            to: new_status,
        });
    }

    let entry = StatusEntry {
        status: new_status,
        note: note.unwrap_or_else(|| format!("Status changed to {new_status}")),
        created_at: Utc::now(),
    };
    tx.write_status(order_id, new_status, &entry, None).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order_id, status = %new_status, "order status updated");
    Ok(applied(order, new_status, entry, None))
}

/// Cancels an order, restoring stock for every item. Customers may only
/// cancel their own orders and only before shipment; admins may cancel any
/// order that is not already cancelled.
pub async fn cancel_order<S: CommerceStore>(
    store: &S,
    order_id: Uuid,
    reason: Option<String>,
    requester: Requester,
) -> Result<Order> {
    let mut tx = store.begin().await?;
    let order = tx.order(order_id).await?.ok_or(Error::OrderNotFound)?;
    authorize(&order, requester)?;

    if order.status == OrderStatus::Cancelled {
        return Err(Error::OrderNotCancellable {
            status: order.status,
        });
    }
    if !requester.is_admin()
        && matches!(order.status, OrderStatus::Shipped | OrderStatus::Delivered)
    {
        return Err(Error::OrderNotCancellable {
            status: order.status,
        });
    }

    let reason = reason.unwrap_or_else(|| {
        if requester.is_admin() {
            "Cancelled by administrator".into()
        } else {
            "Cancelled by customer".into()
        }
    });
    cancel_in_tx(tx, order, reason).await
}

/// Compensating half of checkout: put each item's quantity back on the
/// shelf, then write the terminal status, all in the caller's transaction.
async fn cancel_in_tx(
    mut tx: Box<dyn StoreTx>,
    order: Order,
    reason: String,
) -> Result<Order> {
    for item in &order.items {
        tx.increment_stock(item.product_id, item.quantity).await?;
    }

    let entry = StatusEntry {
        status: OrderStatus::Cancelled,
        note: reason.clone(),
        created_at: Utc::now(),
    };
    tx.write_status(order.id, OrderStatus::Cancelled, &entry, Some(&reason))
        .await?;
    tx.commit().await?;

    tracing::info!(order_id = %order.id, reason = %reason, "order cancelled");
    Ok(applied(order, OrderStatus::Cancelled, entry, Some(reason)))
}

fn authorize(order: &Order, requester: Requester) -> Result<()> {
    if requester.is_admin() || order.is_owned_by(requester.user_id) {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

fn applied(
    mut order: Order,
    status: OrderStatus,
    entry: StatusEntry,
    cancel_reason: Option<String>,
) -> Order {
    order.status = status;
    if cancel_reason.is_some() {
        order.cancel_reason = cancel_reason;
    }
    order.updated_at = entry.created_at;
    order.status_history.push(entry);
    order
}
