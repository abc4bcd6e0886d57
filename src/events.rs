//! Best-effort domain-event publication over NATS.
//!
//! Events go out after the database transaction commits. Publication
//! failure never fails the request; it is logged and dropped.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};

#[derive(Clone)]
pub struct EventBus {
    client: Option<async_nats::Client>,
}

#[derive(Serialize)]
pub struct OrderPlaced<'a> {
    pub order_id: Uuid,
    pub order_number: &'a str,
    pub user_id: Uuid,
    pub total: Decimal,
}

#[derive(Serialize)]
pub struct OrderStatusChanged<'a> {
    pub order_id: Uuid,
    pub order_number: &'a str,
    pub status: OrderStatus,
}

impl EventBus {
    pub fn new(client: Option<async_nats::Client>) -> Self {
        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub async fn order_placed(&self, order: &Order) {
        self.publish(
            "mercato.order.placed",
            &OrderPlaced {
                order_id: order.id,
                order_number: &order.order_number,
                user_id: order.user_id,
                total: order.totals.total,
            },
        )
        .await;
    }

    pub async fn order_status_changed(&self, order: &Order) {
        let subject = if order.status == OrderStatus::Cancelled {
            "mercato.order.cancelled"
        } else {
            "mercato.order.status_changed"
        };
        self.publish(
            subject,
            &OrderStatusChanged {
                order_id: order.id,
                order_number: &order.order_number,
                status: order.status,
            },
        )
        .await;
    }

    async fn publish<T: Serialize>(&self, subject: &'static str, event: &T) {
        let Some(client) = &self.client else {
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(subject, error = %err, "failed to serialize event");
                return;
            }
        };
        if let Err(err) = client.publish(subject, payload.into()).await {
            tracing::warn!(subject, error = %err, "failed to publish event");
        }
    }
}
