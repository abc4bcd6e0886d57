//! Order aggregate: immutable item/pricing snapshot plus a forward-only
//! status machine with an append-only history.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::domain::pricing::Totals;

/// Order lifecycle states. Forward-only on the happy path; `Cancelled` is
/// reachable from anywhere (admins even from `Delivered`, for post-delivery
/// reversals). `Delivered` and `Cancelled` are otherwise terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Parses a status, folding in the legacy spellings used by earlier
    /// generations of the product (`pending` for a freshly placed order,
    /// `completed` for a delivered one). Case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "placed" | "pending" => Some(Self::Placed),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" | "completed" => Some(Self::Delivered),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Admin transition table. Customers get the stricter cancellation
    /// guard in the lifecycle service on top of this.
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Placed => matches!(next, Self::Processing | Self::Cancelled),
            Self::Processing => matches!(next, Self::Shipped | Self::Cancelled),
            Self::Shipped => matches!(next, Self::Delivered | Self::Cancelled),
            Self::Delivered => matches!(next, Self::Cancelled),
            Self::Cancelled => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping destination. Every field is required.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "zip code is required"))]
    pub zip_code: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
}

/// Product snapshot captured at placement time; later catalog edits never
/// change what the customer bought.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub totals: Totals,
    pub coupon_code: Option<String>,
    pub cancel_reason: Option<String>,
    /// Oldest-first, append-only. Seeded with one entry at creation.
    pub status_history: Vec<StatusEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Human-readable order number: `ORD-YYYYMMDD-XXXXX` with a zero-padded
/// random suffix. Collisions are possible; callers retry against the
/// uniqueness constraint with a fresh suffix.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..100_000);
    format!("ORD-{}-{suffix:05}", now.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_format() {
        let number = generate_order_number(Utc::now());
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 5);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn happy_path_transitions() {
        use OrderStatus::*;
        assert!(Placed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Placed.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Placed.can_transition_to(Placed));
    }

    #[test]
    fn cancelled_is_a_dead_end() {
        use OrderStatus::*;
        for next in [Placed, Processing, Shipped, Delivered, Cancelled] {
            assert!(!Cancelled.can_transition_to(next));
        }
        assert!(Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn legacy_status_spellings_parse() {
        assert_eq!(OrderStatus::parse("pending"), Some(OrderStatus::Placed));
        assert_eq!(OrderStatus::parse("PENDING"), Some(OrderStatus::Placed));
        assert_eq!(
            OrderStatus::parse("completed"),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            OrderStatus::parse("CANCELLED"),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(OrderStatus::parse("refunded"), None);
    }

    #[test]
    fn address_requires_every_field() {
        let address = ShippingAddress {
            name: "Ada".into(),
            street: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "".into(),
            country: "US".into(),
            phone: "555-0100".into(),
        };
        assert!(address.validate().is_err());
    }
}
