//! Cart aggregate: one cart per user, created lazily, cleared (not deleted)
//! on successful checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line. `unit_price` is a snapshot taken when the line was added or
/// last updated; it is display-only and never used for order pricing.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Display subtotal over snapshot prices.
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum()
    }

    pub fn quantity_of(&self, product_id: Uuid) -> i32 {
        self.items
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn subtotal_sums_snapshot_prices() {
        let product = Uuid::new_v4();
        let cart = Cart {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            items: vec![
                CartLine {
                    product_id: product,
                    quantity: 2,
                    unit_price: dec!(20.00),
                },
                CartLine {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    unit_price: dec!(15.00),
                },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(cart.subtotal(), dec!(55.00));
        assert_eq!(cart.quantity_of(product), 2);
        assert_eq!(cart.quantity_of(Uuid::new_v4()), 0);
    }
}
