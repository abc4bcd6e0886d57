//! Catalog types: products and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable product. `stock` is authoritative: checkout re-reads it and
/// never trusts quantities or prices snapshotted into a cart.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn has_stock(&self, quantity: i32) -> bool {
        self.stock >= quantity
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            description: None,
            price: dec!(19.99),
            stock,
            is_active: true,
            image_url: None,
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stock_check_is_inclusive() {
        assert!(product(3).has_stock(3));
        assert!(!product(3).has_stock(4));
        assert!(!product(0).has_stock(1));
    }
}
