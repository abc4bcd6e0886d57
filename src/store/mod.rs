//! Persistence behind a transactional store trait.
//!
//! Every core operation opens one [`StoreTx`], does all of its reads and
//! writes through it, and either commits or drops it (dropping rolls back).
//! That transaction is the atomic unit the checkout engine and the order
//! lifecycle rely on: stock decrements, coupon usage and the order row all
//! land together or not at all.
//!
//! Two implementations: [`postgres::PgStore`] for production and
//! [`memory::MemoryStore`] for tests and demos.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};
use crate::domain::coupon::Coupon;
use crate::domain::order::{Order, OrderStatus, StatusEntry};
use crate::domain::product::Product;
use crate::error::Result;

/// Outcome of a conditional stock decrement (`stock >= quantity` guard).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockUpdate {
    Applied,
    Insufficient { available: i32 },
}

/// Outcome of a conditional coupon-usage increment
/// (`used_count < usage_limit` guard).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouponUsage {
    Applied,
    LimitReached,
}

/// Outcome of an order insert guarded by the order-number uniqueness
/// constraint. `DuplicateNumber` tells the caller to regenerate and retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderInsert {
    Inserted,
    DuplicateNumber,
}

#[async_trait]
pub trait CommerceStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// One transaction over the whole commerce schema. Mutations are invisible
/// to other transactions until [`StoreTx::commit`]; dropping the value
/// rolls everything back.
#[async_trait]
pub trait StoreTx: Send {
    // Catalog.
    async fn product(&mut self, id: Uuid) -> Result<Option<Product>>;
    /// Atomic check-and-decrement; never drives stock below zero.
    async fn decrement_stock(&mut self, id: Uuid, quantity: i32) -> Result<StockUpdate>;
    async fn increment_stock(&mut self, id: Uuid, quantity: i32) -> Result<()>;

    // Coupons.
    async fn coupon(&mut self, code: &str) -> Result<Option<Coupon>>;
    /// Atomic check-and-increment against the usage cap.
    async fn increment_coupon_usage(&mut self, code: &str) -> Result<CouponUsage>;

    // Cart.
    async fn ensure_cart(&mut self, user_id: Uuid) -> Result<Cart>;
    async fn cart_lines(&mut self, user_id: Uuid) -> Result<Vec<CartLine>>;
    /// Inserts or replaces the line for (user, product) with an absolute
    /// quantity and a fresh price snapshot.
    async fn set_cart_line(
        &mut self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<()>;
    /// Returns false when no such line existed.
    async fn remove_cart_line(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool>;
    async fn clear_cart(&mut self, user_id: Uuid) -> Result<()>;

    // Orders.
    async fn insert_order(&mut self, order: &Order) -> Result<OrderInsert>;
    async fn order(&mut self, id: Uuid) -> Result<Option<Order>>;
    /// All orders, or one user's orders, newest first.
    async fn orders_for(&mut self, user_id: Option<Uuid>) -> Result<Vec<Order>>;
    /// Writes the new status, appends the history entry, and sets the
    /// cancel reason when given. Never touches items or totals.
    async fn write_status(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        entry: &StatusEntry,
        cancel_reason: Option<&str>,
    ) -> Result<()>;

    // Wishlist.
    async fn wishlist(&mut self, user_id: Uuid) -> Result<Vec<Uuid>>;
    /// Returns false when the product was already on the list.
    async fn add_wishlist(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool>;
    async fn remove_wishlist(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool>;
    async fn set_wishlist(&mut self, user_id: Uuid, product_ids: &[Uuid]) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
