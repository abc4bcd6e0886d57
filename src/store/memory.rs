//! In-memory store for tests and demos.
//!
//! A transaction takes the single state lock for its whole lifetime and
//! works on a copy, writing the copy back on commit. Transactions therefore
//! serialize, which gives the same all-or-nothing and check-and-update
//! guarantees the SQL store gets from conditional updates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};
use crate::domain::coupon::Coupon;
use crate::domain::order::{Order, OrderStatus, StatusEntry};
use crate::domain::product::Product;
use crate::error::Result;
use crate::store::{CommerceStore, CouponUsage, OrderInsert, StockUpdate, StoreTx};

#[derive(Clone, Debug, Default)]
struct State {
    products: HashMap<Uuid, Product>,
    coupons: HashMap<String, Coupon>,
    carts: HashMap<Uuid, CartState>,
    orders: HashMap<Uuid, Order>,
    order_numbers: HashSet<String>,
    wishlists: HashMap<Uuid, Vec<Uuid>>,
}

#[derive(Clone, Debug)]
struct CartState {
    id: Uuid,
    lines: Vec<CartLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartState {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn seed_coupon(&self, coupon: Coupon) {
        self.state
            .lock()
            .await
            .coupons
            .insert(coupon.code.clone(), coupon);
    }

    /// Current product row, for asserting on stock after an operation.
    pub async fn product_snapshot(&self, id: Uuid) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    pub async fn coupon_snapshot(&self, code: &str) -> Option<Coupon> {
        self.state.lock().await.coupons.get(code).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn product(&mut self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn decrement_stock(&mut self, id: Uuid, quantity: i32) -> Result<StockUpdate> {
        match self.working.products.get_mut(&id) {
            Some(product) if product.stock >= quantity => {
                product.stock -= quantity;
                product.updated_at = Utc::now();
                Ok(StockUpdate::Applied)
            }
            Some(product) => Ok(StockUpdate::Insufficient {
                available: product.stock,
            }),
            None => Ok(StockUpdate::Insufficient { available: 0 }),
        }
    }

    async fn increment_stock(&mut self, id: Uuid, quantity: i32) -> Result<()> {
        if let Some(product) = self.working.products.get_mut(&id) {
            product.stock += quantity;
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn coupon(&mut self, code: &str) -> Result<Option<Coupon>> {
        Ok(self.working.coupons.get(code).cloned())
    }

    async fn increment_coupon_usage(&mut self, code: &str) -> Result<CouponUsage> {
        match self.working.coupons.get_mut(code) {
            Some(coupon) => {
                if coupon
                    .usage_limit
                    .is_some_and(|limit| coupon.used_count >= limit)
                {
                    Ok(CouponUsage::LimitReached)
                } else {
                    coupon.used_count += 1;
                    Ok(CouponUsage::Applied)
                }
            }
            None => Ok(CouponUsage::LimitReached),
        }
    }

    async fn ensure_cart(&mut self, user_id: Uuid) -> Result<Cart> {
        let cart = self
            .working
            .carts
            .entry(user_id)
            .or_insert_with(CartState::new);
        Ok(Cart {
            id: cart.id,
            user_id,
            items: cart.lines.clone(),
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        })
    }

    async fn cart_lines(&mut self, user_id: Uuid) -> Result<Vec<CartLine>> {
        Ok(self
            .working
            .carts
            .get(&user_id)
            .map(|cart| cart.lines.clone())
            .unwrap_or_default())
    }

    async fn set_cart_line(
        &mut self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<()> {
        let cart = self
            .working
            .carts
            .entry(user_id)
            .or_insert_with(CartState::new);
        match cart.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                line.unit_price = unit_price;
            }
            None => cart.lines.push(CartLine {
                product_id,
                quantity,
                unit_price,
            }),
        }
        cart.updated_at = Utc::now();
        Ok(())
    }

    async fn remove_cart_line(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        match self.working.carts.get_mut(&user_id) {
            Some(cart) => {
                let before = cart.lines.len();
                cart.lines.retain(|l| l.product_id != product_id);
                cart.updated_at = Utc::now();
                Ok(cart.lines.len() < before)
            }
            None => Ok(false),
        }
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> Result<()> {
        if let Some(cart) = self.working.carts.get_mut(&user_id) {
            cart.lines.clear();
            cart.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<OrderInsert> {
        if !self.working.order_numbers.insert(order.order_number.clone()) {
            return Ok(OrderInsert::DuplicateNumber);
        }
        self.working.orders.insert(order.id, order.clone());
        Ok(OrderInsert::Inserted)
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn orders_for(&mut self, user_id: Option<Uuid>) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .working
            .orders
            .values()
            .filter(|order| user_id.map_or(true, |u| order.user_id == u))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn write_status(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        entry: &StatusEntry,
        cancel_reason: Option<&str>,
    ) -> Result<()> {
        if let Some(order) = self.working.orders.get_mut(&order_id) {
            order.status = status;
            if let Some(reason) = cancel_reason {
                order.cancel_reason = Some(reason.to_string());
            }
            order.status_history.push(entry.clone());
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn wishlist(&mut self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .working
            .wishlists
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_wishlist(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let list = self.working.wishlists.entry(user_id).or_default();
        if list.contains(&product_id) {
            Ok(false)
        } else {
            list.push(product_id);
            Ok(true)
        }
    }

    async fn remove_wishlist(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        match self.working.wishlists.get_mut(&user_id) {
            Some(list) => {
                let before = list.len();
                list.retain(|id| *id != product_id);
                Ok(list.len() < before)
            }
            None => Ok(false),
        }
    }

    async fn set_wishlist(&mut self, user_id: Uuid, product_ids: &[Uuid]) -> Result<()> {
        let mut deduped = Vec::new();
        for id in product_ids {
            if !deduped.contains(id) {
                deduped.push(*id);
            }
        }
        self.working.wishlists.insert(user_id, deduped);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        *self.guard = self.working;
        Ok(())
    }
}
