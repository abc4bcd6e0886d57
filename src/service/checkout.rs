//! The order-placement transaction.
//!
//! Everything here happens inside one store transaction: stock validation
//! and decrement, pricing, coupon usage, the order insert and the cart
//! clear. Any failure drops the transaction and leaves stock, coupon
//! counters and the cart untouched, so a half-validated cart can never
//! oversell stock or burn a coupon use.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::domain::order::{
    generate_order_number, Order, OrderItem, OrderStatus, ShippingAddress, StatusEntry,
};
use crate::domain::pricing::{Pricing, ShippingMethod};
use crate::error::{Error, Result};
use crate::service::coupons::normalize_code;
use crate::store::{CommerceStore, CouponUsage, OrderInsert, StockUpdate};

/// Random order numbers collide rarely; give up after a few fresh draws
/// rather than looping forever on a broken store.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone, Debug)]
pub struct PlaceOrder {
    pub user_id: Uuid,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub shipping_method: ShippingMethod,
    pub coupon_code: Option<String>,
}

pub async fn place_order<S: CommerceStore>(
    store: &S,
    pricing: &Pricing,
    input: PlaceOrder,
) -> Result<Order> {
    input.shipping_address.validate()?;
    if input.payment_method.trim().is_empty() {
        return Err(Error::Validation("payment method is required".into()));
    }

    let mut tx = store.begin().await?;

    let lines = tx.cart_lines(input.user_id).await?;
    if lines.is_empty() {
        return Err(Error::EmptyCart);
    }

    // Re-read every product inside the transaction: cart snapshots of price
    // and stock are never trusted.
    let mut items = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;
    for line in &lines {
        let product = tx.product(line.product_id).await?.ok_or_else(|| {
            Error::ProductUnavailable {
                name: line.product_id.to_string(),
            }
        })?;
        if !product.is_active {
            return Err(Error::ProductUnavailable { name: product.name });
        }
        if !product.has_stock(line.quantity) {
            return Err(Error::InsufficientStock {
                name: product.name,
                available: product.stock,
            });
        }
        subtotal += product.price * Decimal::from(line.quantity);
        items.push(OrderItem {
            product_id: product.id,
            name: product.name,
            quantity: line.quantity,
            unit_price: product.price,
            image_url: product.image_url,
        });
    }

    // Conditional decrements; the guard re-fires if another transaction got
    // in between our read and this write.
    for item in &items {
        match tx.decrement_stock(item.product_id, item.quantity).await? {
            StockUpdate::Applied => {}
            StockUpdate::Insufficient { available } => {
                return Err(Error::InsufficientStock {
                    name: item.name.clone(),
                    available,
                });
            }
        }
    }

    let mut coupon_code = None;
    let mut discount = Decimal::ZERO;
    if let Some(raw_code) = &input.coupon_code {
        let code = normalize_code(raw_code);
        let coupon = tx
            .coupon(&code)
            .await?
            .ok_or_else(|| Error::CouponNotFound { code: code.clone() })?;
        discount = coupon.check(subtotal, Utc::now())?;
        match tx.increment_coupon_usage(&code).await? {
            CouponUsage::Applied => {}
            CouponUsage::LimitReached => {
                return Err(Error::CouponUsageLimit { code });
            }
        }
        coupon_code = Some(code);
    }

    let totals = pricing.quote(subtotal, input.shipping_method, discount);

    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let now = Utc::now();
        let order = Order {
            id: Uuid::now_v7(),
            order_number: generate_order_number(now),
            user_id: input.user_id,
            status: OrderStatus::Placed,
            items: items.clone(),
            shipping_address: input.shipping_address.clone(),
            payment_method: input.payment_method.clone(),
            totals: totals.clone(),
            coupon_code: coupon_code.clone(),
            cancel_reason: None,
            status_history: vec![StatusEntry {
                status: OrderStatus::Placed,
                note: "Order placed".into(),
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        };

        match tx.insert_order(&order).await? {
            OrderInsert::Inserted => {
                tx.clear_cart(input.user_id).await?;
                tx.commit().await?;
                tracing::info!(
                    order_number = %order.order_number,
                    user_id = %order.user_id,
                    total = %order.totals.total,
                    "order placed"
                );
                return Ok(order);
            }
            OrderInsert::DuplicateNumber => continue,
        }
    }

    Err(Error::Internal(
        "could not allocate a unique order number".into(),
    ))
}
