//! PostgreSQL store. Conditional updates carry the concurrency guards:
//! stock decrements are gated on `stock >= quantity` and coupon usage on
//! `used_count < usage_limit`, so racing checkouts can never both win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};
use crate::domain::coupon::{Coupon, DiscountType};
use crate::domain::order::{Order, OrderItem, OrderStatus, ShippingAddress, StatusEntry};
use crate::domain::pricing::Totals;
use crate::domain::product::Product;
use crate::error::{Error, Result};
use crate::store::{CommerceStore, CouponUsage, OrderInsert, StockUpdate, StoreTx};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommerceStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }
}

pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    discount_type: String,
    discount_value: Decimal,
    min_order_value: Option<Decimal>,
    max_discount: Option<Decimal>,
    usage_limit: Option<i32>,
    used_count: i32,
    is_active: bool,
    starts_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl CouponRow {
    fn into_coupon(self) -> Result<Coupon> {
        let discount_type = DiscountType::parse(&self.discount_type).ok_or_else(|| {
            Error::Internal(format!(
                "corrupt discount type for coupon {}: {}",
                self.code, self.discount_type
            ))
        })?;
        Ok(Coupon {
            id: self.id,
            code: self.code,
            discount_type,
            discount_value: self.discount_value,
            min_order_value: self.min_order_value,
            max_discount: self.max_discount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            is_active: self.is_active,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    status: String,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    discount: Decimal,
    total: Decimal,
    ship_name: String,
    ship_street: String,
    ship_city: String,
    ship_state: String,
    ship_zip_code: String,
    ship_country: String,
    ship_phone: String,
    payment_method: String,
    coupon_code: Option<String>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    status: String,
    note: String,
    created_at: DateTime<Utc>,
}

fn parse_status(value: &str) -> Result<OrderStatus> {
    OrderStatus::parse(value)
        .ok_or_else(|| Error::Internal(format!("corrupt order status in database: {value}")))
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>, history: Vec<StatusEntry>) -> Result<Order> {
        Ok(Order {
            status: parse_status(&self.status)?,
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            items,
            shipping_address: ShippingAddress {
                name: self.ship_name,
                street: self.ship_street,
                city: self.ship_city,
                state: self.ship_state,
                zip_code: self.ship_zip_code,
                country: self.ship_country,
                phone: self.ship_phone,
            },
            payment_method: self.payment_method,
            totals: Totals {
                subtotal: self.subtotal,
                tax: self.tax,
                shipping: self.shipping,
                discount: self.discount,
                total: self.total,
            },
            coupon_code: self.coupon_code,
            cancel_reason: self.cancel_reason,
            status_history: history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgStoreTx {
    async fn load_order_parts(
        &mut self,
        order_id: Uuid,
    ) -> Result<(Vec<OrderItem>, Vec<StatusEntry>)> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT product_id, name, quantity, unit_price, image_url
             FROM order_items WHERE order_id = $1 ORDER BY position",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let history_rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT status, note, created_at
             FROM order_status_history WHERE order_id = $1 ORDER BY created_at, id",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut history = Vec::with_capacity(history_rows.len());
        for row in history_rows {
            history.push(StatusEntry {
                status: parse_status(&row.status)?,
                note: row.note,
                created_at: row.created_at,
            });
        }
        Ok((items, history))
    }

    async fn assemble(&mut self, row: OrderRow) -> Result<Order> {
        let (items, history) = self.load_order_parts(row.id).await?;
        row.into_order(items, history)
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn product(&mut self, id: Uuid) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, stock, is_active, image_url, category_id,
                    created_at, updated_at
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn decrement_stock(&mut self, id: Uuid, quantity: i32) -> Result<StockUpdate> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW()
             WHERE id = $1 AND stock >= $2",
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            let available: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
            return Ok(StockUpdate::Insufficient {
                available: available.unwrap_or(0),
            });
        }
        Ok(StockUpdate::Applied)
    }

    async fn increment_stock(&mut self, id: Uuid, quantity: i32) -> Result<()> {
        sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn coupon(&mut self, code: &str) -> Result<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(
            "SELECT id, code, discount_type, discount_value, min_order_value, max_discount,
                    usage_limit, used_count, is_active, starts_at, expires_at, created_at
             FROM coupons WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(CouponRow::into_coupon).transpose()
    }

    async fn increment_coupon_usage(&mut self, code: &str) -> Result<CouponUsage> {
        let result = sqlx::query(
            "UPDATE coupons SET used_count = used_count + 1
             WHERE code = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
        )
        .bind(code)
        .execute(&mut *self.tx)
        .await?;

        Ok(if result.rows_affected() == 0 {
            CouponUsage::LimitReached
        } else {
            CouponUsage::Applied
        })
    }

    async fn ensure_cart(&mut self, user_id: Uuid) -> Result<Cart> {
        #[derive(sqlx::FromRow)]
        struct CartRow {
            id: Uuid,
            user_id: Uuid,
            created_at: DateTime<Utc>,
            updated_at: DateTime<Utc>,
        }

        let row = sqlx::query_as::<_, CartRow>(
            "INSERT INTO carts (id, user_id, created_at, updated_at)
             VALUES ($1, $2, NOW(), NOW())
             ON CONFLICT (user_id) DO UPDATE SET updated_at = carts.updated_at
             RETURNING id, user_id, created_at, updated_at",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        let items = self.cart_lines(user_id).await?;
        Ok(Cart {
            id: row.id,
            user_id: row.user_id,
            items,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn cart_lines(&mut self, user_id: Uuid) -> Result<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT ci.product_id, ci.quantity, ci.unit_price
             FROM cart_items ci
             JOIN carts c ON c.id = ci.cart_id
             WHERE c.user_id = $1
             ORDER BY ci.created_at",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(lines)
    }

    async fn set_cart_line(
        &mut self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<()> {
        let cart = self.ensure_cart(user_id).await?;
        sqlx::query(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity, unit_price, created_at)
             VALUES ($1, $2, $3, $4, $5, NOW())
             ON CONFLICT (cart_id, product_id)
             DO UPDATE SET quantity = EXCLUDED.quantity, unit_price = EXCLUDED.unit_price",
        )
        .bind(Uuid::now_v7())
        .bind(cart.id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn remove_cart_line(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM cart_items
             WHERE product_id = $2
               AND cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            "DELETE FROM cart_items
             WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<OrderInsert> {
        let result = sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, status,
                                 subtotal, tax, shipping, discount, total,
                                 ship_name, ship_street, ship_city, ship_state,
                                 ship_zip_code, ship_country, ship_phone,
                                 payment_method, coupon_code, cancel_reason,
                                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                     $17, $18, $19, $20, $21)
             ON CONFLICT (order_number) DO NOTHING",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.totals.subtotal)
        .bind(order.totals.tax)
        .bind(order.totals.shipping)
        .bind(order.totals.discount)
        .bind(order.totals.total)
        .bind(&order.shipping_address.name)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.state)
        .bind(&order.shipping_address.zip_code)
        .bind(&order.shipping_address.country)
        .bind(&order.shipping_address.phone)
        .bind(&order.payment_method)
        .bind(&order.coupon_code)
        .bind(&order.cancel_reason)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(OrderInsert::DuplicateNumber);
        }

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, position, product_id, name, quantity,
                                          unit_price, image_url)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::now_v7())
            .bind(order.id)
            .bind(position as i32)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(&item.image_url)
            .execute(&mut *self.tx)
            .await?;
        }

        for entry in &order.status_history {
            sqlx::query(
                "INSERT INTO order_status_history (id, order_id, status, note, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::now_v7())
            .bind(order.id)
            .bind(entry.status.as_str())
            .bind(&entry.note)
            .bind(entry.created_at)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(OrderInsert::Inserted)
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn orders_for(&mut self, user_id: Option<Uuid>) -> Result<Vec<Order>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, OrderRow>(
                    "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(&mut *self.tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC")
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.assemble(row).await?);
        }
        Ok(orders)
    }

    async fn write_status(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        entry: &StatusEntry,
        cancel_reason: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE orders
             SET status = $2, cancel_reason = COALESCE($3, cancel_reason), updated_at = NOW()
             WHERE id = $1",
        )
        .bind(order_id)
        .bind(status.as_str())
        .bind(cancel_reason)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query(
            "INSERT INTO order_status_history (id, order_id, status, note, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(entry.status.as_str())
        .bind(&entry.note)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn wishlist(&mut self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            "SELECT product_id FROM wishlist_items WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn add_wishlist(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO wishlist_items (id, user_id, product_id, created_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_wishlist(&mut self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_wishlist(&mut self, user_id: Uuid, product_ids: &[Uuid]) -> Result<()> {
        sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        for product_id in product_ids {
            self.add_wishlist(user_id, *product_id).await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
