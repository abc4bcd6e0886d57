//! End-to-end checkout and lifecycle tests against the in-memory store.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use mercato::domain::coupon::{Coupon, DiscountType};
use mercato::domain::order::{OrderStatus, ShippingAddress};
use mercato::domain::pricing::{Pricing, ShippingMethod};
use mercato::domain::product::Product;
use mercato::error::Error;
use mercato::service::checkout::{self, PlaceOrder};
use mercato::service::{carts, coupons, orders, Requester};
use mercato::store::memory::MemoryStore;

fn product(name: &str, price: Decimal, stock: i32) -> Product {
    Product {
        id: Uuid::now_v7(),
        name: name.into(),
        description: None,
        price,
        stock,
        is_active: true,
        image_url: None,
        category_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn coupon(code: &str, discount_type: DiscountType, value: Decimal) -> Coupon {
    Coupon {
        id: Uuid::now_v7(),
        code: code.into(),
        discount_type,
        discount_value: value,
        min_order_value: None,
        max_discount: None,
        usage_limit: None,
        used_count: 0,
        is_active: true,
        starts_at: Utc::now() - Duration::days(1),
        expires_at: Utc::now() + Duration::days(30),
        created_at: Utc::now(),
    }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Ada Lovelace".into(),
        street: "1 Analytical Way".into(),
        city: "London".into(),
        state: "LDN".into(),
        zip_code: "EC1A".into(),
        country: "GB".into(),
        phone: "555-0100".into(),
    }
}

fn place(user_id: Uuid, coupon_code: Option<&str>) -> PlaceOrder {
    PlaceOrder {
        user_id,
        shipping_address: address(),
        payment_method: "card".into(),
        shipping_method: ShippingMethod::Standard,
        coupon_code: coupon_code.map(Into::into),
    }
}

#[tokio::test]
async fn checkout_scenario_prices_and_decrements_stock() {
    let store = MemoryStore::new();
    let a = product("Product A", dec!(20), 5);
    let b = product("Product B", dec!(15), 5);
    store.seed_product(a.clone()).await;
    store.seed_product(b.clone()).await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, a.id, 2).await.unwrap();
    carts::add_item(&store, user, b.id, 1).await.unwrap();

    let order = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.totals.subtotal, dec!(55));
    assert_eq!(order.totals.tax, dec!(5.50));
    assert_eq!(order.totals.shipping, dec!(10));
    assert_eq!(order.totals.discount, Decimal::ZERO);
    assert_eq!(order.totals.total, dec!(70.50));
    assert_eq!(order.status_history.len(), 1);

    // Stock conservation.
    assert_eq!(store.product_snapshot(a.id).await.unwrap().stock, 3);
    assert_eq!(store.product_snapshot(b.id).await.unwrap().stock, 4);

    // Cart is cleared, not deleted.
    let cart = carts::get_cart(&store, user).await.unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn order_number_has_expected_format() {
    let store = MemoryStore::new();
    let item = product("Widget", dec!(10), 10);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, item.id, 1).await.unwrap();
    let order = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap();

    let parts: Vec<&str> = order.order_number.split('-').collect();
    assert_eq!(parts[0], "ORD");
    assert_eq!(parts[1].len(), 8);
    assert_eq!(parts[2].len(), 5);
    assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
    assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let store = MemoryStore::new();
    let err = checkout::place_order(&store, &Pricing::default(), place(Uuid::now_v7(), None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyCart));
}

#[tokio::test]
async fn oversell_leaves_stock_and_orders_untouched() {
    let store = MemoryStore::new();
    let item = product("Scarce", dec!(30), 5);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, item.id, 5).await.unwrap();

    // Someone else buys in between: stock drops below the cart quantity.
    store
        .seed_product(Product {
            stock: 4,
            ..item.clone()
        })
        .await;

    let err = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientStock { available: 4, .. }
    ));
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 4);
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn partial_failure_decrements_nothing() {
    let store = MemoryStore::new();
    let a = product("A", dec!(10), 10);
    let b = product("B", dec!(10), 2);
    let c = product("C", dec!(10), 10);
    store.seed_product(a.clone()).await;
    store.seed_product(b.clone()).await;
    store.seed_product(c.clone()).await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, a.id, 1).await.unwrap();
    carts::add_item(&store, user, b.id, 2).await.unwrap();
    carts::add_item(&store, user, c.id, 1).await.unwrap();

    // Line 2 goes short after the cart was built.
    store
        .seed_product(Product {
            stock: 1,
            ..b.clone()
        })
        .await;

    let err = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientStock { .. }));

    assert_eq!(store.product_snapshot(a.id).await.unwrap().stock, 10);
    assert_eq!(store.product_snapshot(b.id).await.unwrap().stock, 1);
    assert_eq!(store.product_snapshot(c.id).await.unwrap().stock, 10);
    assert_eq!(store.order_count().await, 0);

    // The cart survives a failed checkout.
    let cart = carts::get_cart(&store, user).await.unwrap();
    assert_eq!(cart.items.len(), 3);
}

#[tokio::test]
async fn fixed_discount_total_arithmetic() {
    let store = MemoryStore::new();
    let item = product("Bundle", dec!(50), 10);
    store.seed_product(item.clone()).await;
    store
        .seed_coupon(coupon("TENOFF", DiscountType::Fixed, dec!(10)))
        .await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, item.id, 2).await.unwrap();

    let order = checkout::place_order(&store, &Pricing::default(), place(user, Some("tenoff")))
        .await
        .unwrap();

    // subtotal 100, tax 10, free shipping at the threshold, minus 10.
    assert_eq!(order.totals.subtotal, dec!(100));
    assert_eq!(order.totals.tax, dec!(10.00));
    assert_eq!(order.totals.shipping, Decimal::ZERO);
    assert_eq!(order.totals.discount, dec!(10));
    assert_eq!(order.totals.total, dec!(100.00));
    assert_eq!(order.coupon_code.as_deref(), Some("TENOFF"));
    assert_eq!(
        store.coupon_snapshot("TENOFF").await.unwrap().used_count,
        1
    );
}

#[tokio::test]
async fn failed_coupon_consumes_nothing() {
    let store = MemoryStore::new();
    let item = product("Gadget", dec!(10), 10);
    store.seed_product(item.clone()).await;
    store
        .seed_coupon(Coupon {
            min_order_value: Some(dec!(500)),
            ..coupon("BIGSPEND", DiscountType::Percentage, dec!(10))
        })
        .await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, item.id, 1).await.unwrap();

    let err = checkout::place_order(&store, &Pricing::default(), place(user, Some("BIGSPEND")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CouponMinOrder { .. }));

    // Whole transaction rolled back: stock intact, no order, no usage.
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 10);
    assert_eq!(store.order_count().await, 0);
    assert_eq!(
        store.coupon_snapshot("BIGSPEND").await.unwrap().used_count,
        0
    );
}

#[tokio::test]
async fn coupon_usage_cap_admits_exactly_one_of_two_racing_checkouts() {
    let store = MemoryStore::new();
    let item = product("Hot", dec!(40), 100);
    store.seed_product(item.clone()).await;
    store
        .seed_coupon(Coupon {
            usage_limit: Some(1),
            ..coupon("ONCE", DiscountType::Percentage, dec!(50))
        })
        .await;

    let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
    carts::add_item(&store, alice, item.id, 1).await.unwrap();
    carts::add_item(&store, bob, item.id, 1).await.unwrap();

    let pricing = Pricing::default();
    let (first, second) = tokio::join!(
        checkout::place_order(&store, &pricing, place(alice, Some("ONCE"))),
        checkout::place_order(&store, &pricing, place(bob, Some("ONCE"))),
    );

    let outcomes = [first, second];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(Error::CouponUsageLimit { .. }))));
    assert_eq!(store.coupon_snapshot("ONCE").await.unwrap().used_count, 1);
}

#[tokio::test]
async fn cancellation_restores_stock_exactly_once() {
    let store = MemoryStore::new();
    let item = product("Returnable", dec!(25), 8);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, item.id, 3).await.unwrap();
    let order = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap();
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 5);

    let cancelled = orders::cancel_order(
        &store,
        order.id,
        Some("changed my mind".into()),
        Requester::customer(user),
    )
    .await
    .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("changed my mind"));
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 8);

    // Idempotency guard: a second cancel fails and does not double-restore.
    let err = orders::cancel_order(&store, order.id, None, Requester::customer(user))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OrderNotCancellable { .. }));
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 8);
}

#[tokio::test]
async fn status_route_cancellation_restores_stock_exactly_once() {
    let store = MemoryStore::new();
    let item = product("Recallable", dec!(25), 8);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, item.id, 3).await.unwrap();
    let order = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap();
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 5);

    // Cancelling via the admin status transition compensates like cancel_order.
    let admin = Requester::admin(Uuid::now_v7());
    let cancelled =
        orders::update_status(&store, order.id, OrderStatus::Cancelled, None, admin)
            .await
            .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 8);

    // A repeat transition to Cancelled fails and does not restore again.
    let err = orders::update_status(&store, order.id, OrderStatus::Cancelled, None, admin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::OrderNotCancellable {
            status: OrderStatus::Cancelled
        }
    ));
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 8);

    let after = orders::get_order(&store, order.id, admin).await.unwrap();
    assert_eq!(
        after
            .status_history
            .iter()
            .filter(|entry| entry.status == OrderStatus::Cancelled)
            .count(),
        1
    );
}

#[tokio::test]
async fn customer_cannot_cancel_shipped_order() {
    let store = MemoryStore::new();
    let item = product("Shipped", dec!(10), 5);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    let admin = Requester::admin(Uuid::now_v7());
    carts::add_item(&store, user, item.id, 1).await.unwrap();
    let order = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap();

    orders::update_status(&store, order.id, OrderStatus::Processing, None, admin)
        .await
        .unwrap();
    orders::update_status(&store, order.id, OrderStatus::Shipped, None, admin)
        .await
        .unwrap();

    let err = orders::cancel_order(&store, order.id, None, Requester::customer(user))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::OrderNotCancellable {
            status: OrderStatus::Shipped
        }
    ));

    // An admin still can, and stock comes back.
    let cancelled = orders::cancel_order(&store, order.id, None, admin)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 5);
}

#[tokio::test]
async fn status_history_is_append_only_and_ordered() {
    let store = MemoryStore::new();
    let item = product("Tracked", dec!(10), 5);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    let admin = Requester::admin(Uuid::now_v7());
    carts::add_item(&store, user, item.id, 1).await.unwrap();
    let order = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap();

    let first_entry = order.status_history[0].clone();

    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        orders::update_status(&store, order.id, status, None, admin)
            .await
            .unwrap();
    }

    let latest = orders::get_order(&store, order.id, admin).await.unwrap();
    assert_eq!(latest.status, OrderStatus::Delivered);
    assert_eq!(latest.status_history.len(), 4);
    assert_eq!(latest.status_history[0].status, first_entry.status);
    assert_eq!(latest.status_history[0].created_at, first_entry.created_at);
    assert!(latest
        .status_history
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at));
}

#[tokio::test]
async fn non_forward_transitions_are_rejected() {
    let store = MemoryStore::new();
    let item = product("Strict", dec!(10), 5);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    let admin = Requester::admin(Uuid::now_v7());
    carts::add_item(&store, user, item.id, 1).await.unwrap();
    let order = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap();

    let err = orders::update_status(&store, order.id, OrderStatus::Delivered, None, admin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: OrderStatus::Placed,
            to: OrderStatus::Delivered
        }
    ));

    // Customers cannot drive the status machine at all.
    let err = orders::update_status(
        &store,
        order.id,
        OrderStatus::Processing,
        None,
        Requester::customer(user),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Forbidden));
}

#[tokio::test]
async fn orders_are_private_to_their_owner() {
    let store = MemoryStore::new();
    let item = product("Private", dec!(10), 5);
    store.seed_product(item.clone()).await;

    let owner = Uuid::now_v7();
    carts::add_item(&store, owner, item.id, 1).await.unwrap();
    let order = checkout::place_order(&store, &Pricing::default(), place(owner, None))
        .await
        .unwrap();

    let stranger = Requester::customer(Uuid::now_v7());
    let err = orders::get_order(&store, order.id, stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden));

    let fetched = orders::get_order(&store, order.id, Requester::admin(Uuid::now_v7()))
        .await
        .unwrap();
    assert_eq!(fetched.id, order.id);
}

#[tokio::test]
async fn cart_add_merges_and_validates_against_merged_quantity() {
    let store = MemoryStore::new();
    let item = product("Mergeable", dec!(10), 5);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    let cart = carts::add_item(&store, user, item.id, 3).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.quantity_of(item.id), 3);

    let cart = carts::add_item(&store, user, item.id, 2).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.quantity_of(item.id), 5);

    // 5 in the cart + 1 more exceeds stock.
    let err = carts::add_item(&store, user, item.id, 1).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientStock { available: 5, .. }
    ));
}

#[tokio::test]
async fn cart_add_rejects_quantity_that_would_overflow() {
    let store = MemoryStore::new();
    let item = product("Bulk", dec!(1), i32::MAX);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, item.id, 2).await.unwrap();

    let err = carts::add_item(&store, user, item.id, i32::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let cart = carts::get_cart(&store, user).await.unwrap();
    assert_eq!(cart.quantity_of(item.id), 2);
}

#[tokio::test]
async fn checkout_uses_live_price_not_cart_snapshot() {
    let store = MemoryStore::new();
    let item = product("Repriced", dec!(10), 10);
    store.seed_product(item.clone()).await;

    let user = Uuid::now_v7();
    carts::add_item(&store, user, item.id, 1).await.unwrap();

    // Price changes after the snapshot was taken.
    store
        .seed_product(Product {
            price: dec!(12),
            ..item.clone()
        })
        .await;

    let order = checkout::place_order(&store, &Pricing::default(), place(user, None))
        .await
        .unwrap();
    assert_eq!(order.totals.subtotal, dec!(12));
    assert_eq!(order.items[0].unit_price, dec!(12));
}

#[tokio::test]
async fn validate_coupon_quotes_without_consuming() {
    let store = MemoryStore::new();
    store
        .seed_coupon(Coupon {
            max_discount: Some(dec!(15)),
            ..coupon("QUOTE20", DiscountType::Percentage, dec!(20))
        })
        .await;

    let quote = coupons::validate(&store, " quote20 ", dec!(100))
        .await
        .unwrap();
    assert_eq!(quote.code, "QUOTE20");
    assert_eq!(quote.discount_amount, dec!(15));
    assert_eq!(quote.final_total, dec!(85));
    assert_eq!(store.coupon_snapshot("QUOTE20").await.unwrap().used_count, 0);

    let err = coupons::validate(&store, "MISSING", dec!(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CouponNotFound { .. }));
}
