//! Cart operations. Quantity changes are validated against live stock at
//! the time of the change; the snapshot price stored on the line is
//! refreshed on every write and used only for display.

use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::product::Product;
use crate::error::{Error, Result};
use crate::store::{CommerceStore, StoreTx};

pub async fn get_cart<S: CommerceStore>(store: &S, user_id: Uuid) -> Result<Cart> {
    let mut tx = store.begin().await?;
    let cart = tx.ensure_cart(user_id).await?;
    tx.commit().await?;
    Ok(cart)
}

/// Adds `quantity` of a product, merging with any existing line. The stock
/// check runs against the merged quantity.
pub async fn add_item<S: CommerceStore>(
    store: &S,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<Cart> {
    check_quantity(quantity)?;
    let mut tx = store.begin().await?;

    let product = fetch_available(tx.as_mut(), product_id).await?;
    let existing = tx
        .cart_lines(user_id)
        .await?
        .iter()
        .find(|line| line.product_id == product_id)
        .map_or(0, |line| line.quantity);
    let merged = existing
        .checked_add(quantity)
        .ok_or_else(|| Error::Validation("quantity is too large".into()))?;

    if !product.has_stock(merged) {
        return Err(Error::InsufficientStock {
            name: product.name,
            available: product.stock,
        });
    }

    tx.set_cart_line(user_id, product_id, merged, product.price)
        .await?;
    let cart = tx.ensure_cart(user_id).await?;
    tx.commit().await?;
    Ok(cart)
}

/// Sets a line to an absolute quantity (at least 1), re-validated against
/// live stock.
pub async fn update_item<S: CommerceStore>(
    store: &S,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<Cart> {
    check_quantity(quantity)?;
    let mut tx = store.begin().await?;

    let in_cart = tx
        .cart_lines(user_id)
        .await?
        .iter()
        .any(|line| line.product_id == product_id);
    if !in_cart {
        return Err(Error::Validation("product is not in the cart".into()));
    }

    let product = fetch_available(tx.as_mut(), product_id).await?;
    if !product.has_stock(quantity) {
        return Err(Error::InsufficientStock {
            name: product.name,
            available: product.stock,
        });
    }

    tx.set_cart_line(user_id, product_id, quantity, product.price)
        .await?;
    let cart = tx.ensure_cart(user_id).await?;
    tx.commit().await?;
    Ok(cart)
}

pub async fn remove_item<S: CommerceStore>(
    store: &S,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<Cart> {
    let mut tx = store.begin().await?;
    if !tx.remove_cart_line(user_id, product_id).await? {
        return Err(Error::Validation("product is not in the cart".into()));
    }
    let cart = tx.ensure_cart(user_id).await?;
    tx.commit().await?;
    Ok(cart)
}

pub async fn clear_cart<S: CommerceStore>(store: &S, user_id: Uuid) -> Result<()> {
    let mut tx = store.begin().await?;
    tx.clear_cart(user_id).await?;
    tx.commit().await?;
    Ok(())
}

fn check_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(Error::Validation("quantity must be at least 1".into()));
    }
    Ok(())
}

async fn fetch_available(tx: &mut dyn StoreTx, product_id: Uuid) -> Result<Product> {
    let product = tx
        .product(product_id)
        .await?
        .ok_or_else(|| Error::ProductUnavailable {
            name: product_id.to_string(),
        })?;
    if !product.is_active {
        return Err(Error::ProductUnavailable { name: product.name });
    }
    Ok(product)
}
