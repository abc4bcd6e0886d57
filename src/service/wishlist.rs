//! Wishlist: a per-user set of product references. Add is idempotent, sync
//! replaces the whole set.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::CommerceStore;

pub async fn list<S: CommerceStore>(store: &S, user_id: Uuid) -> Result<Vec<Uuid>> {
    let mut tx = store.begin().await?;
    tx.wishlist(user_id).await
}

pub async fn add<S: CommerceStore>(
    store: &S,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<Vec<Uuid>> {
    let mut tx = store.begin().await?;
    let product = tx
        .product(product_id)
        .await?
        .ok_or_else(|| Error::ProductUnavailable {
            name: product_id.to_string(),
        })?;
    if !product.is_active {
        return Err(Error::ProductUnavailable { name: product.name });
    }
    tx.add_wishlist(user_id, product_id).await?;
    let list = tx.wishlist(user_id).await?;
    tx.commit().await?;
    Ok(list)
}

pub async fn remove<S: CommerceStore>(
    store: &S,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<Vec<Uuid>> {
    let mut tx = store.begin().await?;
    tx.remove_wishlist(user_id, product_id).await?;
    let list = tx.wishlist(user_id).await?;
    tx.commit().await?;
    Ok(list)
}

/// Replaces the wishlist with exactly `product_ids` (deduplicated). Every
/// referenced product must exist and be active.
pub async fn sync<S: CommerceStore>(
    store: &S,
    user_id: Uuid,
    product_ids: &[Uuid],
) -> Result<Vec<Uuid>> {
    let mut tx = store.begin().await?;
    for product_id in product_ids {
        let product = tx
            .product(*product_id)
            .await?
            .ok_or_else(|| Error::ProductUnavailable {
                name: product_id.to_string(),
            })?;
        if !product.is_active {
            return Err(Error::ProductUnavailable { name: product.name });
        }
    }
    tx.set_wishlist(user_id, product_ids).await?;
    let list = tx.wishlist(user_id).await?;
    tx.commit().await?;
    Ok(list)
}
