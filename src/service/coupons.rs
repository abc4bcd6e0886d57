//! Coupon validation against an order total.
//!
//! This path is read-only: the authoritative usage increment happens inside
//! the checkout transaction, so a quote handed out here can still be refused
//! at placement time if the cap is consumed in between.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::coupon::CouponQuote;
use crate::error::{Error, Result};
use crate::store::CommerceStore;

/// Coupon codes are stored uppercase; lookups fold case and whitespace.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub async fn validate<S: CommerceStore>(
    store: &S,
    code: &str,
    order_total: Decimal,
) -> Result<CouponQuote> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(Error::Validation("coupon code is required".into()));
    }
    if order_total < Decimal::ZERO {
        return Err(Error::Validation("order total cannot be negative".into()));
    }

    let mut tx = store.begin().await?;
    let coupon = tx
        .coupon(&code)
        .await?
        .ok_or_else(|| Error::CouponNotFound { code: code.clone() })?;
    let discount_amount = coupon.check(order_total, Utc::now())?;

    Ok(CouponQuote {
        code,
        discount_amount,
        final_total: (order_total - discount_amount).max(Decimal::ZERO),
    })
}
