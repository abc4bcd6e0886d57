//! Coupon validation endpoint: a read-only quote against an order total.

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::coupon::CouponQuote;
use crate::error::Result;
use crate::http::AppState;
use crate::service::coupons;

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    pub order_total: Decimal,
}

pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<CouponQuote>> {
    let quote = coupons::validate(&state.store, &request.code, request.order_total).await?;
    Ok(Json(quote))
}
