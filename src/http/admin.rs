//! Admin back office: dashboard aggregation and coupon management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::coupon::DiscountType;
use crate::error::{Error, Result};
use crate::http::{require_admin, AppState};
use crate::service::coupons::normalize_code;
use crate::service::Requester;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub orders_by_status: Vec<StatusCount>,
    pub low_stock: Vec<LowStockProduct>,
}

pub async fn stats(
    State(state): State<AppState>,
    requester: Requester,
) -> Result<Json<AdminStats>> {
    require_admin(requester)?;

    let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.db)
        .await?;

    let total_revenue: Decimal = sqlx::query_scalar(
        "SELECT COALESCE(SUM(total), 0) FROM orders WHERE status <> 'cancelled'",
    )
    .fetch_one(&state.db)
    .await?;

    let orders_by_status = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
    )
    .fetch_all(&state.db)
    .await?;

    let low_stock = sqlx::query_as::<_, LowStockProduct>(
        "SELECT id, name, stock FROM products
         WHERE is_active AND stock <= 5 ORDER BY stock, name LIMIT 20",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(AdminStats {
        total_orders,
        total_revenue,
        orders_by_status,
        low_stock,
    }))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CouponSummary {
    pub code: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub async fn list_coupons(
    State(state): State<AppState>,
    requester: Requester,
) -> Result<Json<Vec<CouponSummary>>> {
    require_admin(requester)?;
    let coupons = sqlx::query_as::<_, CouponSummary>(
        "SELECT code, discount_type, discount_value, min_order_value, max_discount,
                usage_limit, used_count, is_active, starts_at, expires_at
         FROM coupons ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(coupons))
}

#[derive(Debug, Deserialize)]
pub struct CreateCouponRequest {
    pub code: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_coupon(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<CouponSummary>)> {
    require_admin(requester)?;

    let code = normalize_code(&request.code);
    if code.is_empty() {
        return Err(Error::Validation("coupon code is required".into()));
    }
    let discount_type = DiscountType::parse(&request.discount_type).ok_or_else(|| {
        Error::Validation(format!(
            "discount type must be percentage or fixed, got {}",
            request.discount_type
        ))
    })?;
    if request.discount_value <= Decimal::ZERO {
        return Err(Error::Validation("discount value must be positive".into()));
    }
    if discount_type == DiscountType::Percentage && request.discount_value > Decimal::from(100) {
        return Err(Error::Validation(
            "percentage discount cannot exceed 100".into(),
        ));
    }
    if request.usage_limit.is_some_and(|limit| limit < 1) {
        return Err(Error::Validation("usage limit must be at least 1".into()));
    }
    let starts_at = request.starts_at.unwrap_or_else(Utc::now);
    if request.expires_at <= starts_at {
        return Err(Error::Validation("expiry must be after the start".into()));
    }

    let coupon = sqlx::query_as::<_, CouponSummary>(
        "INSERT INTO coupons (id, code, discount_type, discount_value, min_order_value,
                              max_discount, usage_limit, used_count, is_active, starts_at,
                              expires_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, TRUE, $8, $9, NOW())
         RETURNING code, discount_type, discount_value, min_order_value, max_discount,
                   usage_limit, used_count, is_active, starts_at, expires_at",
    )
    .bind(Uuid::now_v7())
    .bind(&code)
    .bind(discount_type.as_str())
    .bind(request.discount_value)
    .bind(request.min_order_value)
    .bind(request.max_discount)
    .bind(request.usage_limit)
    .bind(starts_at)
    .bind(request.expires_at)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn deactivate_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
    requester: Requester,
) -> Result<StatusCode> {
    require_admin(requester)?;
    let result = sqlx::query("UPDATE coupons SET is_active = FALSE WHERE code = $1")
        .bind(normalize_code(&code))
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::CouponNotFound {
            code: normalize_code(&code),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
