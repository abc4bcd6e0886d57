//! Coupon rules and discount computation.
//!
//! Validation order is fixed: active → validity window → usage limit →
//! minimum order value. The first failing check wins, each with its own
//! error kind so clients can render a specific message. Existence is the
//! caller's check (it owns the lookup).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "percentage" => Some(Self::Percentage),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Runs every validation check against `order_total` at `now` and
    /// returns the discount amount this coupon yields.
    ///
    /// The usage-limit check here is advisory: the store applies the
    /// authoritative conditional increment inside the same transaction, so
    /// two racing checkouts cannot both consume the last use.
    pub fn check(&self, order_total: Decimal, now: DateTime<Utc>) -> Result<Decimal> {
        if !self.is_active {
            return Err(Error::CouponInactive {
                code: self.code.clone(),
            });
        }
        if now < self.starts_at || now > self.expires_at {
            return Err(Error::CouponExpired {
                code: self.code.clone(),
            });
        }
        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return Err(Error::CouponUsageLimit {
                    code: self.code.clone(),
                });
            }
        }
        if let Some(min) = self.min_order_value {
            if order_total < min {
                return Err(Error::CouponMinOrder {
                    code: self.code.clone(),
                    min,
                });
            }
        }
        Ok(self.discount_for(order_total))
    }

    fn discount_for(&self, order_total: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Percentage => {
                let raw = (order_total * self.discount_value / Decimal::from(100)).round_dp(2);
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            // Fixed discounts are not capped by the order total; the caller
            // clamps the final total at zero.
            DiscountType::Fixed => self.discount_value,
        }
    }
}

/// Result of a successful coupon validation against an order total.
#[derive(Clone, Debug, Serialize)]
pub struct CouponQuote {
    pub code: String,
    pub discount_amount: Decimal,
    pub final_total: Decimal,
}
