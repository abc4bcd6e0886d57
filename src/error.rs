//! Service-wide error type.
//!
//! Every domain failure gets its own variant so the HTTP layer can map it to
//! a specific status code and a message that names the offending entity
//! (product name, coupon code). Infrastructure failures are redacted before
//! they reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::order::OrderStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("product {name} is unavailable")]
    ProductUnavailable { name: String },

    #[error("insufficient stock for {name}: {available} available")]
    InsufficientStock { name: String, available: i32 },

    #[error("coupon {code} not found")]
    CouponNotFound { code: String },

    #[error("coupon {code} is not active")]
    CouponInactive { code: String },

    #[error("coupon {code} is outside its validity window")]
    CouponExpired { code: String },

    #[error("coupon {code} has reached its usage limit")]
    CouponUsageLimit { code: String },

    #[error("order total is below the minimum of {min} required by coupon {code}")]
    CouponMinOrder { code: String, min: Decimal },

    #[error("order not found")]
    OrderNotFound,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("missing or invalid credentials: {0}")]
    Unauthorized(String),

    #[error("not allowed")]
    Forbidden,

    #[error("order cannot be cancelled while {status}")]
    OrderNotCancellable { status: OrderStatus },

    #[error("unrecognized order status: {value}")]
    InvalidStatus { value: String },

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::EmptyCart
            | Self::CouponInactive { .. }
            | Self::CouponExpired { .. }
            | Self::CouponUsageLimit { .. }
            | Self::CouponMinOrder { .. }
            | Self::InvalidStatus { .. }
            | Self::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            Self::CouponNotFound { .. } | Self::OrderNotFound | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ProductUnavailable { .. }
            | Self::InsufficientStock { .. }
            | Self::OrderNotCancellable { .. } => StatusCode::CONFLICT,
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the logs, not in the response body.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
