//! HTTP surface: thin axum handlers over the service layer.
//!
//! Authentication is upstream's problem; the gateway asserts identity via
//! `X-User-Id` and `X-User-Role` headers and this layer trusts them.

pub mod admin;
pub mod cart;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod wishlist;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::domain::pricing::Pricing;
use crate::error::Error;
use crate::events::EventBus;
use crate::service::{Requester, Role};
use crate::store::postgres::PgStore;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: PgStore,
    pub events: EventBus,
    pub pricing: Pricing,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "mercato"})) }),
        )
        .route(
            "/api/v1/products",
            get(products::list).post(products::create),
        )
        .route(
            "/api/v1/products/:id",
            get(products::get).put(products::update).delete(products::remove),
        )
        .route(
            "/api/v1/categories",
            get(products::list_categories).post(products::create_category),
        )
        .route("/api/v1/categories/:id", get(products::get_category))
        .route("/api/v1/cart", get(cart::get).delete(cart::clear))
        .route("/api/v1/cart/items", post(cart::add_item))
        .route(
            "/api/v1/cart/items/:product_id",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/orders", get(orders::list))
        .route("/api/v1/orders/:id", get(orders::get))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route("/api/v1/coupons/validate", post(coupons::validate))
        .route(
            "/api/v1/wishlist",
            get(wishlist::list).post(wishlist::add).put(wishlist::sync),
        )
        .route(
            "/api/v1/wishlist/:product_id",
            axum::routing::delete(wishlist::remove),
        )
        .route("/api/v1/admin/stats", get(admin::stats))
        .route(
            "/api/v1/admin/coupons",
            get(admin::list_coupons).post(admin::create_coupon),
        )
        .route(
            "/api/v1/admin/coupons/:code",
            axum::routing::delete(admin::deactivate_coupon),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or_else(|| Error::Unauthorized("missing or invalid X-User-Id header".into()))?;

        let role = match parts
            .headers
            .get("x-user-role")
            .and_then(|value| value.to_str().ok())
        {
            Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Customer,
        };

        Ok(Requester { user_id, role })
    }
}

/// Guard for admin-only handlers.
pub(crate) fn require_admin(requester: Requester) -> Result<Requester, Error> {
    if requester.is_admin() {
        Ok(requester)
    } else {
        Err(Error::Forbidden)
    }
}
