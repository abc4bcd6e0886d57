//! Checkout and order lifecycle endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus, ShippingAddress};
use crate::domain::pricing::ShippingMethod;
use crate::error::{Error, Result};
use crate::http::AppState;
use crate::service::checkout::{self, PlaceOrder};
use crate::service::{orders, Requester};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    pub coupon_code: Option<String>,
}

pub async fn checkout(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = checkout::place_order(
        &state.store,
        &state.pricing,
        PlaceOrder {
            user_id: requester.user_id,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            shipping_method: request.shipping_method,
            coupon_code: request.coupon_code,
        },
    )
    .await?;

    state.events.order_placed(&order).await;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list(
    State(state): State<AppState>,
    requester: Requester,
) -> Result<Json<Vec<Order>>> {
    let orders = orders::list_orders(&state.store, requester).await?;
    Ok(Json(orders))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    requester: Requester,
) -> Result<Json<Order>> {
    let order = orders::get_order(&state.store, id, requester).await?;
    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    requester: Requester,
    request: Option<Json<CancelRequest>>,
) -> Result<Json<Order>> {
    let reason = request.and_then(|Json(r)| r.reason);
    let order = orders::cancel_order(&state.store, id, reason, requester).await?;
    state.events.order_status_changed(&order).await;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub note: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    requester: Requester,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    let status = OrderStatus::parse(&request.status).ok_or(Error::InvalidStatus {
        value: request.status.clone(),
    })?;
    let order = orders::update_status(&state.store, id, status, request.note, requester).await?;
    state.events.order_status_changed(&order).await;
    Ok(Json(order))
}
