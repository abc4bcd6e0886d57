//! Cart endpoints. One cart per user, addressed implicitly by identity.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::error::Result;
use crate::http::AppState;
use crate::service::{carts, Requester};

pub async fn get(State(state): State<AppState>, requester: Requester) -> Result<Json<Cart>> {
    let cart = carts::get_cart(&state.store, requester.user_id).await?;
    Ok(Json(cart))
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

pub async fn add_item(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<Cart>)> {
    let cart = carts::add_item(
        &state.store,
        requester.user_id,
        request.product_id,
        request.quantity,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    requester: Requester,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<Cart>> {
    let cart = carts::update_item(
        &state.store,
        requester.user_id,
        product_id,
        request.quantity,
    )
    .await?;
    Ok(Json(cart))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    requester: Requester,
) -> Result<Json<Cart>> {
    let cart = carts::remove_item(&state.store, requester.user_id, product_id).await?;
    Ok(Json(cart))
}

pub async fn clear(State(state): State<AppState>, requester: Requester) -> Result<StatusCode> {
    carts::clear_cart(&state.store, requester.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
