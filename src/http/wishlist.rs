//! Wishlist endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::http::AppState;
use crate::service::{wishlist, Requester};

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub product_ids: Vec<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    requester: Requester,
) -> Result<Json<WishlistResponse>> {
    let product_ids = wishlist::list(&state.store, requester.user_id).await?;
    Ok(Json(WishlistResponse { product_ids }))
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: Uuid,
}

pub async fn add(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<AddRequest>,
) -> Result<(StatusCode, Json<WishlistResponse>)> {
    let product_ids =
        wishlist::add(&state.store, requester.user_id, request.product_id).await?;
    Ok((StatusCode::CREATED, Json(WishlistResponse { product_ids })))
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub product_ids: Vec<Uuid>,
}

pub async fn sync(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<SyncRequest>,
) -> Result<Json<WishlistResponse>> {
    let product_ids =
        wishlist::sync(&state.store, requester.user_id, &request.product_ids).await?;
    Ok(Json(WishlistResponse { product_ids }))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    requester: Requester,
) -> Result<Json<WishlistResponse>> {
    let product_ids = wishlist::remove(&state.store, requester.user_id, product_id).await?;
    Ok(Json(WishlistResponse { product_ids }))
}
