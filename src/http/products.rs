//! Catalog CRUD. Plain pass-through persistence; the interesting stock
//! mutations live in the checkout and lifecycle services.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::{Category, Product};
use crate::error::{Error, Result};
use crate::http::{require_admin, AppState};
use crate::service::Requester;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).min(100);

    let products = sqlx::query_as::<_, Product>(
        "SELECT id, name, description, price, stock, is_active, image_url, category_id,
                created_at, updated_at
         FROM products WHERE is_active ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(i64::from(per_page))
    .bind(i64::from((page - 1) * per_page))
    .fetch_all(&state.db)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(PaginatedResponse {
        data: products,
        total,
        page,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, name, description, price, stock, is_active, image_url, category_id,
                created_at, updated_at
         FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("product {id}")))?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

fn check_product_request(request: &ProductRequest) -> Result<()> {
    if request.name.trim().is_empty() {
        return Err(Error::Validation("product name is required".into()));
    }
    if request.price < Decimal::ZERO {
        return Err(Error::Validation("price cannot be negative".into()));
    }
    if request.stock.is_some_and(|stock| stock < 0) {
        return Err(Error::Validation("stock cannot be negative".into()));
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    require_admin(requester)?;
    check_product_request(&request)?;

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, stock, is_active, image_url,
                               category_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, NOW(), NOW())
         RETURNING id, name, description, price, stock, is_active, image_url, category_id,
                   created_at, updated_at",
    )
    .bind(Uuid::now_v7())
    .bind(request.name.trim())
    .bind(&request.description)
    .bind(request.price)
    .bind(request.stock.unwrap_or(0))
    .bind(&request.image_url)
    .bind(request.category_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    requester: Requester,
    Json(request): Json<ProductRequest>,
) -> Result<Json<Product>> {
    require_admin(requester)?;
    check_product_request(&request)?;

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products
         SET name = $2, description = $3, price = $4, stock = COALESCE($5, stock),
             image_url = $6, category_id = $7, updated_at = NOW()
         WHERE id = $1
         RETURNING id, name, description, price, stock, is_active, image_url, category_id,
                   created_at, updated_at",
    )
    .bind(id)
    .bind(request.name.trim())
    .bind(&request.description)
    .bind(request.price)
    .bind(request.stock)
    .bind(&request.image_url)
    .bind(request.category_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("product {id}")))?;

    Ok(Json(product))
}

/// Soft delete: deactivates the product so existing orders keep their
/// snapshots intact.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    requester: Requester,
) -> Result<StatusCode> {
    require_admin(requester)?;
    sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, description, created_at FROM categories ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, description, created_at FROM categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("category {id}")))?;
    Ok(Json(category))
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_category(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    require_admin(requester)?;
    if request.name.trim().is_empty() {
        return Err(Error::Validation("category name is required".into()));
    }
    let slug = request.name.trim().to_lowercase().replace(' ', "-");

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, slug, description, created_at)
         VALUES ($1, $2, $3, $4, NOW())
         RETURNING id, name, slug, description, created_at",
    )
    .bind(Uuid::now_v7())
    .bind(request.name.trim())
    .bind(&slug)
    .bind(&request.description)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(category)))
}
