//! Mercato - Self-hosted Storefront
//!
//! Self-hosted e-commerce storefront and admin back office.
//!
//! ## Features
//! - Product catalog and categories
//! - Per-user shopping cart with live stock validation
//! - Transactional checkout: stock decrement, pricing, coupon usage and
//!   order creation succeed or fail as one unit
//! - Order lifecycle with append-only status history and compensating
//!   stock restoration on cancellation
//! - Coupons with validity windows and atomic usage caps
//! - Wishlists and admin reporting

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod http;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
