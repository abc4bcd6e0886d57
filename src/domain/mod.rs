//! Domain types and pure business rules. No I/O in this module tree.

pub mod cart;
pub mod coupon;
pub mod order;
pub mod pricing;
pub mod product;
