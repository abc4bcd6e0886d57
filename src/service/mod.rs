//! Core operations, generic over the store so they run identically against
//! PostgreSQL and the in-memory backend.

pub mod carts;
pub mod checkout;
pub mod coupons;
pub mod orders;
pub mod wishlist;

use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

/// The authenticated caller, as asserted by the upstream gateway.
#[derive(Clone, Copy, Debug)]
pub struct Requester {
    pub user_id: Uuid,
    pub role: Role,
}

impl Requester {
    pub fn customer(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
