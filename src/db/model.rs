//! View models returned by the join and aggregate queries.
//!
//! Entity rows live in `crate::model`; these are the shapes that only exist
//! as query results.

use crate::model::{Order, Product};
use serde::Serialize;
use sqlx::FromRow;

/// A referrer paired with a user they invited.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, FromRow)]
pub struct InvitedUser {
    pub referrer_name: String,
    pub invited_name: String,
}

/// One product line of one of a user's orders.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserOrderLine {
    pub product: Product,
    pub order: Order,
    pub username: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, FromRow)]
pub struct OrdersPerUser {
    pub total: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, FromRow)]
pub struct ProductsPerUser {
    pub quantity_sum: i64,
    pub full_name: String,
}
