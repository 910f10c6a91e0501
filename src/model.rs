use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;

/// Server-assigned timestamps shared by users, products and orders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Telegram user, keyed by the Telegram id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct User {
    pub telegram_id: i64,
    pub full_name: String,
    pub username: Option<String>,
    pub language_code: String,
    pub referrer_id: Option<i64>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub product_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

// price is kept as text in the store, so rows are decoded by hand.
impl<'r> FromRow<'r, SqliteRow> for Product {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let price: String = row.try_get("price")?;
        let price = Decimal::from_str(&price).map_err(|e| sqlx::Error::ColumnDecode {
            index: "price".into(),
            source: Box::new(e),
        })?;
        Ok(Product {
            product_id: row.try_get("product_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price,
            timestamps: Timestamps::from_row(row)?,
        })
    }
}

/// Order placed by a user. `user_id` is cleared if the user is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Order {
    pub order_id: i64,
    pub user_id: Option<i64>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Link row between an order and a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct OrderProduct {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}
