use super::model::{InvitedUser, OrdersPerUser, ProductsPerUser, UserOrderLine};
use crate::model::{Order, Product, Timestamps, User};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row, SqliteConnection};
use std::str::FromStr;
use tracing::{debug, instrument};

const USER_COLUMNS: &str =
    "telegram_id, full_name, username, language_code, referrer_id, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "product_id, title, description, price, created_at, updated_at";
const ORDER_COLUMNS: &str = "order_id, user_id, created_at, updated_at";
const NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// Collection of queries over one session. Each call runs in its own
/// transaction and commits before returning.
pub struct Repo<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Repo<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Insert a user, or refresh `username` and `full_name` when the id exists.
    #[instrument(skip(self, full_name, username))]
    pub async fn add_user(
        &mut self,
        telegram_id: i64,
        full_name: &str,
        language_code: &str,
        username: Option<&str>,
        referrer_id: Option<i64>,
    ) -> Result<User> {
        let mut tx = self.db.begin().await?;
        let sql = format!(
            "INSERT INTO users (telegram_id, full_name, username, language_code, referrer_id) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (telegram_id) DO UPDATE SET \
                 username = excluded.username, \
                 full_name = excluded.full_name, \
                 updated_at = {NOW} \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(telegram_id)
            .bind(full_name)
            .bind(username)
            .bind(language_code)
            .bind(referrer_id)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert user {telegram_id}"))?;
        tx.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&mut self, telegram_id: i64) -> Result<Option<User>> {
        let mut tx = self.db.begin().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(telegram_id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(user)
    }

    /// All users, newest first.
    #[instrument(skip(self))]
    pub async fn get_all_users(&mut self) -> Result<Vec<User>> {
        self.users_newest_first(None).await
    }

    /// The ten newest users, in the same order as [`Repo::get_all_users`].
    #[instrument(skip(self))]
    pub async fn get_last_ten_users(&mut self) -> Result<Vec<User>> {
        self.users_newest_first(Some(10)).await
    }

    async fn users_newest_first(&mut self, limit: Option<i64>) -> Result<Vec<User>> {
        let mut tx = self.db.begin().await?;
        // rowid breaks ties between users created within the same millisecond
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, rowid DESC LIMIT ?"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit.unwrap_or(-1))
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(users)
    }

    #[instrument(skip(self))]
    pub async fn get_user_language(&mut self, telegram_id: i64) -> Result<Option<String>> {
        let mut tx = self.db.begin().await?;
        let lang = sqlx::query_scalar::<_, String>(
            "SELECT language_code FROM users WHERE telegram_id = ?",
        )
        .bind(telegram_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(lang)
    }

    /// Plain SQL text with a numbered parameter, no mapping beyond the scalar.
    /// SQLite's `:name` placeholders are not accepted by sqlx.
    #[instrument(skip(self))]
    pub async fn get_user_full_name(&mut self, telegram_id: i64) -> Result<Option<String>> {
        let mut tx = self.db.begin().await?;
        let name = sqlx::query_scalar::<_, String>(
            "SELECT full_name FROM users WHERE telegram_id = ?1",
        )
        .bind(telegram_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(name)
    }

    #[instrument(skip(self))]
    pub async fn add_order(&mut self, user_id: i64) -> Result<Order> {
        let mut tx = self.db.begin().await?;
        let sql = format!("INSERT INTO orders (user_id) VALUES (?) RETURNING {ORDER_COLUMNS}");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("failed to add order for user {user_id}"))?;
        tx.commit().await?;
        Ok(order)
    }

    #[instrument(skip(self, description))]
    pub async fn add_product(
        &mut self,
        title: &str,
        price: Decimal,
        description: Option<&str>,
    ) -> Result<Product> {
        let mut tx = self.db.begin().await?;
        let sql = format!(
            "INSERT INTO products (title, description, price) VALUES (?, ?, ?) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(title)
            .bind(description)
            .bind(price.normalize().to_string())
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("failed to add product {title:?}"))?;
        tx.commit().await?;
        Ok(product)
    }

    /// Link a product to an order. A second link for the same pair is ignored.
    #[instrument(skip(self))]
    pub async fn add_product_to_order(
        &mut self,
        product_id: i64,
        order_id: i64,
        quantity: i64,
    ) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let res = sqlx::query(
            "INSERT INTO order_products (order_id, product_id, quantity) VALUES (?, ?, ?) \
             ON CONFLICT (order_id, product_id) DO NOTHING",
        )
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to add product {product_id} to order {order_id}"))?;
        tx.commit().await?;
        if res.rows_affected() == 0 {
            debug!(order_id, product_id, "product already linked to order");
        }
        Ok(())
    }

    /// Every (referrer, invited user) pair, by full name.
    #[instrument(skip(self))]
    pub async fn select_all_invited_users(&mut self) -> Result<Vec<InvitedUser>> {
        let mut tx = self.db.begin().await?;
        let pairs = sqlx::query_as::<_, InvitedUser>(
            "SELECT parent.full_name AS referrer_name, child.full_name AS invited_name \
             FROM users child \
             JOIN users parent ON parent.telegram_id = child.referrer_id \
             ORDER BY child.created_at, child.rowid",
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(pairs)
    }

    #[instrument(skip(self))]
    pub async fn get_all_user_orders(&mut self, telegram_id: i64) -> Result<Vec<UserOrderLine>> {
        let mut tx = self.db.begin().await?;
        let rows = sqlx::query(
            "SELECT p.product_id, p.title, p.description, p.price, \
                    p.created_at AS product_created_at, p.updated_at AS product_updated_at, \
                    o.order_id, o.user_id, \
                    o.created_at AS order_created_at, o.updated_at AS order_updated_at, \
                    u.username, op.quantity \
             FROM products p \
             JOIN order_products op ON op.product_id = p.product_id \
             JOIN orders o ON o.order_id = op.order_id \
             JOIN users u ON u.telegram_id = o.user_id \
             WHERE u.telegram_id = ? \
             ORDER BY o.order_id, p.product_id",
        )
        .bind(telegram_id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        rows.iter()
            .map(order_line_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to decode order lines")
    }

    /// Number of orders placed by the user; zero when there are none.
    #[instrument(skip(self))]
    pub async fn get_total_of_orders(&mut self, telegram_id: i64) -> Result<i64> {
        let mut tx = self.db.begin().await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?")
            .bind(telegram_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(total)
    }

    #[instrument(skip(self))]
    pub async fn get_total_of_orders_per_user(&mut self) -> Result<Vec<OrdersPerUser>> {
        let mut tx = self.db.begin().await?;
        let rows = sqlx::query_as::<_, OrdersPerUser>(
            "SELECT COUNT(o.order_id) AS total, u.full_name \
             FROM orders o \
             JOIN users u ON u.telegram_id = o.user_id \
             GROUP BY u.telegram_id, u.full_name \
             ORDER BY total DESC, u.full_name",
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn get_total_of_ordered_products_per_user(
        &mut self,
    ) -> Result<Vec<ProductsPerUser>> {
        let mut tx = self.db.begin().await?;
        let rows = sqlx::query_as::<_, ProductsPerUser>(
            "SELECT SUM(op.quantity) AS quantity_sum, u.full_name \
             FROM order_products op \
             JOIN orders o ON o.order_id = op.order_id \
             JOIN users u ON u.telegram_id = o.user_id \
             GROUP BY u.telegram_id, u.full_name \
             ORDER BY quantity_sum DESC, u.full_name",
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// Clear users, orders and products. Order links go with their orders.
    #[instrument(skip(self))]
    pub async fn delete_records(&mut self) -> Result<()> {
        let mut tx = self.db.begin().await?;
        // users first so their orders are detached, then orders so no link
        // still restricts a product
        for table in ["users", "orders", "products"] {
            let res = sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to clear {table}"))?;
            debug!(table, rows = res.rows_affected(), "cleared");
        }
        tx.commit().await?;
        Ok(())
    }
}

fn order_line_from_row(row: &SqliteRow) -> Result<UserOrderLine, sqlx::Error> {
    let price: String = row.try_get("price")?;
    let price = Decimal::from_str(&price).map_err(|e| sqlx::Error::ColumnDecode {
        index: "price".into(),
        source: Box::new(e),
    })?;
    let product = Product {
        product_id: row.try_get("product_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price,
        timestamps: Timestamps {
            created_at: row.try_get("product_created_at")?,
            updated_at: row.try_get("product_updated_at")?,
        },
    };
    let order = Order {
        order_id: row.try_get("order_id")?,
        user_id: row.try_get("user_id")?,
        timestamps: Timestamps {
            created_at: row.try_get("order_created_at")?,
            updated_at: row.try_get("order_updated_at")?,
        },
    };
    Ok(UserOrderLine {
        product,
        order,
        username: row.try_get("username")?,
        quantity: row.try_get("quantity")?,
    })
}
