use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::{
    domain::{FruitOption, Order, OrderId},
    protocol::{OrderVerification, StoredOrder},
};

/// Handle on the warehouse that holds the reference table and the orders.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Reads the whole reference table, projecting only the display name and
    /// the lookup key. Callers load it once per render and keep no copy
    /// between renders.
    pub async fn load_fruit_options(&self) -> Result<Vec<FruitOption>> {
        let rows = sqlx::query("SELECT fruit_name, search_on FROM fruit_options ORDER BY fruit_id")
            .fetch_all(&self.pool)
            .await
            .context("failed to load fruit options")?;
        let options = rows
            .into_iter()
            .map(|row| FruitOption {
                name: row.get::<String, _>("fruit_name"),
                search_key: row.get::<String, _>("search_on"),
            })
            .collect::<Vec<_>>();
        debug!(count = options.len(), "loaded fruit options");
        Ok(options)
    }

    pub async fn upsert_fruit_option(&self, name: &str, search_key: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO fruit_options (fruit_name, search_on) VALUES (?, ?)
             ON CONFLICT(fruit_name) DO UPDATE SET search_on = excluded.search_on",
        )
        .bind(name)
        .bind(search_key)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert fruit option '{name}'"))?;
        Ok(())
    }

    /// Writes one order row with a single parameterized statement.
    pub async fn insert_order(&self, order: &Order) -> Result<OrderId> {
        let rec = sqlx::query(
            "INSERT INTO orders (ingredients, name_on_order) VALUES (?, ?) RETURNING order_uid",
        )
        .bind(&order.ingredients)
        .bind(&order.name_on_order)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert order")?;
        Ok(OrderId(rec.get::<i64, _>(0)))
    }

    /// Re-reads every order placed under `name_on_order` together with hashes
    /// of the upper-cased, trimmed columns so a caller can confirm what was
    /// actually stored.
    pub async fn verify_orders(&self, name_on_order: &str) -> Result<Vec<OrderVerification>> {
        let rows = sqlx::query(
            r#"
            SELECT ingredients,
                   UPPER(TRIM(ingredients))   AS ingredients_key,
                   UPPER(TRIM(name_on_order)) AS name_key
            FROM orders
            WHERE name_on_order = ?
            ORDER BY order_uid
            "#,
        )
        .bind(name_on_order)
        .fetch_all(&self.pool)
        .await
        .context("failed to run order verification query")?;

        rows.into_iter()
            .map(|row| -> Result<OrderVerification, sqlx::Error> {
                Ok(OrderVerification {
                    ingredients: row.try_get("ingredients")?,
                    ingredients_hash: hash_hex(&row.try_get::<String, _>("ingredients_key")?),
                    name_hash: hash_hex(&row.try_get::<String, _>("name_key")?),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .context("failed to decode order verification row")
    }

    /// Newest orders first.
    pub async fn list_orders(&self, limit: u32) -> Result<Vec<StoredOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT order_uid, ingredients, name_on_order, order_ts
            FROM orders
            ORDER BY order_uid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("failed to list orders")?;

        rows.into_iter()
            .map(|row| -> Result<StoredOrder, sqlx::Error> {
                Ok(StoredOrder {
                    order_id: OrderId(row.try_get("order_uid")?),
                    ingredients: row.try_get("ingredients")?,
                    name_on_order: row.try_get("name_on_order")?,
                    created_at: row.try_get::<NaiveDateTime, _>("order_ts")?.and_utc(),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .context("failed to decode stored order row")
    }
}

fn hash_hex(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
