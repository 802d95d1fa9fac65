//! `PostgreSQL` cart persistence.
//!
//! # Tables
//!
//! - `storefront.cart_snapshot` - one row per identity key holding the
//!   JSON-serialized cart lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and applied with
//! [`migrate`].

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::cart::{CartPersistence, PersistenceError};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Cart snapshots stored in `storefront.cart_snapshot`.
#[derive(Debug, Clone)]
pub struct PgCartPersistence {
    pool: PgPool,
}

impl PgCartPersistence {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CartPersistence for PgCartPersistence {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let items = sqlx::query_scalar::<_, String>(
            "SELECT items FROM storefront.cart_snapshot WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(items)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        sqlx::query(
            r"
            INSERT INTO storefront.cart_snapshot (key, items, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
            SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM storefront.cart_snapshot WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
