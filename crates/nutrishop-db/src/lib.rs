//! Postgres access for the storefront: carts, catalog sync state, discount
//! codes, profiles and orders.
//!
//! Every query takes a `&PgPool`; transactional operations open their own
//! transaction. Schema lives in `<workspace>/migrations/`.

pub mod cart;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod profiles;

pub use cart::{
    add_cart_quantity, clear_cart, delete_cart_item, list_cart_lines, merge_guest_cart,
    set_cart_item_quantity, CartLineRow,
};
pub use discounts::{
    get_discount_by_code, get_discount_by_id, list_discounts, set_stripe_coupon_id_if_unset,
    DiscountRow,
};
pub use orders::{
    create_order, get_order, list_order_items, list_orders, update_order_status, NewOrder,
    NewOrderItem, OrderItemRow, OrderRow, ORDER_STATUSES,
};
pub use products::{
    get_product, mark_product_sync_failed, mark_product_sync_started, mark_product_synced,
    ProductRow,
};
pub use profiles::{get_user_profile, set_stripe_customer_id, UserProfileRow};

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

// Relative to this crate's manifest.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Stored procedure the sign-in merge depends on.
const MERGE_PROCEDURE: &str = "merge_guest_cart_to_user(text, uuid)";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("invalid row: {0}")]
    InvalidRow(#[from] nutrishop_core::CoreError),
    #[error("schema is missing {0}; run migrations")]
    SchemaOutdated(&'static str),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool sizing, normally taken from [`nutrishop_core::AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &nutrishop_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections.min(config.db_max_connections),
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
        }
    }
}

/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await?;
    tracing::debug!(
        max_connections = config.max_connections,
        "postgres pool connected"
    );
    Ok(pool)
}

/// Applies pending migrations and returns how many ran.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if a migration fails; earlier
/// migrations in the same run stay applied.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let after = applied_migrations(pool).await;

    let applied = after.saturating_sub(before);
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }
    Ok(applied)
}

/// Zero on a fresh database, where `_sqlx_migrations` does not exist yet.
async fn applied_migrations(pool: &PgPool) -> usize {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
        .ok()
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or(0)
}

/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Pings the database and checks that the cart merge procedure is installed.
///
/// # Errors
///
/// [`DbError::Sqlx`] if the database is unreachable;
/// [`DbError::SchemaOutdated`] if migrations have not been run.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    let installed: bool = sqlx::query_scalar("SELECT to_regprocedure($1) IS NOT NULL")
        .bind(MERGE_PROCEDURE)
        .fetch_one(pool)
        .await?;
    if !installed {
        return Err(DbError::SchemaOutdated(MERGE_PROCEDURE));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_is_small() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
    }
}
