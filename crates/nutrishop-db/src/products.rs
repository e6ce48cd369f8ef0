//! Database operations for `products`, limited to what the cart and the
//! Stripe sync need.

use chrono::{DateTime, Utc};
use nutrishop_core::{Product, SubscriptionInterval, SyncStatus};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub is_featured: bool,
    pub is_top_selling: bool,
    pub is_subscription: bool,
    /// One of `day`, `week`, `month`, `year` (`CHECK` constraint).
    pub subscription_interval: Option<String>,
    pub subscription_interval_count: Option<i32>,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_sync_status: Option<String>,
    pub stripe_sync_error: Option<String>,
    pub stripe_last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ProductRow {
    #[must_use]
    pub fn into_product(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
            stock_quantity: self.stock_quantity,
            is_featured: self.is_featured,
            is_top_selling: self.is_top_selling,
            is_subscription: self.is_subscription,
            subscription_interval: self
                .subscription_interval
                .as_deref()
                .and_then(SubscriptionInterval::parse),
            subscription_interval_count: self.subscription_interval_count,
            stripe_product_id: self.stripe_product_id,
            stripe_price_id: self.stripe_price_id,
            created_at: self.created_at,
        }
    }
}

/// Fetches a product by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, slug, description, price, image_url, stock_quantity, \
                is_featured, is_top_selling, is_subscription, subscription_interval, \
                subscription_interval_count, stripe_product_id, stripe_price_id, \
                stripe_sync_status, stripe_sync_error, stripe_last_synced_at, created_at \
         FROM products \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Sets `stripe_sync_status = 'syncing'` and clears the previous error.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has this id.
pub async fn mark_product_sync_started(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let rows = sqlx::query(
        "UPDATE products \
         SET stripe_sync_status = $2, stripe_sync_error = NULL \
         WHERE id = $1",
    )
    .bind(id)
    .bind(SyncStatus::Syncing.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Records the Stripe ids produced by a successful sync.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has this id.
pub async fn mark_product_synced(
    pool: &PgPool,
    id: Uuid,
    stripe_product_id: &str,
    stripe_price_id: &str,
) -> Result<(), DbError> {
    let rows = sqlx::query(
        "UPDATE products \
         SET stripe_product_id     = $2, \
             stripe_price_id       = $3, \
             stripe_sync_status    = $4, \
             stripe_sync_error     = NULL, \
             stripe_last_synced_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(stripe_product_id)
    .bind(stripe_price_id)
    .bind(SyncStatus::Synced.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Stores a sync failure message so the admin can see it and re-trigger.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_product_sync_failed(pool: &PgPool, id: Uuid, message: &str) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE products \
         SET stripe_sync_status = $2, stripe_sync_error = $3 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(SyncStatus::Error.as_str())
    .bind(message)
    .execute(pool)
    .await?;

    Ok(())
}
