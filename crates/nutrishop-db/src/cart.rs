//! Database operations for `cart_items`, including the guest-to-user merge.

use chrono::{DateTime, Utc};
use nutrishop_core::{CartItem, CartLine, Owner, Product, SubscriptionInterval};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A `cart_items` row left-joined with its product. Product columns are
/// prefixed `p_` and all nullable because of the outer join.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLineRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub p_id: Option<Uuid>,
    pub p_name: Option<String>,
    pub p_slug: Option<String>,
    pub p_description: Option<String>,
    pub p_price: Option<Decimal>,
    pub p_image_url: Option<String>,
    pub p_stock_quantity: Option<i32>,
    pub p_is_featured: Option<bool>,
    pub p_is_top_selling: Option<bool>,
    pub p_is_subscription: Option<bool>,
    pub p_subscription_interval: Option<String>,
    pub p_subscription_interval_count: Option<i32>,
    pub p_stripe_product_id: Option<String>,
    pub p_stripe_price_id: Option<String>,
    pub p_created_at: Option<DateTime<Utc>>,
}

impl CartLineRow {
    /// Converts the flat row into a [`CartLine`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if the owner columns violate the
    /// single-owner invariant.
    pub fn into_line(self) -> Result<CartLine, DbError> {
        let product = match (self.p_id, self.p_name, self.p_slug, self.p_price, self.p_created_at) {
            (Some(id), Some(name), Some(slug), Some(price), Some(created_at)) => Some(Product {
                id,
                name,
                slug,
                description: self.p_description,
                price,
                image_url: self.p_image_url,
                stock_quantity: self.p_stock_quantity.unwrap_or(0),
                is_featured: self.p_is_featured.unwrap_or(false),
                is_top_selling: self.p_is_top_selling.unwrap_or(false),
                is_subscription: self.p_is_subscription.unwrap_or(false),
                subscription_interval: self
                    .p_subscription_interval
                    .as_deref()
                    .and_then(SubscriptionInterval::parse),
                subscription_interval_count: self.p_subscription_interval_count,
                stripe_product_id: self.p_stripe_product_id,
                stripe_price_id: self.p_stripe_price_id,
                created_at,
            }),
            _ => None,
        };

        let item = CartItem::from_row_parts(
            self.id,
            self.user_id,
            self.session_id,
            self.product_id,
            self.quantity,
            self.created_at,
            self.updated_at,
        )?;

        Ok(CartLine { item, product })
    }
}

const CART_LINE_SELECT: &str = "SELECT ci.id, ci.user_id, ci.session_id, ci.product_id, ci.quantity, \
            ci.created_at, ci.updated_at, \
            p.id AS p_id, p.name AS p_name, p.slug AS p_slug, \
            p.description AS p_description, p.price AS p_price, \
            p.image_url AS p_image_url, p.stock_quantity AS p_stock_quantity, \
            p.is_featured AS p_is_featured, p.is_top_selling AS p_is_top_selling, \
            p.is_subscription AS p_is_subscription, \
            p.subscription_interval AS p_subscription_interval, \
            p.subscription_interval_count AS p_subscription_interval_count, \
            p.stripe_product_id AS p_stripe_product_id, \
            p.stripe_price_id AS p_stripe_price_id, p.created_at AS p_created_at \
     FROM cart_items ci \
     LEFT JOIN products p ON p.id = ci.product_id";

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Lists an owner's cart lines, oldest first.
///
/// Guest lookups also require `user_id IS NULL` so rows that were merged
/// can never reappear under the session.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// for a row that violates the owner invariant.
pub async fn list_cart_lines(pool: &PgPool, owner: &Owner) -> Result<Vec<CartLine>, DbError> {
    let rows = match owner {
        Owner::User(user_id) => {
            let sql = format!(
                "{CART_LINE_SELECT} WHERE ci.user_id = $1 ORDER BY ci.created_at ASC, ci.id ASC"
            );
            sqlx::query_as::<_, CartLineRow>(&sql)
                .bind(user_id)
                .fetch_all(pool)
                .await?
        }
        Owner::Guest(session_id) => {
            let sql = format!(
                "{CART_LINE_SELECT} WHERE ci.session_id = $1 AND ci.user_id IS NULL \
                 ORDER BY ci.created_at ASC, ci.id ASC"
            );
            sqlx::query_as::<_, CartLineRow>(&sql)
                .bind(session_id)
                .fetch_all(pool)
                .await?
        }
    };

    rows.into_iter().map(CartLineRow::into_line).collect()
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Adds `quantity` of a product to the owner's cart.
///
/// A single upsert against the per-owner partial unique index: an existing
/// row for `(owner, product_id)` is incremented, otherwise a row is inserted.
/// Guest upserts hold the session's merge lock, so they land either wholly
/// before a concurrent [`merge_guest_cart`] or after it. Returns the id of
/// the affected row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails (including a
/// `quantity > 0` check violation).
pub async fn add_cart_quantity(
    pool: &PgPool,
    owner: &Owner,
    product_id: Uuid,
    quantity: i32,
) -> Result<Uuid, DbError> {
    let id = match owner {
        Owner::User(user_id) => {
            sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO cart_items (user_id, product_id, quantity) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (user_id, product_id) WHERE user_id IS NOT NULL DO UPDATE SET \
                     quantity   = cart_items.quantity + EXCLUDED.quantity, \
                     updated_at = NOW() \
                 RETURNING id",
            )
            .bind(user_id)
            .bind(product_id)
            .bind(quantity)
            .fetch_one(pool)
            .await?
        }
        Owner::Guest(session_id) => {
            let mut tx = pool.begin().await?;
            lock_guest_session(&mut tx, session_id).await?;
            let id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO cart_items (session_id, product_id, quantity) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (session_id, product_id) WHERE user_id IS NULL DO UPDATE SET \
                     quantity   = cart_items.quantity + EXCLUDED.quantity, \
                     updated_at = NOW() \
                 RETURNING id",
            )
            .bind(session_id)
            .bind(product_id)
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            id
        }
    };

    Ok(id)
}

/// Sets the quantity of one of `owner`'s cart rows and bumps `updated_at`.
///
/// Callers handle the `quantity <= 0` → delete policy; this function only
/// writes positive quantities (the schema rejects anything else).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the owner has no row with this id.
pub async fn set_cart_item_quantity(
    pool: &PgPool,
    owner: &Owner,
    item_id: Uuid,
    quantity: i32,
) -> Result<(), DbError> {
    let result = match owner {
        Owner::User(user_id) => {
            sqlx::query(
                "UPDATE cart_items SET quantity = $2, updated_at = NOW() \
                 WHERE id = $1 AND user_id = $3",
            )
            .bind(item_id)
            .bind(quantity)
            .bind(user_id)
            .execute(pool)
            .await?
        }
        Owner::Guest(session_id) => {
            sqlx::query(
                "UPDATE cart_items SET quantity = $2, updated_at = NOW() \
                 WHERE id = $1 AND session_id = $3 AND user_id IS NULL",
            )
            .bind(item_id)
            .bind(quantity)
            .bind(session_id)
            .execute(pool)
            .await?
        }
    };

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Deletes one of `owner`'s cart rows. Deleting a row that is already gone
/// is not an error; returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_cart_item(pool: &PgPool, owner: &Owner, item_id: Uuid) -> Result<u64, DbError> {
    let result = match owner {
        Owner::User(user_id) => {
            sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
                .bind(item_id)
                .bind(user_id)
                .execute(pool)
                .await?
        }
        Owner::Guest(session_id) => {
            sqlx::query(
                "DELETE FROM cart_items WHERE id = $1 AND session_id = $2 AND user_id IS NULL",
            )
            .bind(item_id)
            .bind(session_id)
            .execute(pool)
            .await?
        }
    };

    Ok(result.rows_affected())
}

/// Deletes every row belonging to `owner`. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_cart(pool: &PgPool, owner: &Owner) -> Result<u64, DbError> {
    let result = match owner {
        Owner::User(user_id) => {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                .bind(user_id)
                .execute(pool)
                .await?
        }
        Owner::Guest(session_id) => {
            sqlx::query("DELETE FROM cart_items WHERE session_id = $1 AND user_id IS NULL")
                .bind(session_id)
                .execute(pool)
                .await?
        }
    };

    Ok(result.rows_affected())
}

/// Calls the `merge_guest_cart_to_user` database function.
///
/// The function takes the session's advisory lock, which serialises it
/// against other merges and against guest [`add_cart_quantity`] calls for
/// the same session. Other guest writes (quantity edits, deletes) do not
/// take the lock; they either hit a row before the merge moves it or find
/// it gone. Returns the number of user rows inserted or updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the call fails.
pub async fn merge_guest_cart(
    pool: &PgPool,
    session_id: &str,
    user_id: Uuid,
) -> Result<i32, DbError> {
    let merged = sqlx::query_scalar::<_, i32>("SELECT merge_guest_cart_to_user($1, $2)")
        .bind(session_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    tracing::info!(session_id, %user_id, merged, "merged guest cart into user cart");
    Ok(merged)
}

/// Transaction-scoped advisory lock shared with `merge_guest_cart_to_user`.
async fn lock_guest_session(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    session_id: &str,
) -> Result<(), DbError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext('cart_session:' || $1))")
        .bind(session_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
