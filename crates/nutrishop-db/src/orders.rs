//! Database operations for `orders` and `order_items`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Values accepted by the `orders.status` check constraint.
pub const ORDER_STATUSES: &[&str] = &["pending", "processing", "shipped", "delivered", "cancelled"];

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub shipping_address: serde_json::Value,
    pub total_amount: Decimal,
    pub discount_code: Option<String>,
    pub status: String,
    pub stripe_payment_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_time: Decimal,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_time: Decimal,
}

/// Everything needed to record a paid order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: Option<Uuid>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub shipping_address: serde_json::Value,
    pub total_amount: Decimal,
    pub discount_code: Option<String>,
    pub stripe_payment_id: String,
    pub items: Vec<NewOrderItem>,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts an order and its items, and bumps the discount's redemption
/// count, in one transaction.
///
/// Idempotent on `stripe_payment_id`: recording the same payment twice
/// returns the existing order id without inserting items or counting the
/// redemption again.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the transaction is
/// rolled back.
pub async fn create_order(pool: &PgPool, order: &NewOrder) -> Result<Uuid, DbError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO orders \
             (user_id, customer_email, customer_name, customer_phone, shipping_address, \
              total_amount, discount_code, stripe_payment_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (stripe_payment_id) DO NOTHING \
         RETURNING id",
    )
    .bind(order.user_id)
    .bind(&order.customer_email)
    .bind(&order.customer_name)
    .bind(order.customer_phone.as_deref())
    .bind(&order.shipping_address)
    .bind(order.total_amount)
    .bind(order.discount_code.as_deref())
    .bind(&order.stripe_payment_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(order_id) = inserted else {
        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM orders WHERE stripe_payment_id = $1",
        )
        .bind(&order.stripe_payment_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(
            order_id = %existing,
            stripe_payment_id = %order.stripe_payment_id,
            "order already recorded for payment"
        );
        return Ok(existing);
    };

    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price_at_time) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price_at_time)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(code) = order.discount_code.as_deref() {
        sqlx::query(
            "UPDATE discount_codes \
             SET redemptions_count = redemptions_count + 1 \
             WHERE code = $1",
        )
        .bind(nutrishop_core::DiscountCode::normalize(code))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(order_id)
}

/// Sets an order's status. `status` must be one of [`ORDER_STATUSES`];
/// the check constraint rejects anything else.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist.
pub async fn update_order_status(pool: &PgPool, id: Uuid, status: &str) -> Result<(), DbError> {
    let rows = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Lists orders newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders(
    pool: &PgPool,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<OrderRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, customer_email, customer_name, customer_phone, shipping_address, \
                total_amount, discount_code, status, stripe_payment_id, created_at \
         FROM orders \
         WHERE ($1::TEXT IS NULL OR status = $1) \
         ORDER BY created_at DESC \
         LIMIT $2",
    )
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_order(pool: &PgPool, id: Uuid) -> Result<Option<OrderRow>, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, customer_email, customer_name, customer_phone, shipping_address, \
                total_amount, discount_code, status, stripe_payment_id, created_at \
         FROM orders \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_order_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItemRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, quantity, price_at_time \
         FROM order_items \
         WHERE order_id = $1 \
         ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
