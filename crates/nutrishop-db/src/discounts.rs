//! Database operations for `discount_codes`.

use chrono::{DateTime, Utc};
use nutrishop_core::{CouponDuration, DiscountCode, DiscountKind};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `discount_codes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscountRow {
    pub id: Uuid,
    pub code: String,
    /// `percentage` or `fixed_amount` (`CHECK` constraint).
    pub discount_type: String,
    pub discount_value: Decimal,
    /// `once`, `repeating`, or `forever` (`CHECK` constraint).
    pub duration: String,
    pub duration_in_months: Option<i32>,
    pub is_active: bool,
    pub max_redemptions: Option<i32>,
    pub redemptions_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub stripe_coupon_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DiscountRow> for DiscountCode {
    type Error = DbError;

    fn try_from(row: DiscountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            code: row.code,
            discount_type: row.discount_type.parse::<DiscountKind>()?,
            discount_value: row.discount_value,
            duration: row.duration.parse::<CouponDuration>()?,
            duration_in_months: row.duration_in_months,
            is_active: row.is_active,
            max_redemptions: row.max_redemptions,
            redemptions_count: row.redemptions_count,
            expires_at: row.expires_at,
            stripe_coupon_id: row.stripe_coupon_id,
            created_at: row.created_at,
        })
    }
}

const DISCOUNT_COLUMNS: &str = "id, code, discount_type, discount_value, duration, \
     duration_in_months, is_active, max_redemptions, redemptions_count, expires_at, \
     stripe_coupon_id, created_at";

/// Returns all discount codes, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_discounts(pool: &PgPool) -> Result<Vec<DiscountRow>, DbError> {
    let sql = format!("SELECT {DISCOUNT_COLUMNS} FROM discount_codes ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, DiscountRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Looks a code up by its normalized (trimmed, upper-cased) form.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_discount_by_code(pool: &PgPool, code: &str) -> Result<Option<DiscountRow>, DbError> {
    let sql = format!("SELECT {DISCOUNT_COLUMNS} FROM discount_codes WHERE code = $1");
    let row = sqlx::query_as::<_, DiscountRow>(&sql)
        .bind(DiscountCode::normalize(code))
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_discount_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DiscountRow>, DbError> {
    let sql = format!("SELECT {DISCOUNT_COLUMNS} FROM discount_codes WHERE id = $1");
    let row = sqlx::query_as::<_, DiscountRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Stores `coupon_id` only if the discount has none yet.
///
/// Returns `true` when this call claimed the slot, `false` when another
/// sync got there first (or the row does not exist).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_stripe_coupon_id_if_unset(
    pool: &PgPool,
    id: Uuid,
    coupon_id: &str,
) -> Result<bool, DbError> {
    let rows = sqlx::query(
        "UPDATE discount_codes \
         SET stripe_coupon_id = $2 \
         WHERE id = $1 AND stripe_coupon_id IS NULL",
    )
    .bind(id)
    .bind(coupon_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows == 1)
}
