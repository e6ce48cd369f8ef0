//! Read/write access to `user_profiles` for the payment path.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserProfileRow {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_profile(pool: &PgPool, id: Uuid) -> Result<Option<UserProfileRow>, DbError> {
    let row = sqlx::query_as::<_, UserProfileRow>(
        "SELECT id, full_name, phone, role, stripe_customer_id, created_at \
         FROM user_profiles \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Records the Stripe customer created for a user.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the profile does not exist.
pub async fn set_stripe_customer_id(
    pool: &PgPool,
    id: Uuid,
    customer_id: &str,
) -> Result<(), DbError> {
    let rows = sqlx::query("UPDATE user_profiles SET stripe_customer_id = $2 WHERE id = $1")
        .bind(id)
        .bind(customer_id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
