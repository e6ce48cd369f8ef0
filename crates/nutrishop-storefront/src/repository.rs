//! Storage seam behind [`crate::CartStore`].

use nutrishop_core::{CartLine, Owner};
use nutrishop_db::NewOrder;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CartError;

/// Cart persistence. Every method is scoped to one owner, except the merge,
/// which moves rows between two.
pub trait CartRepository: Send + Sync {
    /// Lines for `owner`, ordered by creation time.
    async fn list_lines(&self, owner: &Owner) -> Result<Vec<CartLine>, CartError>;

    /// Atomic upsert: increments the `(owner, product_id)` row or inserts it.
    async fn add_quantity(
        &self,
        owner: &Owner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), CartError>;

    async fn set_quantity(&self, owner: &Owner, item_id: Uuid, quantity: i32)
        -> Result<(), CartError>;

    async fn delete_item(&self, owner: &Owner, item_id: Uuid) -> Result<(), CartError>;

    async fn delete_all(&self, owner: &Owner) -> Result<(), CartError>;

    /// Moves every guest row of `session_id` into `user_id`'s cart, summing
    /// quantities of overlapping products. Must be atomic.
    async fn merge_guest_cart(&self, session_id: &str, user_id: Uuid) -> Result<(), CartError>;

    /// Records a paid order and returns its id.
    async fn create_order(&self, order: &NewOrder) -> Result<Uuid, CartError>;
}

/// [`CartRepository`] over the nutrishop Postgres schema.
#[derive(Debug, Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for PgCartRepository {
    async fn list_lines(&self, owner: &Owner) -> Result<Vec<CartLine>, CartError> {
        Ok(nutrishop_db::list_cart_lines(&self.pool, owner).await?)
    }

    async fn add_quantity(
        &self,
        owner: &Owner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), CartError> {
        nutrishop_db::add_cart_quantity(&self.pool, owner, product_id, quantity).await?;
        Ok(())
    }

    async fn set_quantity(
        &self,
        owner: &Owner,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<(), CartError> {
        nutrishop_db::set_cart_item_quantity(&self.pool, owner, item_id, quantity).await?;
        Ok(())
    }

    async fn delete_item(&self, owner: &Owner, item_id: Uuid) -> Result<(), CartError> {
        nutrishop_db::delete_cart_item(&self.pool, owner, item_id).await?;
        Ok(())
    }

    async fn delete_all(&self, owner: &Owner) -> Result<(), CartError> {
        nutrishop_db::clear_cart(&self.pool, owner).await?;
        Ok(())
    }

    async fn merge_guest_cart(&self, session_id: &str, user_id: Uuid) -> Result<(), CartError> {
        nutrishop_db::merge_guest_cart(&self.pool, session_id, user_id).await?;
        Ok(())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Uuid, CartError> {
        Ok(nutrishop_db::create_order(&self.pool, order).await?)
    }
}
