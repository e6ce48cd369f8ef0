//! In-memory [`CartRepository`] with the same semantics as the Postgres one,
//! including the per-owner uniqueness of `(owner, product_id)`.

use std::collections::HashMap;

use chrono::Utc;
use nutrishop_core::{CartItem, CartLine, Owner, Product};
use nutrishop_db::NewOrder;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::CartError;
use crate::repository::CartRepository;

#[derive(Debug, Default)]
struct State {
    items: Vec<CartItem>,
    products: HashMap<Uuid, Product>,
    orders: Vec<(Uuid, NewOrder)>,
    fail_reads: bool,
    fail_writes: bool,
}

impl State {
    fn check_writable(&self) -> Result<(), CartError> {
        if self.fail_writes {
            return Err(CartError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCartRepository {
    state: Mutex<State>,
}

impl MemoryCartRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Simulates a product being deleted from the catalog while still in carts.
    pub async fn remove_product(&self, product_id: Uuid) {
        self.state.lock().await.products.remove(&product_id);
    }

    pub async fn set_fail_reads(&self, fail: bool) {
        self.state.lock().await.fail_reads = fail;
    }

    pub async fn set_fail_writes(&self, fail: bool) {
        self.state.lock().await.fail_writes = fail;
    }

    /// Raw rows for `owner`, bypassing the read-failure switch.
    pub async fn rows_for(&self, owner: &Owner) -> Vec<CartItem> {
        let state = self.state.lock().await;
        state
            .items
            .iter()
            .filter(|item| &item.owner == owner)
            .cloned()
            .collect()
    }

    pub async fn orders(&self) -> Vec<(Uuid, NewOrder)> {
        self.state.lock().await.orders.clone()
    }
}

impl CartRepository for MemoryCartRepository {
    async fn list_lines(&self, owner: &Owner) -> Result<Vec<CartLine>, CartError> {
        let state = self.state.lock().await;
        if state.fail_reads {
            return Err(CartError::Unavailable("reads disabled".to_string()));
        }
        let mut items: Vec<CartItem> = state
            .items
            .iter()
            .filter(|item| &item.owner == owner)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items
            .into_iter()
            .map(|item| CartLine {
                product: state.products.get(&item.product_id).cloned(),
                item,
            })
            .collect())
    }

    async fn add_quantity(
        &self,
        owner: &Owner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), CartError> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let now = Utc::now();
        if let Some(existing) = state
            .items
            .iter_mut()
            .find(|item| &item.owner == owner && item.product_id == product_id)
        {
            existing.quantity += quantity;
            existing.updated_at = now;
        } else {
            state.items.push(CartItem {
                id: Uuid::new_v4(),
                owner: owner.clone(),
                product_id,
                quantity,
                created_at: now,
                updated_at: now,
            });
        }
        Ok(())
    }

    async fn set_quantity(
        &self,
        owner: &Owner,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<(), CartError> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == item_id && &item.owner == owner)
            .ok_or(CartError::Db(nutrishop_db::DbError::NotFound))?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_item(&self, owner: &Owner, item_id: Uuid) -> Result<(), CartError> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        state
            .items
            .retain(|item| !(item.id == item_id && &item.owner == owner));
        Ok(())
    }

    async fn delete_all(&self, owner: &Owner) -> Result<(), CartError> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        state.items.retain(|item| &item.owner != owner);
        Ok(())
    }

    async fn merge_guest_cart(&self, session_id: &str, user_id: Uuid) -> Result<(), CartError> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        let guest = Owner::Guest(session_id.to_string());
        let user = Owner::User(user_id);
        let (moved, kept): (Vec<CartItem>, Vec<CartItem>) = std::mem::take(&mut state.items)
            .into_iter()
            .partition(|item| item.owner == guest);
        state.items = kept;

        let now = Utc::now();
        for guest_item in moved {
            if let Some(existing) = state
                .items
                .iter_mut()
                .find(|item| item.owner == user && item.product_id == guest_item.product_id)
            {
                existing.quantity += guest_item.quantity;
                existing.updated_at = now;
            } else {
                state.items.push(CartItem {
                    id: Uuid::new_v4(),
                    owner: user.clone(),
                    product_id: guest_item.product_id,
                    quantity: guest_item.quantity,
                    created_at: now,
                    updated_at: now,
                });
            }
        }
        Ok(())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Uuid, CartError> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        if let Some((id, _)) = state
            .orders
            .iter()
            .find(|(_, existing)| existing.stripe_payment_id == order.stripe_payment_id)
        {
            return Ok(*id);
        }
        let id = Uuid::new_v4();
        state.orders.push((id, order.clone()));
        Ok(id)
    }
}
