//! Client-side cart state for one owner.
//!
//! The store holds the owner explicitly and caches the last fetched lines.
//! Reads fail open (an unreachable backend shows an empty cart); writes fail
//! closed (the error is returned and nothing is silently dropped). After
//! every successful write the whole cart is re-fetched and that snapshot
//! replaces the cache.

use nutrishop_core::{cart_subtotal, CartLine, Owner, PaymentItem};
use nutrishop_db::NewOrder;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::checkout::{CompletedCheckout, ContactDetails};
use crate::error::CartError;
use crate::repository::CartRepository;
use crate::session::{SessionResolver, SessionStore};

pub struct CartStore<R, S> {
    repository: R,
    sessions: SessionResolver<S>,
    owner: Owner,
    lines: Vec<CartLine>,
}

impl<R: CartRepository, S: SessionStore> CartStore<R, S> {
    /// Creates a store for `user`, or for the current guest session when
    /// nobody is signed in. The cart is not loaded until [`Self::fetch_cart`].
    pub fn new(repository: R, sessions: SessionResolver<S>, user: Option<Uuid>) -> Self {
        let owner = match user {
            Some(user_id) => Owner::User(user_id),
            None => Owner::Guest(sessions.session_id()),
        };
        Self {
            repository,
            sessions,
            owner,
            lines: Vec::new(),
        }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn sessions(&self) -> &SessionResolver<S> {
        &self.sessions
    }

    /// Reloads the cart. A failure is logged and leaves an empty cart.
    pub async fn fetch_cart(&mut self) {
        match self.repository.list_lines(&self.owner).await {
            Ok(lines) => self.lines = lines,
            Err(e) => {
                tracing::warn!(owner = %self.owner, error = %e, "failed to fetch cart");
                self.lines = Vec::new();
            }
        }
    }

    /// Adds `quantity` of a product, merging into an existing line.
    ///
    /// # Errors
    ///
    /// [`CartError::InvalidQuantity`] for `quantity < 1` (storage is not
    /// touched), or the repository error.
    pub async fn add_to_cart(&mut self, product_id: Uuid, quantity: i32) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        self.repository
            .add_quantity(&self.owner, product_id, quantity)
            .await?;
        tracing::debug!(owner = %self.owner, %product_id, quantity, "added to cart");
        self.fetch_cart().await;
        Ok(())
    }

    /// [`Self::add_to_cart`] with a quantity of one.
    ///
    /// # Errors
    ///
    /// The repository error.
    pub async fn add_one(&mut self, product_id: Uuid) -> Result<(), CartError> {
        self.add_to_cart(product_id, 1).await
    }

    /// Sets a line's quantity; zero or less removes the line.
    ///
    /// # Errors
    ///
    /// The repository error.
    pub async fn update_quantity(&mut self, item_id: Uuid, quantity: i32) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_from_cart(item_id).await;
        }
        self.repository
            .set_quantity(&self.owner, item_id, quantity)
            .await?;
        self.fetch_cart().await;
        Ok(())
    }

    /// # Errors
    ///
    /// The repository error.
    pub async fn remove_from_cart(&mut self, item_id: Uuid) -> Result<(), CartError> {
        self.repository.delete_item(&self.owner, item_id).await?;
        self.fetch_cart().await;
        Ok(())
    }

    /// # Errors
    ///
    /// The repository error.
    pub async fn clear_cart(&mut self) -> Result<(), CartError> {
        self.repository.delete_all(&self.owner).await?;
        self.fetch_cart().await;
        Ok(())
    }

    #[must_use]
    pub fn total_items(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| i64::from(line.item.quantity))
            .sum()
    }

    /// Σ price × quantity, skipping lines whose product no longer exists.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        cart_subtotal(&self.lines)
    }

    /// The `{productId, quantity}` list sent with a payment intent. Lines
    /// without a product are not payable and are left out.
    #[must_use]
    pub fn payable_items(&self) -> Vec<PaymentItem> {
        self.lines
            .iter()
            .filter(|line| line.product.is_some())
            .map(|line| PaymentItem {
                product_id: line.item.product_id,
                quantity: line.item.quantity,
            })
            .collect()
    }

    /// Switches the store to `user_id`, merging the guest cart first.
    ///
    /// On a merge failure the store is unchanged (still the guest, session
    /// identifier kept) and the error is returned so the caller can retry.
    ///
    /// # Errors
    ///
    /// The repository error from the merge.
    pub async fn sign_in(&mut self, user_id: Uuid) -> Result<(), CartError> {
        if let Owner::Guest(session_id) = &self.owner {
            self.repository.merge_guest_cart(session_id, user_id).await?;
            tracing::info!(%session_id, %user_id, "guest cart merged on sign-in");
            self.sessions.clear();
        }
        self.owner = Owner::User(user_id);
        self.fetch_cart().await;
        Ok(())
    }

    /// Switches back to an anonymous cart with a fresh session.
    pub async fn sign_out(&mut self) {
        self.owner = Owner::Guest(self.sessions.session_id());
        self.fetch_cart().await;
    }

    /// Records the order for a succeeded checkout and empties the cart.
    ///
    /// # Errors
    ///
    /// The repository error. If the order was stored but clearing the cart
    /// fails, the error is returned and a retry records nothing twice.
    pub async fn finalize_order(
        &mut self,
        receipt: &CompletedCheckout,
        contact: &ContactDetails,
    ) -> Result<Uuid, CartError> {
        let shipping_address = match &contact.address {
            Some(address) => serde_json::to_value(address)
                .map_err(|e| CartError::Unavailable(format!("invalid shipping address: {e}")))?,
            None => serde_json::json!({}),
        };

        let order = NewOrder {
            user_id: receipt.buyer(),
            customer_email: contact.email.trim().to_string(),
            customer_name: contact.full_name.trim().to_string(),
            customer_phone: contact.phone.clone().filter(|p| !p.trim().is_empty()),
            shipping_address,
            total_amount: Decimal::new(receipt.amount(), 2),
            discount_code: receipt.discount_code().map(str::to_string),
            stripe_payment_id: receipt.payment_intent_id().to_string(),
            items: receipt.items().to_vec(),
        };

        let order_id = self.repository.create_order(&order).await?;
        tracing::info!(
            %order_id,
            payment_intent_id = receipt.payment_intent_id(),
            "order recorded"
        );
        self.clear_cart().await?;
        Ok(order_id)
    }
}

#[cfg(test)]
#[path = "cart_test.rs"]
mod tests;
