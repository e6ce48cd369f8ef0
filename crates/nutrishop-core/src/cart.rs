use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::products::Product;
use crate::CoreError;

/// Who a cart belongs to: a signed-in user or an anonymous browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    User(Uuid),
    Guest(String),
}

impl Owner {
    /// Rebuilds an owner from the two nullable `cart_items` columns.
    ///
    /// Returns `None` unless exactly one of them is set.
    #[must_use]
    pub fn from_columns(user_id: Option<Uuid>, session_id: Option<String>) -> Option<Self> {
        match (user_id, session_id) {
            (Some(user_id), None) => Some(Self::User(user_id)),
            (None, Some(session_id)) => Some(Self::Guest(session_id)),
            _ => None,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::User(_) => None,
            Self::Guest(session_id) => Some(session_id),
        }
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Guest(session_id) => write!(f, "guest:{session_id}"),
        }
    }
}

/// One `(owner, product)` line of a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub owner: Owner,
    pub product_id: Uuid,
    /// Always `>= 1`; a line that would drop to zero is deleted instead.
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Builds an item from raw row columns, validating the owner invariant.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOwner`] if both or neither owner column is set.
    pub fn from_row_parts(
        id: Uuid,
        user_id: Option<Uuid>,
        session_id: Option<String>,
        product_id: Uuid,
        quantity: i32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let owner = Owner::from_columns(user_id, session_id).ok_or(CoreError::InvalidOwner(id))?;
        Ok(Self {
            id,
            owner,
            product_id,
            quantity,
            created_at,
            updated_at,
        })
    }
}

/// A cart item joined with its product. `product` is `None` when the product
/// row no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Option<Product>,
}

impl CartLine {
    /// `price * quantity`, or `None` when the product is missing.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.product
            .as_ref()
            .map(|p| p.price * Decimal::from(self.item.quantity))
    }
}

/// Sum of line totals, skipping lines whose product is missing.
#[must_use]
pub fn cart_subtotal(lines: &[CartLine]) -> Decimal {
    lines.iter().filter_map(CartLine::line_total).sum()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn product(price: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Whey Isolate".to_string(),
            slug: "whey-isolate".to_string(),
            description: None,
            price: Decimal::from_str(price).unwrap(),
            image_url: None,
            stock_quantity: 10,
            is_featured: false,
            is_top_selling: false,
            is_subscription: false,
            subscription_interval: None,
            subscription_interval_count: None,
            stripe_product_id: None,
            stripe_price_id: None,
            created_at: Utc::now(),
        }
    }

    fn line(product: Option<Product>, quantity: i32) -> CartLine {
        let now = Utc::now();
        CartLine {
            item: CartItem {
                id: Uuid::new_v4(),
                owner: Owner::Guest("session_1_abc".to_string()),
                product_id: product.as_ref().map_or_else(Uuid::new_v4, |p| p.id),
                quantity,
                created_at: now,
                updated_at: now,
            },
            product,
        }
    }

    #[test]
    fn owner_from_columns_requires_exactly_one() {
        let user = Uuid::new_v4();
        assert_eq!(
            Owner::from_columns(Some(user), None),
            Some(Owner::User(user))
        );
        assert_eq!(
            Owner::from_columns(None, Some("s".to_string())),
            Some(Owner::Guest("s".to_string()))
        );
        assert_eq!(Owner::from_columns(None, None), None);
        assert_eq!(Owner::from_columns(Some(user), Some("s".to_string())), None);
    }

    #[test]
    fn cart_item_rejects_rows_with_two_owners() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let result = CartItem::from_row_parts(
            id,
            Some(Uuid::new_v4()),
            Some("s".to_string()),
            Uuid::new_v4(),
            1,
            now,
            now,
        );
        assert!(matches!(result, Err(CoreError::InvalidOwner(row)) if row == id));
    }

    #[test]
    fn subtotal_sums_price_times_quantity() {
        let lines = vec![line(Some(product("9.99")), 2), line(Some(product("4.50")), 3)];
        assert_eq!(cart_subtotal(&lines), Decimal::from_str("33.48").unwrap());
    }

    #[test]
    fn subtotal_skips_lines_without_product() {
        let lines = vec![line(Some(product("9.99")), 2), line(None, 5)];
        assert_eq!(cart_subtotal(&lines), Decimal::from_str("19.98").unwrap());
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() {
        assert_eq!(cart_subtotal(&[]), Decimal::ZERO);
    }

    #[test]
    fn owner_serializes_as_tagged_union() {
        let json = serde_json::to_value(Owner::Guest("session_9".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "guest", "id": "session_9"}));
    }
}
