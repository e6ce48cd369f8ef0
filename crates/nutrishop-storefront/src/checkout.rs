//! Checkout state machine.
//!
//! ```text
//! Initializing ──initialize──▶ Ready ──submit──▶ Processing ──▶ Succeeded
//!      │                         │                   │
//!      └──── empty cart ─────────┴──── errors ───────┴────────▶ Failed
//! ```
//!
//! A [`CompletedCheckout`] receipt can only be obtained from a checkout in
//! [`CheckoutState::Succeeded`], so a failed payment can never be turned
//! into an order.

use nutrishop_core::{
    cart_subtotal, to_minor_units, CartLine, CreatePaymentIntentRequest, DiscountQuote, Owner,
    PaymentItem, ValidateDiscountRequest,
};
use nutrishop_db::NewOrderItem;
use nutrishop_stripe::{Address, ConfirmPaymentParams};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CheckoutError, GatewayError};
use crate::gateway::PaymentGateway;

/// Terminal failure of a checkout. `Display` is the message shown to the
/// customer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutFailure {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Failed to create payment intent")]
    MissingClientSecret,

    /// Payment intent creation failed; the backend's message.
    #[error("{0}")]
    Backend(String),

    /// Confirmation failed; the processor's message, verbatim.
    #[error("{0}")]
    PaymentDeclined(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Initializing,
    Ready {
        client_secret: String,
        payment_intent_id: String,
        /// Minor units actually charged.
        amount: i64,
    },
    /// Submitted; waiting on the processor or on further customer action.
    Processing { payment_intent_id: String },
    Succeeded { payment_intent_id: String },
    Failed(CheckoutFailure),
}

impl CheckoutState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready { .. } => "ready",
            Self::Processing { .. } => "processing",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl From<&ShippingAddress> for Address {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
        }
    }
}

/// Buyer-entered details. `email` and `full_name` are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<ShippingAddress>,
}

impl ContactDetails {
    fn validate(&self) -> Result<(), CheckoutError> {
        if self.email.trim().is_empty() {
            return Err(CheckoutError::MissingContactField("email"));
        }
        if self.full_name.trim().is_empty() {
            return Err(CheckoutError::MissingContactField("full name"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSubmission {
    pub contact: ContactDetails,
    /// Payment method id collected by the card form.
    pub payment_method: String,
}

/// Proof of a succeeded payment, carrying what order finalization needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCheckout {
    payment_intent_id: String,
    amount: i64,
    buyer: Option<Uuid>,
    discount_code: Option<String>,
    items: Vec<NewOrderItem>,
}

impl CompletedCheckout {
    #[must_use]
    pub fn payment_intent_id(&self) -> &str {
        &self.payment_intent_id
    }

    /// Minor units charged.
    #[must_use]
    pub fn amount(&self) -> i64 {
        self.amount
    }

    #[must_use]
    pub fn buyer(&self) -> Option<Uuid> {
        self.buyer
    }

    #[must_use]
    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code.as_deref()
    }

    #[must_use]
    pub fn items(&self) -> &[NewOrderItem] {
        &self.items
    }
}

pub struct Checkout<G> {
    gateway: G,
    buyer: Option<Uuid>,
    state: CheckoutState,
    discount: Option<DiscountQuote>,
    items: Vec<NewOrderItem>,
    charged: i64,
}

impl<G: PaymentGateway> Checkout<G> {
    /// Starts a checkout for `owner`. Guests are sent to the backend without
    /// a user id and recorded as `"guest"`.
    pub fn new(gateway: G, owner: &Owner) -> Self {
        Self {
            gateway,
            buyer: owner.user_id(),
            state: CheckoutState::Initializing,
            discount: None,
            items: Vec::new(),
            charged: 0,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn discount(&self) -> Option<&DiscountQuote> {
        self.discount.as_ref()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn expect_state(&self, expected: &'static str) -> Result<(), CheckoutError> {
        if self.state.name() == expected {
            Ok(())
        } else {
            Err(CheckoutError::InvalidState {
                expected,
                actual: self.state.name(),
            })
        }
    }

    /// Validates `code` against the subtotal of `lines` and remembers it for
    /// the payment intent request.
    ///
    /// The subtotal is computed the same way [`Checkout::initialize`] does.
    /// The quote is a preview; the amount on the created intent is what gets
    /// charged.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Discount`] with the backend's message if the code is
    /// rejected; [`CheckoutError::InvalidState`] once the intent exists.
    pub async fn apply_discount(
        &mut self,
        code: &str,
        lines: &[CartLine],
    ) -> Result<&DiscountQuote, CheckoutError> {
        self.expect_state("initializing")?;

        let request = ValidateDiscountRequest {
            code: code.trim().to_string(),
            amount: to_minor_units(cart_subtotal(lines))?,
        };
        let response = self
            .gateway
            .validate_discount(&request)
            .await
            .map_err(|e| CheckoutError::Discount(e.to_string()))?;

        tracing::info!(
            code = %response.code,
            discount_amount = response.discount_amount,
            "discount applied"
        );
        Ok(&*self.discount.insert(DiscountQuote {
            code: response.code,
            discount_type: response.discount_type,
            original_amount: response.original_amount,
            discount_amount: response.discount_amount,
            final_amount: response.final_amount,
        }))
    }

    /// Drops a previously applied discount.
    pub fn remove_discount(&mut self) {
        self.discount = None;
    }

    /// Prices `lines` and requests a payment intent.
    ///
    /// A cart whose payable total is not positive fails immediately with
    /// [`CheckoutFailure::EmptyCart`] and the backend is never called.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidState`] unless the checkout is initializing;
    /// [`CheckoutError::Core`] if the total does not fit in minor units.
    pub async fn initialize(&mut self, lines: &[CartLine]) -> Result<&CheckoutState, CheckoutError> {
        self.expect_state("initializing")?;

        let amount = to_minor_units(cart_subtotal(lines))?;
        if amount <= 0 {
            self.state = CheckoutState::Failed(CheckoutFailure::EmptyCart);
            return Ok(&self.state);
        }

        self.items = lines
            .iter()
            .filter_map(|line| {
                line.product.as_ref().map(|product| NewOrderItem {
                    product_id: line.item.product_id,
                    quantity: line.item.quantity,
                    price_at_time: product.price,
                })
            })
            .collect();

        let request = CreatePaymentIntentRequest {
            amount,
            user_id: self.buyer,
            items: self
                .items
                .iter()
                .map(|item| PaymentItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
            discount_code: self.discount.as_ref().map(|quote| quote.code.clone()),
        };

        self.state = match self.gateway.create_payment_intent(&request).await {
            Ok(response) => match response.client_secret {
                Some(client_secret) if !client_secret.is_empty() => {
                    tracing::info!(
                        payment_intent_id = %response.payment_intent_id,
                        amount = response.amount,
                        "payment intent ready"
                    );
                    self.charged = response.amount;
                    CheckoutState::Ready {
                        client_secret,
                        payment_intent_id: response.payment_intent_id,
                        amount: response.amount,
                    }
                }
                _ => CheckoutState::Failed(CheckoutFailure::MissingClientSecret),
            },
            Err(GatewayError::Backend(message)) => {
                CheckoutState::Failed(CheckoutFailure::Backend(message))
            }
            Err(e) => {
                tracing::warn!(error = %e, "payment intent request failed");
                CheckoutState::Failed(CheckoutFailure::Backend(e.to_string()))
            }
        };
        Ok(&self.state)
    }

    /// Confirms the payment with the buyer's details.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::MissingContactField`] leaves the checkout `Ready` so
    /// the buyer can fix the form; [`CheckoutError::InvalidState`] unless the
    /// checkout is ready.
    pub async fn submit(
        &mut self,
        submission: &CheckoutSubmission,
    ) -> Result<&CheckoutState, CheckoutError> {
        let (client_secret, payment_intent_id) = match &self.state {
            CheckoutState::Ready {
                client_secret,
                payment_intent_id,
                ..
            } => (client_secret.clone(), payment_intent_id.clone()),
            other => {
                return Err(CheckoutError::InvalidState {
                    expected: "ready",
                    actual: other.name(),
                })
            }
        };
        submission.contact.validate()?;

        self.state = CheckoutState::Processing {
            payment_intent_id: payment_intent_id.clone(),
        };

        let contact = &submission.contact;
        let params = ConfirmPaymentParams {
            payment_method: submission.payment_method.clone(),
            receipt_email: Some(contact.email.trim().to_string()),
            billing_name: Some(contact.full_name.trim().to_string()),
            billing_phone: contact.phone.clone().filter(|p| !p.trim().is_empty()),
            shipping_address: contact.address.as_ref().map(Address::from),
            return_url: None,
        };

        self.state = match self.gateway.confirm_payment(&client_secret, &params).await {
            Ok(confirmed) if confirmed.is_succeeded() => {
                tracing::info!(payment_intent_id = %confirmed.payment_intent_id, "payment succeeded");
                CheckoutState::Succeeded {
                    payment_intent_id: confirmed.payment_intent_id,
                }
            }
            Ok(confirmed) => {
                tracing::info!(
                    payment_intent_id = %confirmed.payment_intent_id,
                    status = %confirmed.status,
                    "payment awaiting further action"
                );
                CheckoutState::Processing { payment_intent_id }
            }
            Err(e) => {
                tracing::warn!(%payment_intent_id, error = %e, "payment confirmation failed");
                CheckoutState::Failed(CheckoutFailure::PaymentDeclined(e.to_string()))
            }
        };
        Ok(&self.state)
    }

    /// The receipt for a succeeded checkout; `None` in every other state.
    #[must_use]
    pub fn receipt(&self) -> Option<CompletedCheckout> {
        let CheckoutState::Succeeded { payment_intent_id } = &self.state else {
            return None;
        };
        Some(CompletedCheckout {
            payment_intent_id: payment_intent_id.clone(),
            amount: self.charged,
            buyer: self.buyer,
            discount_code: self.discount.as_ref().map(|quote| quote.code.clone()),
            items: self.items.clone(),
        })
    }
}

#[cfg(test)]
#[path = "checkout_test.rs"]
mod tests;
