//! Fixtures shared by the unit tests.

use std::str::FromStr;
use std::sync::Mutex;

use chrono::Utc;
use nutrishop_core::{
    CreatePaymentIntentRequest, CreatePaymentIntentResponse, DiscountKind, Product,
    ValidateDiscountRequest, ValidateDiscountResponse,
};
use nutrishop_stripe::{ConfirmPaymentParams, StripeError};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::gateway::{ConfirmedPayment, PaymentGateway};

pub fn product(name: &str, price: &str) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        description: None,
        price: Decimal::from_str(price).unwrap(),
        image_url: None,
        stock_quantity: 100,
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

/// What the fake returns from `confirm_payment`.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    Status(&'static str),
    Declined(&'static str),
}

/// Scripted [`PaymentGateway`] that records every request.
#[derive(Debug)]
pub struct FakeGateway {
    pub client_secret: Option<String>,
    pub intent_error: Option<String>,
    pub confirm: ConfirmOutcome,
    /// Percent taken off by any code other than `BOGUS`.
    pub percent_off: i64,
    pub intent_requests: Mutex<Vec<CreatePaymentIntentRequest>>,
    pub confirm_requests: Mutex<Vec<(String, ConfirmPaymentParams)>>,
    pub discount_requests: Mutex<Vec<ValidateDiscountRequest>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            client_secret: Some("pi_test_secret_abc".to_string()),
            intent_error: None,
            confirm: ConfirmOutcome::Status("succeeded"),
            percent_off: 10,
            intent_requests: Mutex::new(Vec::new()),
            confirm_requests: Mutex::new(Vec::new()),
            discount_requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn intent_calls(&self) -> usize {
        self.intent_requests.lock().unwrap().len()
    }

    pub fn confirm_calls(&self) -> usize {
        self.confirm_requests.lock().unwrap().len()
    }
}

impl PaymentGateway for FakeGateway {
    async fn validate_discount(
        &self,
        request: &ValidateDiscountRequest,
    ) -> Result<ValidateDiscountResponse, GatewayError> {
        self.discount_requests.lock().unwrap().push(request.clone());
        if request.code.eq_ignore_ascii_case("bogus") {
            return Err(GatewayError::Backend("Invalid discount code".to_string()));
        }
        let discount_amount = request.amount * self.percent_off / 100;
        Ok(ValidateDiscountResponse {
            code: request.code.to_uppercase(),
            discount_type: DiscountKind::Percentage,
            original_amount: request.amount,
            discount_amount,
            final_amount: request.amount - discount_amount,
        })
    }

    async fn create_payment_intent(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> Result<CreatePaymentIntentResponse, GatewayError> {
        self.intent_requests.lock().unwrap().push(request.clone());
        if let Some(message) = &self.intent_error {
            return Err(GatewayError::Backend(message.clone()));
        }
        let amount = if request.discount_code.is_some() {
            request.amount - request.amount * self.percent_off / 100
        } else {
            request.amount
        };
        Ok(CreatePaymentIntentResponse {
            client_secret: self.client_secret.clone(),
            payment_intent_id: "pi_test".to_string(),
            amount,
        })
    }

    async fn confirm_payment(
        &self,
        client_secret: &str,
        params: &ConfirmPaymentParams,
    ) -> Result<ConfirmedPayment, GatewayError> {
        self.confirm_requests
            .lock()
            .unwrap()
            .push((client_secret.to_string(), params.clone()));
        match self.confirm {
            ConfirmOutcome::Status(status) => Ok(ConfirmedPayment {
                payment_intent_id: "pi_test".to_string(),
                status: status.to_string(),
            }),
            ConfirmOutcome::Declined(message) => Err(GatewayError::Stripe(StripeError::Api {
                status: 402,
                message: message.to_string(),
                code: Some("card_declined".to_string()),
            })),
        }
    }
}
