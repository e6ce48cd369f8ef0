//! JSON bodies exchanged between the storefront and the server's payment
//! endpoints. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::discounts::DiscountKind;

/// One `{productId, quantity}` entry sent with a payment intent and copied
/// into its metadata for fulfilment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Body of `POST /create-payment-intent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    /// Undiscounted amount in minor units.
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<PaymentItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    /// Absent only if the processor misbehaves; the storefront treats that as a failure.
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    /// Amount actually charged, after any discount.
    pub amount: i64,
}

/// Body of `POST /validate-discount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDiscountRequest {
    pub code: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDiscountResponse {
    pub code: String,
    pub discount_type: DiscountKind,
    pub original_amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
}

/// `{error}` body returned by the public endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `{success: false, error}` body returned by the admin endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminFailure {
    pub success: bool,
    pub error: String,
}

impl AdminFailure {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_camel_case_and_omits_empty_options() {
        let product_id = Uuid::nil();
        let body = CreatePaymentIntentRequest {
            amount: 3348,
            user_id: None,
            items: vec![PaymentItem {
                product_id,
                quantity: 2,
            }],
            discount_code: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "amount": 3348,
                "items": [{"productId": product_id, "quantity": 2}]
            })
        );
    }

    #[test]
    fn create_request_accepts_missing_items() {
        let body: CreatePaymentIntentRequest =
            serde_json::from_str(r#"{"amount": 100}"#).unwrap();
        assert!(body.items.is_empty());
        assert!(body.user_id.is_none());
    }

    #[test]
    fn response_parses_without_client_secret() {
        let body: CreatePaymentIntentResponse = serde_json::from_str(
            r#"{"clientSecret": null, "paymentIntentId": "pi_1", "amount": 100}"#,
        )
        .unwrap();
        assert!(body.client_secret.is_none());
    }
}
