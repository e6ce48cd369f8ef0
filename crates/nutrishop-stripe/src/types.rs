//! Stripe request parameters and response objects.
//!
//! Responses only model the fields this workspace reads; Stripe returns many
//! more and serde ignores them. Requests are flattened into the bracketed
//! form encoding Stripe expects (`metadata[key]=value`) by [`FormParams`].

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Body of a non-2xx response: `{ "error": { ... } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Absent on some expanded/list responses; required by the storefront.
    #[serde(default)]
    pub client_secret: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    /// e.g. `requires_payment_method`, `requires_action`, `processing`, `succeeded`.
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Coupon {
    pub id: String,
    #[serde(default)]
    pub valid: Option<bool>,
}

/// Response to `DELETE /v1/coupons/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedObject {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: String,
    pub active: bool,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recurring {
    pub interval: String,
    pub interval_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
    pub active: bool,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub recurring: Option<Recurring>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Ordered list of form fields sent to Stripe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    pub fn push_opt(&mut self, key: &str, value: Option<impl ToString>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Adds `metadata[key]=value` for each pair.
    pub fn metadata(&mut self, metadata: &[(String, String)]) -> &mut Self {
        for (key, value) in metadata {
            self.push(format!("metadata[{key}]"), value);
        }
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateCustomerParams {
    pub email: Option<String>,
    pub name: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl CreateCustomerParams {
    pub(crate) fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push_opt("email", self.email.as_deref())
            .push_opt("name", self.name.as_deref())
            .metadata(&self.metadata);
        form
    }
}

#[derive(Debug, Clone)]
pub struct CreatePaymentIntentParams {
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub customer: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl CreatePaymentIntentParams {
    pub(crate) fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push("amount", self.amount)
            .push("currency", &self.currency)
            .push_opt("customer", self.customer.as_deref())
            .push("automatic_payment_methods[enabled]", "true")
            .metadata(&self.metadata);
        form
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    fn push_into(&self, form: &mut FormParams, prefix: &str) {
        let fields = [
            ("line1", &self.line1),
            ("line2", &self.line2),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (name, value) in fields {
            form.push_opt(&format!("{prefix}[{name}]"), value.as_deref());
        }
    }
}

/// Parameters for confirming a payment intent from the client side.
#[derive(Debug, Clone, Default)]
pub struct ConfirmPaymentParams {
    /// A payment method id (`pm_...`) collected by the card element.
    pub payment_method: String,
    pub receipt_email: Option<String>,
    pub billing_name: Option<String>,
    pub billing_phone: Option<String>,
    pub shipping_address: Option<Address>,
    pub return_url: Option<String>,
}

impl ConfirmPaymentParams {
    pub(crate) fn to_form(&self, client_secret: &str) -> FormParams {
        let mut form = FormParams::new();
        form.push("client_secret", client_secret)
            .push("payment_method", &self.payment_method)
            .push_opt("receipt_email", self.receipt_email.as_deref())
            .push_opt("return_url", self.return_url.as_deref());

        // Name and phone go out even without an address. Stripe rejects a
        // `shipping` hash with no address, so an empty line1 stands in.
        let has_contact = self.billing_name.is_some()
            || self.billing_phone.is_some()
            || self.shipping_address.is_some();
        if has_contact {
            form.push("shipping[name]", self.billing_name.as_deref().unwrap_or_default())
                .push_opt("shipping[phone]", self.billing_phone.as_deref());
            match &self.shipping_address {
                Some(address) => address.push_into(&mut form, "shipping[address]"),
                None => {
                    form.push("shipping[address][line1]", "");
                }
            }
        }
        form
    }
}

/// Either `percent_off` or `amount_off` + `currency`.
#[derive(Debug, Clone, PartialEq)]
pub enum CouponAmount {
    PercentOff(Decimal),
    AmountOff { amount: i64, currency: String },
}

#[derive(Debug, Clone)]
pub struct CreateCouponParams {
    pub amount: CouponAmount,
    /// `once`, `repeating`, or `forever`.
    pub duration: String,
    pub duration_in_months: Option<i32>,
    pub max_redemptions: Option<i32>,
    /// Unix timestamp.
    pub redeem_by: Option<i64>,
    pub name: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl CreateCouponParams {
    pub(crate) fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        match &self.amount {
            CouponAmount::PercentOff(percent) => {
                form.push("percent_off", percent.normalize());
            }
            CouponAmount::AmountOff { amount, currency } => {
                form.push("amount_off", amount).push("currency", currency);
            }
        }
        form.push("duration", &self.duration);
        if self.duration == "repeating" {
            form.push_opt("duration_in_months", self.duration_in_months);
        }
        form.push_opt("max_redemptions", self.max_redemptions)
            .push_opt("redeem_by", self.redeem_by)
            .push_opt("name", self.name.as_deref())
            .metadata(&self.metadata);
        form
    }
}

/// Fields shared by product create and update.
#[derive(Debug, Clone, Default)]
pub struct ProductParams {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl ProductParams {
    pub(crate) fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push("name", &self.name)
            .push_opt("description", self.description.as_deref())
            .push_opt("images[0]", self.image_url.as_deref())
            .metadata(&self.metadata);
        form
    }
}

#[derive(Debug, Clone)]
pub struct CreatePriceParams {
    pub product: String,
    pub unit_amount: i64,
    pub currency: String,
    /// `(interval, interval_count)` for subscription prices.
    pub recurring: Option<(String, i32)>,
    pub metadata: Vec<(String, String)>,
}

impl CreatePriceParams {
    pub(crate) fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push("product", &self.product)
            .push("unit_amount", self.unit_amount)
            .push("currency", &self.currency);
        if let Some((interval, count)) = &self.recurring {
            form.push("recurring[interval]", interval)
                .push("recurring[interval_count]", count);
        }
        form.metadata(&self.metadata);
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_intent_form_enables_automatic_methods() {
        let params = CreatePaymentIntentParams {
            amount: 3348,
            currency: "usd".to_string(),
            customer: None,
            metadata: vec![("user_id".to_string(), "guest".to_string())],
        };
        let form = params.to_form();
        assert_eq!(form.get("amount"), Some("3348"));
        assert_eq!(form.get("automatic_payment_methods[enabled]"), Some("true"));
        assert_eq!(form.get("metadata[user_id]"), Some("guest"));
        assert_eq!(form.get("customer"), None);
    }

    #[test]
    fn coupon_form_only_sends_months_for_repeating() {
        let mut params = CreateCouponParams {
            amount: CouponAmount::PercentOff(Decimal::new(1500, 2)),
            duration: "once".to_string(),
            duration_in_months: Some(3),
            max_redemptions: None,
            redeem_by: None,
            name: None,
            metadata: vec![],
        };
        let form = params.to_form();
        assert_eq!(form.get("percent_off"), Some("15"));
        assert_eq!(form.get("duration_in_months"), None);

        params.duration = "repeating".to_string();
        assert_eq!(params.to_form().get("duration_in_months"), Some("3"));
    }

    #[test]
    fn fixed_coupon_sends_currency() {
        let params = CreateCouponParams {
            amount: CouponAmount::AmountOff {
                amount: 500,
                currency: "usd".to_string(),
            },
            duration: "forever".to_string(),
            duration_in_months: None,
            max_redemptions: Some(10),
            redeem_by: Some(1_900_000_000),
            name: Some("SAVE5".to_string()),
            metadata: vec![],
        };
        let form = params.to_form();
        assert_eq!(form.get("amount_off"), Some("500"));
        assert_eq!(form.get("currency"), Some("usd"));
        assert_eq!(form.get("percent_off"), None);
        assert_eq!(form.get("redeem_by"), Some("1900000000"));
    }

    #[test]
    fn recurring_price_form_includes_interval() {
        let params = CreatePriceParams {
            product: "prod_1".to_string(),
            unit_amount: 2999,
            currency: "usd".to_string(),
            recurring: Some(("month".to_string(), 1)),
            metadata: vec![],
        };
        let form = params.to_form();
        assert_eq!(form.get("recurring[interval]"), Some("month"));
        assert_eq!(form.get("recurring[interval_count]"), Some("1"));
    }

    #[test]
    fn confirm_form_carries_shipping_address_when_present() {
        let params = ConfirmPaymentParams {
            payment_method: "pm_card_visa".to_string(),
            billing_name: Some("Ada".to_string()),
            shipping_address: Some(Address {
                line1: Some("1 Main St".to_string()),
                city: Some("Springfield".to_string()),
                ..Address::default()
            }),
            ..ConfirmPaymentParams::default()
        };
        let form = params.to_form("pi_1_secret_x");
        assert_eq!(form.get("client_secret"), Some("pi_1_secret_x"));
        assert_eq!(form.get("shipping[name]"), Some("Ada"));
        assert_eq!(form.get("shipping[address][line1]"), Some("1 Main St"));
        assert_eq!(form.get("shipping[address][line2]"), None);
    }

    #[test]
    fn confirm_form_sends_name_and_phone_without_address() {
        let params = ConfirmPaymentParams {
            payment_method: "pm_card_visa".to_string(),
            receipt_email: Some("ada@example.com".to_string()),
            billing_name: Some("Ada Lovelace".to_string()),
            billing_phone: Some("555-0100".to_string()),
            ..ConfirmPaymentParams::default()
        };
        let form = params.to_form("pi_1_secret_x");
        assert_eq!(form.get("shipping[name]"), Some("Ada Lovelace"));
        assert_eq!(form.get("shipping[phone]"), Some("555-0100"));
        assert_eq!(form.get("shipping[address][line1]"), Some(""));
        assert_eq!(form.get("shipping[address][city]"), None);
    }

    #[test]
    fn confirm_form_without_contact_has_no_shipping_block() {
        let params = ConfirmPaymentParams {
            payment_method: "pm_card_visa".to_string(),
            ..ConfirmPaymentParams::default()
        };
        let form = params.to_form("pi_1_secret_x");
        assert_eq!(form.get("shipping[name]"), None);
        assert_eq!(form.get("shipping[phone]"), None);
    }
}
