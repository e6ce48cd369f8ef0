//! HTTP client for the Stripe REST API.
//!
//! Wraps `reqwest` with bearer auth and typed response deserialization.
//! Requests are form-encoded; non-2xx responses are decoded from Stripe's
//! `{"error": {...}}` envelope into [`StripeError::Api`].

use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;

use crate::error::StripeError;
use crate::types::{
    ConfirmPaymentParams, Coupon, CreateCouponParams, CreateCustomerParams,
    CreatePaymentIntentParams, CreatePriceParams, Customer, DeletedObject, ErrorEnvelope,
    FormParams, PaymentIntent, Price, Product, ProductParams,
};

pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com/";

/// Client for the Stripe REST API.
///
/// The server builds one with the secret key. The storefront builds one
/// with the publishable key, which Stripe only accepts for client-side
/// calls such as [`StripeClient::confirm_payment_intent`].
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Creates a client pointed at the production Stripe API.
    ///
    /// # Errors
    ///
    /// Returns [`StripeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, StripeError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`StripeError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`StripeError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("nutrishop/0.1")
            .build()?;

        // A trailing slash makes `Url::join` append to the path instead of
        // replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|_| StripeError::InvalidBaseUrl(base_url.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    // -----------------------------------------------------------------------
    // Customers and payment intents
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn create_customer(
        &self,
        params: &CreateCustomerParams,
    ) -> Result<Customer, StripeError> {
        self.send(Method::POST, "v1/customers", Some(&params.to_form()), "create_customer")
            .await
    }

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntentParams,
    ) -> Result<PaymentIntent, StripeError> {
        self.send(
            Method::POST,
            "v1/payment_intents",
            Some(&params.to_form()),
            "create_payment_intent",
        )
        .await
    }

    /// Confirms a payment intent using its client secret.
    ///
    /// A declined card comes back as [`StripeError::Api`] with Stripe's
    /// customer-facing message. A successful call may still leave the
    /// intent in a non-terminal status (e.g. `requires_action`).
    ///
    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn confirm_payment_intent(
        &self,
        client_secret: &str,
        params: &ConfirmPaymentParams,
    ) -> Result<PaymentIntent, StripeError> {
        let intent_id = payment_intent_id_from_secret(client_secret);
        let path = format!("v1/payment_intents/{intent_id}/confirm");
        self.send(
            Method::POST,
            &path,
            Some(&params.to_form(client_secret)),
            "confirm_payment_intent",
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Coupons
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn create_coupon(&self, params: &CreateCouponParams) -> Result<Coupon, StripeError> {
        self.send(Method::POST, "v1/coupons", Some(&params.to_form()), "create_coupon")
            .await
    }

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn delete_coupon(&self, coupon_id: &str) -> Result<DeletedObject, StripeError> {
        let path = format!("v1/coupons/{coupon_id}");
        self.send(Method::DELETE, &path, None, "delete_coupon").await
    }

    // -----------------------------------------------------------------------
    // Products and prices
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn create_product(&self, params: &ProductParams) -> Result<Product, StripeError> {
        self.send(Method::POST, "v1/products", Some(&params.to_form()), "create_product")
            .await
    }

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn update_product(
        &self,
        product_id: &str,
        params: &ProductParams,
    ) -> Result<Product, StripeError> {
        let path = format!("v1/products/{product_id}");
        self.send(Method::POST, &path, Some(&params.to_form()), "update_product")
            .await
    }

    /// Sets `active` on a product. Stripe products with prices cannot be
    /// deleted, so archiving is `active = false`.
    ///
    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn set_product_active(
        &self,
        product_id: &str,
        active: bool,
    ) -> Result<Product, StripeError> {
        let path = format!("v1/products/{product_id}");
        let mut form = FormParams::new();
        form.push("active", active);
        self.send(Method::POST, &path, Some(&form), "set_product_active")
            .await
    }

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn create_price(&self, params: &CreatePriceParams) -> Result<Price, StripeError> {
        self.send(Method::POST, "v1/prices", Some(&params.to_form()), "create_price")
            .await
    }

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn retrieve_price(&self, price_id: &str) -> Result<Price, StripeError> {
        let path = format!("v1/prices/{price_id}");
        self.send(Method::GET, &path, None, "retrieve_price").await
    }

    /// # Errors
    ///
    /// Returns [`StripeError`] on transport, API, or decoding failure.
    pub async fn set_price_active(&self, price_id: &str, active: bool) -> Result<Price, StripeError> {
        let path = format!("v1/prices/{price_id}");
        let mut form = FormParams::new();
        form.push("active", active);
        self.send(Method::POST, &path, Some(&form), "set_price_active")
            .await
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    fn url(&self, path: &str) -> Result<Url, StripeError> {
        self.base_url
            .join(path)
            .map_err(|_| StripeError::InvalidBaseUrl(format!("{}{path}", self.base_url)))
    }

    /// Sends a request with bearer auth and an optional form body, then
    /// decodes either the typed success body or Stripe's error envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Option<&FormParams>,
        context: &str,
    ) -> Result<T, StripeError> {
        let url = self.url(path)?;
        tracing::debug!(%method, path, "stripe request");

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key);
        if let Some(form) = form {
            request = request.form(form.as_slice());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| StripeError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    fn api_error(status: u16, body: &str) -> StripeError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let (message, code) = match parsed {
            Some(envelope) => (
                envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("Stripe returned HTTP {status}")),
                envelope.error.code,
            ),
            None => (format!("Stripe returned HTTP {status}"), None),
        };
        tracing::warn!(status, code = code.as_deref(), %message, "stripe api error");
        StripeError::Api {
            status,
            message,
            code,
        }
    }
}

/// Extracts the payment intent id from a client secret
/// (`pi_123_secret_abc` → `pi_123`). A string without the marker is
/// returned unchanged.
#[must_use]
pub fn payment_intent_id_from_secret(client_secret: &str) -> &str {
    client_secret
        .split_once("_secret_")
        .map_or(client_secret, |(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> StripeClient {
        StripeClient::with_base_url("sk_test_123", 30, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn intent_id_is_prefix_of_client_secret() {
        assert_eq!(payment_intent_id_from_secret("pi_3Nabc_secret_xyz"), "pi_3Nabc");
        assert_eq!(payment_intent_id_from_secret("pi_plain"), "pi_plain");
    }

    #[test]
    fn url_appends_to_base_path() {
        let client = test_client("http://localhost:12111/stripe/");
        let url = client.url("v1/customers").unwrap();
        assert_eq!(url.as_str(), "http://localhost:12111/stripe/v1/customers");
    }

    #[test]
    fn url_handles_base_without_trailing_slash() {
        let client = test_client("https://api.stripe.com");
        let url = client.url("v1/prices/price_1").unwrap();
        assert_eq!(url.as_str(), "https://api.stripe.com/v1/prices/price_1");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = StripeClient::with_base_url("sk", 30, "not a url");
        assert!(matches!(result, Err(StripeError::InvalidBaseUrl(_))));
    }

    #[test]
    fn api_error_falls_back_to_status_message() {
        let err = StripeClient::api_error(500, "<html>oops</html>");
        assert!(matches!(
            err,
            StripeError::Api { status: 500, ref message, code: None } if message == "Stripe returned HTTP 500"
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let client = test_client("https://api.stripe.com");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk_test_123"));
    }
}
