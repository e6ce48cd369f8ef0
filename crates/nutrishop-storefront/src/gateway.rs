//! Payment backend seam used by [`crate::Checkout`].
//!
//! Intent creation and discount validation go through the nutrishop
//! server (it holds the Stripe secret key); confirmation goes straight to
//! Stripe with the publishable key and the intent's client secret.

use std::time::Duration;

use nutrishop_core::{
    CreatePaymentIntentRequest, CreatePaymentIntentResponse, ErrorResponse, StorefrontConfig,
    ValidateDiscountRequest, ValidateDiscountResponse,
};
use nutrishop_stripe::{ConfirmPaymentParams, StripeClient};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::GatewayError;

/// Outcome of a confirmation call that Stripe accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPayment {
    pub payment_intent_id: String,
    /// `succeeded`, or a non-terminal status such as `requires_action`.
    pub status: String,
}

impl ConfirmedPayment {
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

pub trait PaymentGateway: Send + Sync {
    async fn validate_discount(
        &self,
        request: &ValidateDiscountRequest,
    ) -> Result<ValidateDiscountResponse, GatewayError>;

    async fn create_payment_intent(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> Result<CreatePaymentIntentResponse, GatewayError>;

    async fn confirm_payment(
        &self,
        client_secret: &str,
        params: &ConfirmPaymentParams,
    ) -> Result<ConfirmedPayment, GatewayError>;
}

/// [`PaymentGateway`] over HTTP: the nutrishop server plus Stripe.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    api_url: Url,
    stripe: StripeClient,
}

impl HttpPaymentGateway {
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidUrl`] if `api_url` does not parse, or
    /// an HTTP/Stripe error if a client cannot be built.
    pub fn new(
        api_url: &str,
        stripe: StripeClient,
        timeout_secs: u64,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("nutrishop-storefront/0.1")
            .build()?;

        let normalised = format!("{}/", api_url.trim_end_matches('/'));
        let api_url =
            Url::parse(&normalised).map_err(|_| GatewayError::InvalidUrl(api_url.to_string()))?;

        Ok(Self {
            client,
            api_url,
            stripe,
        })
    }

    /// Builds the gateway from storefront settings; the Stripe client uses
    /// the publishable key.
    ///
    /// # Errors
    ///
    /// See [`HttpPaymentGateway::new`].
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, GatewayError> {
        let stripe = StripeClient::with_base_url(
            &config.stripe_publishable_key,
            config.request_timeout_secs,
            &config.stripe_api_base,
        )?;
        Self::new(&config.api_url, stripe, config.request_timeout_secs)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = self
            .api_url
            .join(path)
            .map_err(|_| GatewayError::InvalidUrl(format!("{}{path}", self.api_url)))?;

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text).map_or_else(
                |_| format!("server returned HTTP {}", status.as_u16()),
                |body| body.error,
            );
            tracing::warn!(path, status = status.as_u16(), %message, "payment backend error");
            return Err(GatewayError::Backend(message));
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::Deserialize {
            context: path.to_string(),
            source: e,
        })
    }
}

impl PaymentGateway for HttpPaymentGateway {
    async fn validate_discount(
        &self,
        request: &ValidateDiscountRequest,
    ) -> Result<ValidateDiscountResponse, GatewayError> {
        self.post_json("validate-discount", request).await
    }

    async fn create_payment_intent(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> Result<CreatePaymentIntentResponse, GatewayError> {
        self.post_json("create-payment-intent", request).await
    }

    async fn confirm_payment(
        &self,
        client_secret: &str,
        params: &ConfirmPaymentParams,
    ) -> Result<ConfirmedPayment, GatewayError> {
        let intent = self
            .stripe
            .confirm_payment_intent(client_secret, params)
            .await?;
        Ok(ConfirmedPayment {
            payment_intent_id: intent.id,
            status: intent.status,
        })
    }
}
