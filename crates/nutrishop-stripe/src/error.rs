use thiserror::Error;

/// Errors returned by the Stripe API client.
#[derive(Debug, Error)]
pub enum StripeError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with a non-2xx status and an `{"error": {...}}` body.
    /// `message` is Stripe's own text and is safe to show to the customer.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid Stripe base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl StripeError {
    /// `true` for card errors and other 402 responses.
    #[must_use]
    pub fn is_card_error(&self) -> bool {
        matches!(self, Self::Api { status: 402, .. })
    }
}
