use nutrishop_core::CoreError;
use nutrishop_db::DbError;
use nutrishop_stripe::StripeError;
use thiserror::Error;

/// Failures of the durable session storage. Never surfaced by
/// [`crate::SessionResolver`], which logs them instead.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session storage is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors from cart mutations. Reads never return these; they degrade to an
/// empty cart instead.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("cart storage error: {0}")]
    Db(#[from] DbError),

    /// Non-database backend failure (e.g. an in-memory repository that was
    /// told to fail).
    #[error("cart storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Errors talking to the payment backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network or TLS failure reaching the server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered `{error}`; the message is user-facing.
    #[error("{0}")]
    Backend(String),

    /// Stripe rejected the confirmation; the message is user-facing.
    #[error(transparent)]
    Stripe(#[from] StripeError),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API URL '{0}'")]
    InvalidUrl(String),
}

/// Misuse of the checkout orchestrator. Payment failures are not errors;
/// they move the state machine to [`crate::CheckoutState::Failed`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("checkout is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0} is required")]
    MissingContactField(&'static str),

    /// The discount code was rejected; the message is user-facing.
    #[error("{0}")]
    Discount(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
