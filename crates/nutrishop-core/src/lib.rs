pub mod app_config;
pub mod cart;
pub mod config;
pub mod discounts;
pub mod money;
pub mod payments;
pub mod products;

pub use app_config::{AppConfig, Environment, StorefrontConfig};
pub use cart::{cart_subtotal, CartItem, CartLine, Owner};
pub use config::{
    load_app_config, load_app_config_from_env, load_storefront_config,
    load_storefront_config_from_env,
};
pub use discounts::{CouponDuration, DiscountCode, DiscountKind, DiscountQuote, DiscountRejection};
pub use money::{format_minor_units, to_minor_units};
pub use payments::{
    AdminFailure, CreatePaymentIntentRequest, CreatePaymentIntentResponse, ErrorResponse,
    PaymentItem, ValidateDiscountRequest, ValidateDiscountResponse,
};
pub use products::{Product, SubscriptionInterval, SyncStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cart row {0} has an invalid owner (exactly one of user_id/session_id must be set)")]
    InvalidOwner(uuid::Uuid),

    #[error("amount {0} cannot be represented in minor units")]
    AmountOutOfRange(rust_decimal::Decimal),

    #[error("unknown discount type: {0}")]
    UnknownDiscountType(String),

    #[error("unknown coupon duration: {0}")]
    UnknownCouponDuration(String),
}
