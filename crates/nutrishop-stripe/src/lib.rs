//! Typed client for the subset of the Stripe API the storefront uses:
//! customers, payment intents, coupons, products and prices.

pub mod client;
pub mod error;
pub mod types;

pub use client::{payment_intent_id_from_secret, StripeClient, DEFAULT_BASE_URL};
pub use error::StripeError;
pub use types::{
    Address, ConfirmPaymentParams, Coupon, CouponAmount, CreateCouponParams, CreateCustomerParams,
    CreatePaymentIntentParams, CreatePriceParams, Customer, DeletedObject, FormParams,
    PaymentIntent, Price, Product, ProductParams, Recurring,
};
