//! Client-side cart and checkout for the nutrishop storefront.

pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod repository;
pub mod session;

pub use cart::CartStore;
pub use checkout::{
    Checkout, CheckoutFailure, CheckoutState, CheckoutSubmission, CompletedCheckout,
    ContactDetails, ShippingAddress,
};
pub use error::{CartError, CheckoutError, GatewayError, SessionError};
pub use gateway::{ConfirmedPayment, HttpPaymentGateway, PaymentGateway};
pub use memory::MemoryCartRepository;
pub use repository::{CartRepository, PgCartRepository};
pub use session::{
    generate_session_id, FileSessionStore, MemorySessionStore, SessionResolver, SessionStore,
    SESSION_STORAGE_KEY,
};

#[cfg(test)]
pub(crate) mod testing;
