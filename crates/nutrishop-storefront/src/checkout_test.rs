use chrono::Utc;
use nutrishop_core::{CartItem, CartLine, Owner, Product};
use uuid::Uuid;

use super::*;
use crate::cart::CartStore;
use crate::memory::MemoryCartRepository;
use crate::session::{MemorySessionStore, SessionResolver};
use crate::testing::{product, ConfirmOutcome, FakeGateway};

fn line(product: &Product, quantity: i32) -> CartLine {
    let now = Utc::now();
    CartLine {
        item: CartItem {
            id: Uuid::new_v4(),
            owner: Owner::Guest("session_1_abcdefghi".to_string()),
            product_id: product.id,
            quantity,
            created_at: now,
            updated_at: now,
        },
        product: Some(product.clone()),
    }
}

fn sample_cart() -> Vec<CartLine> {
    vec![
        line(&product("Whey", "9.99"), 2),
        line(&product("BCAA", "4.50"), 3),
    ]
}

fn submission() -> CheckoutSubmission {
    CheckoutSubmission {
        contact: ContactDetails {
            email: "ada@example.com".to_string(),
            full_name: "Ada Lovelace".to_string(),
            phone: Some("555-0100".to_string()),
            address: Some(ShippingAddress {
                line1: Some("1 Main St".to_string()),
                city: Some("Springfield".to_string()),
                ..ShippingAddress::default()
            }),
        },
        payment_method: "pm_card_visa".to_string(),
    }
}

fn guest() -> Owner {
    Owner::Guest("session_1_abcdefghi".to_string())
}

#[tokio::test]
async fn empty_cart_fails_without_calling_gateway() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());

    let state = checkout.initialize(&[]).await.unwrap().clone();

    assert_eq!(state, CheckoutState::Failed(CheckoutFailure::EmptyCart));
    assert_eq!(checkout.gateway().intent_calls(), 0);
    assert_eq!(CheckoutFailure::EmptyCart.to_string(), "Cart is empty");
}

#[tokio::test]
async fn cart_of_missing_products_counts_as_empty() {
    let mut orphan = line(&product("Gone", "5.00"), 1);
    orphan.product = None;
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());

    checkout.initialize(&[orphan]).await.unwrap();

    assert_eq!(
        checkout.state(),
        &CheckoutState::Failed(CheckoutFailure::EmptyCart)
    );
    assert_eq!(checkout.gateway().intent_calls(), 0);
}

#[tokio::test]
async fn initialize_requests_intent_for_cart_total() {
    let user_id = Uuid::new_v4();
    let cart = sample_cart();
    let mut checkout = Checkout::new(FakeGateway::default(), &Owner::User(user_id));

    checkout.initialize(&cart).await.unwrap();

    assert_eq!(
        checkout.state(),
        &CheckoutState::Ready {
            client_secret: "pi_test_secret_abc".to_string(),
            payment_intent_id: "pi_test".to_string(),
            amount: 3348,
        }
    );
    let requests = checkout.gateway().intent_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, 3348);
    assert_eq!(requests[0].user_id, Some(user_id));
    assert_eq!(requests[0].items.len(), 2);
    assert!(requests[0].discount_code.is_none());
}

#[tokio::test]
async fn guest_intent_has_no_user_id() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());
    checkout.initialize(&sample_cart()).await.unwrap();

    let requests = checkout.gateway().intent_requests.lock().unwrap().clone();
    assert!(requests[0].user_id.is_none());
}

#[tokio::test]
async fn missing_client_secret_fails() {
    let gateway = FakeGateway {
        client_secret: None,
        ..FakeGateway::default()
    };
    let mut checkout = Checkout::new(gateway, &guest());

    checkout.initialize(&sample_cart()).await.unwrap();

    assert_eq!(
        checkout.state(),
        &CheckoutState::Failed(CheckoutFailure::MissingClientSecret)
    );
}

#[tokio::test]
async fn backend_error_message_is_surfaced() {
    let gateway = FakeGateway {
        intent_error: Some("Invalid amount".to_string()),
        ..FakeGateway::default()
    };
    let mut checkout = Checkout::new(gateway, &guest());

    checkout.initialize(&sample_cart()).await.unwrap();

    let CheckoutState::Failed(failure) = checkout.state() else {
        panic!("expected failure, got {:?}", checkout.state());
    };
    assert_eq!(failure.to_string(), "Invalid amount");
}

#[tokio::test]
async fn discount_is_forwarded_with_intent() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());

    let quote = checkout.apply_discount(" save10 ", &sample_cart()).await.unwrap().clone();
    assert_eq!(quote.code, "SAVE10");
    assert_eq!(quote.final_amount, 3348 - 334);

    checkout.initialize(&sample_cart()).await.unwrap();

    let requests = checkout.gateway().intent_requests.lock().unwrap().clone();
    assert_eq!(requests[0].discount_code.as_deref(), Some("SAVE10"));
    assert!(matches!(
        checkout.state(),
        CheckoutState::Ready { amount: 3014, .. }
    ));
}

#[tokio::test]
async fn discount_is_quoted_against_cart_subtotal() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());
    let cart = sample_cart();

    checkout.apply_discount("SAVE10", &cart).await.unwrap();
    checkout.initialize(&cart).await.unwrap();

    let validated = checkout.gateway().discount_requests.lock().unwrap().clone();
    let intents = checkout.gateway().intent_requests.lock().unwrap().clone();
    assert_eq!(validated[0].amount, 3348);
    assert_eq!(validated[0].amount, intents[0].amount);
}

#[tokio::test]
async fn invalid_discount_leaves_state_unchanged() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());

    let err = checkout.apply_discount("bogus", &sample_cart()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Discount(ref m) if m == "Invalid discount code"));
    assert_eq!(checkout.state(), &CheckoutState::Initializing);
    assert!(checkout.discount().is_none());
}

#[tokio::test]
async fn missing_contact_field_keeps_ready() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());
    checkout.initialize(&sample_cart()).await.unwrap();

    let mut bad = submission();
    bad.contact.email = "  ".to_string();
    let err = checkout.submit(&bad).await.unwrap_err();
    assert!(matches!(err, CheckoutError::MissingContactField("email")));

    let mut bad = submission();
    bad.contact.full_name = String::new();
    let err = checkout.submit(&bad).await.unwrap_err();
    assert!(matches!(err, CheckoutError::MissingContactField("full name")));

    assert!(matches!(checkout.state(), CheckoutState::Ready { .. }));
    assert_eq!(checkout.gateway().confirm_calls(), 0);
}

#[tokio::test]
async fn submit_before_ready_is_rejected() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());
    let err = checkout.submit(&submission()).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InvalidState {
            expected: "ready",
            actual: "initializing"
        }
    ));
}

#[tokio::test]
async fn successful_confirmation_yields_receipt() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());
    checkout.initialize(&sample_cart()).await.unwrap();

    checkout.submit(&submission()).await.unwrap();

    assert_eq!(
        checkout.state(),
        &CheckoutState::Succeeded {
            payment_intent_id: "pi_test".to_string()
        }
    );
    let confirms = checkout.gateway().confirm_requests.lock().unwrap().clone();
    let (secret, params) = &confirms[0];
    assert_eq!(secret, "pi_test_secret_abc");
    assert_eq!(params.receipt_email.as_deref(), Some("ada@example.com"));
    assert_eq!(params.billing_phone.as_deref(), Some("555-0100"));
    assert!(params.shipping_address.is_some());

    let receipt = checkout.receipt().expect("receipt after success");
    assert_eq!(receipt.amount(), 3348);
    assert_eq!(receipt.items().len(), 2);
}

#[tokio::test]
async fn name_and_phone_are_forwarded_without_address() {
    let mut checkout = Checkout::new(FakeGateway::default(), &guest());
    checkout.initialize(&sample_cart()).await.unwrap();

    let mut without_address = submission();
    without_address.contact.address = None;
    checkout.submit(&without_address).await.unwrap();

    let confirms = checkout.gateway().confirm_requests.lock().unwrap().clone();
    let (_, params) = &confirms[0];
    assert_eq!(params.billing_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(params.billing_phone.as_deref(), Some("555-0100"));
    assert!(params.shipping_address.is_none());
    assert!(checkout.receipt().is_some());
}

#[tokio::test]
async fn non_terminal_status_stays_processing() {
    let gateway = FakeGateway {
        confirm: ConfirmOutcome::Status("requires_action"),
        ..FakeGateway::default()
    };
    let mut checkout = Checkout::new(gateway, &guest());
    checkout.initialize(&sample_cart()).await.unwrap();

    checkout.submit(&submission()).await.unwrap();

    assert!(matches!(checkout.state(), CheckoutState::Processing { .. }));
    assert!(checkout.receipt().is_none());
}

#[tokio::test]
async fn declined_confirmation_fails_and_records_no_order() {
    let gateway = FakeGateway {
        confirm: ConfirmOutcome::Declined("Your card was declined."),
        ..FakeGateway::default()
    };
    let mut store = CartStore::new(
        MemoryCartRepository::new(),
        SessionResolver::new(MemorySessionStore::new()),
        None,
    );
    let whey = product("Whey", "9.99");
    store.repository().insert_product(whey.clone()).await;
    store.add_to_cart(whey.id, 2).await.unwrap();

    let mut checkout = Checkout::new(gateway, store.owner());
    checkout.initialize(store.lines()).await.unwrap();
    checkout.submit(&submission()).await.unwrap();

    assert_eq!(
        checkout.state(),
        &CheckoutState::Failed(CheckoutFailure::PaymentDeclined(
            "Your card was declined.".to_string()
        ))
    );
    assert!(checkout.receipt().is_none());
    assert!(store.repository().orders().await.is_empty());
    assert_eq!(store.lines().len(), 1);
}

#[tokio::test]
async fn finalize_order_records_and_clears_cart() {
    let user_id = Uuid::new_v4();
    let mut store = CartStore::new(
        MemoryCartRepository::new(),
        SessionResolver::new(MemorySessionStore::new()),
        Some(user_id),
    );
    let whey = product("Whey", "9.99");
    store.repository().insert_product(whey.clone()).await;
    store.add_to_cart(whey.id, 2).await.unwrap();

    let mut checkout = Checkout::new(FakeGateway::default(), store.owner());
    checkout.apply_discount("SAVE10", store.lines()).await.unwrap();
    checkout.initialize(store.lines()).await.unwrap();
    let details = submission();
    checkout.submit(&details).await.unwrap();
    let receipt = checkout.receipt().expect("succeeded");

    let order_id = store
        .finalize_order(&receipt, &details.contact)
        .await
        .unwrap();

    let orders = store.repository().orders().await;
    assert_eq!(orders.len(), 1);
    let (id, order) = &orders[0];
    assert_eq!(*id, order_id);
    assert_eq!(order.user_id, Some(user_id));
    assert_eq!(order.stripe_payment_id, "pi_test");
    assert_eq!(order.discount_code.as_deref(), Some("SAVE10"));
    assert_eq!(order.total_amount, rust_decimal::Decimal::new(1799, 2));
    assert_eq!(order.items[0].price_at_time, whey.price);
    assert_eq!(order.shipping_address["line1"], "1 Main St");
    assert!(store.lines().is_empty());

    let again = store
        .finalize_order(&receipt, &details.contact)
        .await
        .unwrap();
    assert_eq!(again, order_id);
    assert_eq!(store.repository().orders().await.len(), 1);
}
