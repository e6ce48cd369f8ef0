//! `HttpPaymentGateway` against mocked server and Stripe endpoints.

use nutrishop_core::{CreatePaymentIntentRequest, PaymentItem, ValidateDiscountRequest};
use nutrishop_storefront::{
    Checkout, CheckoutFailure, CheckoutState, GatewayError, HttpPaymentGateway, PaymentGateway,
};
use nutrishop_stripe::{ConfirmPaymentParams, StripeClient};
use uuid::Uuid;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(api: &MockServer, stripe: &MockServer) -> HttpPaymentGateway {
    let stripe = StripeClient::with_base_url("pk_test_123", 5, &stripe.uri())
        .expect("stripe client should build");
    HttpPaymentGateway::new(&format!("{}/functions/v1", api.uri()), stripe, 5)
        .expect("gateway should build")
}

#[tokio::test]
async fn create_payment_intent_posts_camel_case_body() {
    let api = MockServer::start().await;
    let stripe = MockServer::start().await;
    let product_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/functions/v1/create-payment-intent"))
        .and(body_json(serde_json::json!({
            "amount": 3348,
            "items": [{"productId": product_id, "quantity": 2}],
            "discountCode": "SAVE10"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "clientSecret": "pi_1_secret_x",
            "paymentIntentId": "pi_1",
            "amount": 3013
        })))
        .expect(1)
        .mount(&api)
        .await;

    let response = gateway(&api, &stripe)
        .create_payment_intent(&CreatePaymentIntentRequest {
            amount: 3348,
            user_id: None,
            items: vec![PaymentItem {
                product_id,
                quantity: 2,
            }],
            discount_code: Some("SAVE10".to_string()),
        })
        .await
        .expect("intent should be created");

    assert_eq!(response.client_secret.as_deref(), Some("pi_1_secret_x"));
    assert_eq!(response.amount, 3013);
}

#[tokio::test]
async fn backend_error_body_becomes_message() {
    let api = MockServer::start().await;
    let stripe = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/validate-discount"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "Discount code has expired"})),
        )
        .mount(&api)
        .await;

    let err = gateway(&api, &stripe)
        .validate_discount(&ValidateDiscountRequest {
            code: "OLD".to_string(),
            amount: 1000,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Backend(ref m) if m == "Discount code has expired"));
}

#[tokio::test]
async fn non_json_error_falls_back_to_status() {
    let api = MockServer::start().await;
    let stripe = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/create-payment-intent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&api)
        .await;

    let err = gateway(&api, &stripe)
        .create_payment_intent(&CreatePaymentIntentRequest {
            amount: 100,
            user_id: None,
            items: Vec::new(),
            discount_code: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "server returned HTTP 503");
}

#[tokio::test]
async fn confirm_goes_to_stripe_with_publishable_key() {
    let api = MockServer::start().await;
    let stripe = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_1/confirm"))
        .and(header("authorization", "Bearer pk_test_123"))
        .and(body_string_contains("client_secret=pi_1_secret_x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_1",
            "amount": 3348,
            "status": "succeeded"
        })))
        .expect(1)
        .mount(&stripe)
        .await;

    let confirmed = gateway(&api, &stripe)
        .confirm_payment(
            "pi_1_secret_x",
            &ConfirmPaymentParams {
                payment_method: "pm_card_visa".to_string(),
                ..ConfirmPaymentParams::default()
            },
        )
        .await
        .expect("confirmation should succeed");

    assert!(confirmed.is_succeeded());
    assert_eq!(confirmed.payment_intent_id, "pi_1");
}

#[tokio::test]
async fn confirm_sends_contact_without_address() {
    let api = MockServer::start().await;
    let stripe = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_1/confirm"))
        .and(body_string_contains("shipping%5Bname%5D=Ada+Lovelace"))
        .and(body_string_contains("shipping%5Bphone%5D=555-0100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_1",
            "amount": 3348,
            "status": "succeeded"
        })))
        .expect(1)
        .mount(&stripe)
        .await;

    let confirmed = gateway(&api, &stripe)
        .confirm_payment(
            "pi_1_secret_x",
            &ConfirmPaymentParams {
                payment_method: "pm_card_visa".to_string(),
                billing_name: Some("Ada Lovelace".to_string()),
                billing_phone: Some("555-0100".to_string()),
                ..ConfirmPaymentParams::default()
            },
        )
        .await
        .expect("confirmation should succeed");

    assert!(confirmed.is_succeeded());
}

#[tokio::test]
async fn checkout_surfaces_server_error_verbatim() {
    let api = MockServer::start().await;
    let stripe = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/create-payment-intent"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "Invalid amount"})),
        )
        .mount(&api)
        .await;

    let product = nutrishop_core::Product {
        id: Uuid::new_v4(),
        name: "Whey".to_string(),
        slug: "whey".to_string(),
        description: None,
        price: rust_decimal::Decimal::new(999, 2),
        image_url: None,
        stock_quantity: 10,
        is_featured: false,
        is_top_selling: false,
        is_subscription: false,
        subscription_interval: None,
        subscription_interval_count: None,
        stripe_product_id: None,
        stripe_price_id: None,
        created_at: chrono::Utc::now(),
    };
    let now = chrono::Utc::now();
    let owner = nutrishop_core::Owner::Guest("session_1_abcdefghi".to_string());
    let line = nutrishop_core::CartLine {
        item: nutrishop_core::CartItem {
            id: Uuid::new_v4(),
            owner: owner.clone(),
            product_id: product.id,
            quantity: 1,
            created_at: now,
            updated_at: now,
        },
        product: Some(product),
    };

    let mut checkout = Checkout::new(gateway(&api, &stripe), &owner);
    checkout.initialize(&[line]).await.expect("valid state");

    assert_eq!(
        checkout.state(),
        &CheckoutState::Failed(CheckoutFailure::Backend("Invalid amount".to_string()))
    );
}
