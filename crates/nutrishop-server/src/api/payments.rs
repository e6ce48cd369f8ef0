//! Public payment endpoints called by the storefront.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::Utc;
use nutrishop_core::{
    CreatePaymentIntentRequest, CreatePaymentIntentResponse, DiscountCode, ValidateDiscountRequest,
    ValidateDiscountResponse,
};
use nutrishop_stripe::{CreateCustomerParams, CreatePaymentIntentParams};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, map_json_rejection, map_stripe_error, ApiError, AppState};

/// Looks up `code` and prices it against `amount`.
///
/// Unknown codes and codes that are inactive, expired, or exhausted are
/// rejected with the reason as the message.
async fn quote_discount(
    state: &AppState,
    request_id: &str,
    code: &str,
    amount: i64,
) -> Result<(DiscountCode, nutrishop_core::DiscountQuote), ApiError> {
    let row = nutrishop_db::get_discount_by_code(&state.pool, code)
        .await
        .map_err(|e| map_db_error(request_id, &e))?
        .ok_or_else(|| ApiError::bad_request("Invalid discount code"))?;
    let discount = DiscountCode::try_from(row).map_err(|e| map_db_error(request_id, &e))?;

    let quote = discount
        .quote(amount, Utc::now())
        .map_err(|rejection| ApiError::bad_request(rejection.to_string()))?;
    Ok((discount, quote))
}

/// Returns the user's Stripe customer, creating and recording one on first
/// purchase. Users without a profile pay without a customer.
async fn resolve_customer(
    state: &AppState,
    request_id: &str,
    user_id: Uuid,
) -> Result<Option<String>, ApiError> {
    let Some(profile) = nutrishop_db::get_user_profile(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(request_id, &e))?
    else {
        tracing::debug!(request_id, %user_id, "no profile; paying without a customer");
        return Ok(None);
    };

    if let Some(customer_id) = profile.stripe_customer_id {
        return Ok(Some(customer_id));
    }

    let customer = state
        .stripe
        .create_customer(&CreateCustomerParams {
            email: None,
            name: profile.full_name,
            metadata: vec![("user_id".to_string(), user_id.to_string())],
        })
        .await
        .map_err(|e| map_stripe_error(request_id, &e))?;

    if let Err(e) = nutrishop_db::set_stripe_customer_id(&state.pool, user_id, &customer.id).await
    {
        tracing::warn!(request_id, %user_id, error = %e, "failed to record stripe customer id");
    }
    tracing::info!(request_id, %user_id, customer_id = %customer.id, "created stripe customer");
    Ok(Some(customer.id))
}

pub(super) async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentIntentResponse>, ApiError> {
    let Json(request) = body.map_err(|e| map_json_rejection(&e))?;
    let request_id = req_id.0.as_str();

    if request.amount <= 0 {
        return Err(ApiError::bad_request("Invalid amount"));
    }
    if request.items.is_empty() {
        return Err(ApiError::bad_request("No items provided"));
    }

    let customer = match request.user_id {
        Some(user_id) => resolve_customer(&state, request_id, user_id).await?,
        None => None,
    };

    let items = serde_json::to_string(&request.items).map_err(|e| {
        tracing::error!(request_id, error = %e, "failed to encode items metadata");
        ApiError::new("internal_error", "failed to encode items")
    })?;
    let mut metadata = vec![
        (
            "user_id".to_string(),
            request
                .user_id
                .map_or_else(|| "guest".to_string(), |id| id.to_string()),
        ),
        ("items".to_string(), items),
    ];

    let mut amount = request.amount;
    let discount_code = request
        .discount_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());
    if let Some(code) = discount_code {
        let (discount, quote) = quote_discount(&state, request_id, code, amount).await?;
        if quote.final_amount <= 0 {
            return Err(ApiError::bad_request(
                "Discounted amount must be greater than zero",
            ));
        }
        metadata.push(("discount_code".to_string(), quote.code.clone()));
        metadata.push(("original_amount".to_string(), quote.original_amount.to_string()));
        metadata.push(("discount_amount".to_string(), quote.discount_amount.to_string()));
        if let Some(coupon_id) = discount.stripe_coupon_id {
            metadata.push(("stripe_coupon_id".to_string(), coupon_id));
        }
        amount = quote.final_amount;
    }

    let intent = state
        .stripe
        .create_payment_intent(&CreatePaymentIntentParams {
            amount,
            currency: state.currency.clone(),
            customer,
            metadata,
        })
        .await
        .map_err(|e| map_stripe_error(request_id, &e))?;

    tracing::info!(
        request_id,
        payment_intent_id = %intent.id,
        amount = intent.amount,
        discounted = discount_code.is_some(),
        "payment intent created"
    );
    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        amount: intent.amount,
    }))
}

pub(super) async fn validate_discount(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<ValidateDiscountRequest>, JsonRejection>,
) -> Result<Json<ValidateDiscountResponse>, ApiError> {
    let Json(request) = body.map_err(|e| map_json_rejection(&e))?;

    let code = request.code.trim();
    if code.is_empty() {
        return Err(ApiError::bad_request("Discount code is required"));
    }
    if request.amount <= 0 {
        return Err(ApiError::bad_request("Invalid amount"));
    }

    let (_, quote) = quote_discount(&state, &req_id.0, code, request.amount).await?;
    Ok(Json(ValidateDiscountResponse {
        code: quote.code,
        discount_type: quote.discount_type,
        original_amount: quote.original_amount,
        discount_amount: quote.discount_amount,
        final_amount: quote.final_amount,
    }))
}
