//! Admin endpoints that push catalog data to Stripe.
//!
//! Every error here renders as `{success: false, error}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use nutrishop_core::{to_minor_units, DiscountCode, DiscountKind, SubscriptionInterval};
use nutrishop_db::ProductRow;
use nutrishop_stripe::{
    CouponAmount, CreateCouponParams, CreatePriceParams, ProductParams, StripeClient,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, map_json_rejection, map_stripe_error, ApiError, AppState};

const ALREADY_SYNCED: &str = "Discount already synced to Stripe";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncDiscountRequest {
    discount_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncDiscountResponse {
    success: bool,
    stripe_coupon_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncProductRequest {
    product_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncProductResponse {
    success: bool,
    stripe_product_id: String,
    stripe_price_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeleteProductRequest {
    #[serde(default)]
    stripe_product_id: String,
    stripe_price_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct DeleteProductResponse {
    success: bool,
    message: &'static str,
}

// ---------------------------------------------------------------------------
// Discounts
// ---------------------------------------------------------------------------

fn coupon_params(discount: &DiscountCode, currency: &str) -> Result<CreateCouponParams, ApiError> {
    let amount = match discount.discount_type {
        DiscountKind::Percentage => CouponAmount::PercentOff(discount.discount_value),
        DiscountKind::FixedAmount => CouponAmount::AmountOff {
            amount: to_minor_units(discount.discount_value)
                .map_err(|e| ApiError::bad_request(e.to_string()).admin())?,
            currency: currency.to_string(),
        },
    };

    Ok(CreateCouponParams {
        amount,
        duration: discount.duration.as_str().to_string(),
        duration_in_months: discount.duration_in_months,
        max_redemptions: discount.max_redemptions,
        redeem_by: discount.expires_at.map(|at| at.timestamp()),
        name: Some(discount.code.clone()),
        metadata: vec![
            ("database_id".to_string(), discount.id.to_string()),
            ("code".to_string(), discount.code.clone()),
        ],
    })
}

/// Deletes a coupon that could not be recorded. Failure only leaves an
/// orphan coupon in Stripe, so it is logged.
async fn discard_coupon(stripe: &StripeClient, request_id: &str, coupon_id: &str) {
    match stripe.delete_coupon(coupon_id).await {
        Ok(_) => tracing::info!(request_id, coupon_id, "discarded duplicate coupon"),
        Err(e) => {
            tracing::warn!(request_id, coupon_id, error = %e, "failed to delete duplicate coupon");
        }
    }
}

pub(super) async fn sync_discount(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<SyncDiscountRequest>, JsonRejection>,
) -> Result<Json<SyncDiscountResponse>, ApiError> {
    let Json(request) = body.map_err(|e| map_json_rejection(&e).admin())?;
    let request_id = req_id.0.as_str();

    let row = nutrishop_db::get_discount_by_id(&state.pool, request.discount_id)
        .await
        .map_err(|e| map_db_error(request_id, &e).admin())?
        .ok_or_else(|| ApiError::new("not_found", "Discount code not found").admin())?;
    let discount = DiscountCode::try_from(row).map_err(|e| map_db_error(request_id, &e).admin())?;

    if discount.stripe_coupon_id.is_some() {
        return Err(ApiError::bad_request(ALREADY_SYNCED).admin());
    }

    let params = coupon_params(&discount, &state.currency)?;
    let coupon = state
        .stripe
        .create_coupon(&params)
        .await
        .map_err(|e| map_stripe_error(request_id, &e).admin())?;

    // Guarded write: only the first sync to finish may record its coupon.
    match nutrishop_db::set_stripe_coupon_id_if_unset(&state.pool, discount.id, &coupon.id).await {
        Ok(true) => {
            tracing::info!(
                request_id,
                discount_id = %discount.id,
                coupon_id = %coupon.id,
                "discount synced to stripe"
            );
            Ok(Json(SyncDiscountResponse {
                success: true,
                stripe_coupon_id: coupon.id,
            }))
        }
        Ok(false) => {
            tracing::warn!(request_id, discount_id = %discount.id, "lost coupon sync race");
            discard_coupon(&state.stripe, request_id, &coupon.id).await;
            Err(ApiError::bad_request(ALREADY_SYNCED).admin())
        }
        Err(e) => {
            discard_coupon(&state.stripe, request_id, &coupon.id).await;
            Err(map_db_error(request_id, &e).admin())
        }
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Creates or updates the Stripe product for `row` and makes sure it has a
/// price matching the catalog. Returns `(product_id, price_id)`.
async fn push_product(
    stripe: &StripeClient,
    currency: &str,
    row: &ProductRow,
) -> anyhow::Result<(String, String)> {
    let params = ProductParams {
        name: row.name.clone(),
        description: row.description.clone(),
        image_url: row.image_url.clone(),
        metadata: vec![
            ("database_id".to_string(), row.id.to_string()),
            ("is_subscription".to_string(), row.is_subscription.to_string()),
        ],
    };

    let product = match &row.stripe_product_id {
        Some(existing) => {
            let product = stripe.update_product(existing, &params).await?;
            if product.active {
                product
            } else {
                stripe.set_product_active(existing, true).await?
            }
        }
        None => stripe.create_product(&params).await?,
    };

    let unit_amount = to_minor_units(row.price)?;
    let price_metadata = vec![("database_id".to_string(), row.id.to_string())];

    let recurring = if row.is_subscription {
        let interval = row
            .subscription_interval
            .as_deref()
            .and_then(SubscriptionInterval::parse)
            .unwrap_or(SubscriptionInterval::Month);
        Some((
            interval.as_str().to_string(),
            row.subscription_interval_count.unwrap_or(1),
        ))
    } else {
        None
    };

    if let Some(old_price) = &row.stripe_price_id {
        if recurring.is_none() {
            let existing = stripe.retrieve_price(old_price).await?;
            if existing.unit_amount == Some(unit_amount) && existing.recurring.is_none() {
                if !existing.active {
                    stripe.set_price_active(old_price, true).await?;
                }
                return Ok((product.id, existing.id));
            }
        }
        // Stripe prices are immutable; replace rather than edit.
        stripe.set_price_active(old_price, false).await?;
    }

    let price = stripe
        .create_price(&CreatePriceParams {
            product: product.id.clone(),
            unit_amount,
            currency: currency.to_string(),
            recurring,
            metadata: price_metadata,
        })
        .await?;

    Ok((product.id, price.id))
}

pub(super) async fn sync_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<SyncProductRequest>, JsonRejection>,
) -> Result<Json<SyncProductResponse>, ApiError> {
    let Json(request) = body.map_err(|e| map_json_rejection(&e).admin())?;
    let request_id = req_id.0.as_str();

    let row = nutrishop_db::get_product(&state.pool, request.product_id)
        .await
        .map_err(|e| map_db_error(request_id, &e).admin())?
        .ok_or_else(|| ApiError::new("not_found", "Product not found").admin())?;

    nutrishop_db::mark_product_sync_started(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(request_id, &e).admin())?;

    match push_product(&state.stripe, &state.currency, &row).await {
        Ok((stripe_product_id, stripe_price_id)) => {
            nutrishop_db::mark_product_synced(&state.pool, row.id, &stripe_product_id, &stripe_price_id)
                .await
                .map_err(|e| map_db_error(request_id, &e).admin())?;
            tracing::info!(
                request_id,
                product_id = %row.id,
                %stripe_product_id,
                %stripe_price_id,
                "product synced to stripe"
            );
            Ok(Json(SyncProductResponse {
                success: true,
                stripe_product_id,
                stripe_price_id,
            }))
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!(request_id, product_id = %row.id, error = %message, "product sync failed");
            if let Err(db_err) =
                nutrishop_db::mark_product_sync_failed(&state.pool, row.id, &message).await
            {
                tracing::warn!(request_id, error = %db_err, "failed to record product sync error");
            }
            Err(ApiError::new("payment_processor", message).admin())
        }
    }
}

pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<DeleteProductRequest>, JsonRejection>,
) -> Result<Json<DeleteProductResponse>, ApiError> {
    let Json(request) = body.map_err(|e| map_json_rejection(&e).admin())?;
    let request_id = req_id.0.as_str();

    let product_id = request.stripe_product_id.trim();
    if product_id.is_empty() {
        return Err(ApiError::bad_request("Stripe product ID is required").admin());
    }

    if let Some(price_id) = request.stripe_price_id.as_deref() {
        if let Err(e) = state.stripe.set_price_active(price_id, false).await {
            tracing::warn!(request_id, price_id, error = %e, "failed to deactivate price");
        }
    }

    state
        .stripe
        .set_product_active(product_id, false)
        .await
        .map_err(|e| map_stripe_error(request_id, &e).admin())?;

    tracing::info!(request_id, stripe_product_id = product_id, "product archived in stripe");
    Ok(Json(DeleteProductResponse {
        success: true,
        message: "Product archived in Stripe successfully",
    }))
}
