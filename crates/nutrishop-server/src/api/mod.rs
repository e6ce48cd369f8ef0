mod admin;
mod payments;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use nutrishop_core::{AdminFailure, ErrorResponse};
use nutrishop_stripe::{StripeClient, StripeError};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, require_bearer_auth, AuthState};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub stripe: StripeClient,
    /// Lower-case ISO 4217 code sent to Stripe.
    pub currency: String,
}

/// Which body shape an error is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    /// `{error}`
    Public,
    /// `{success: false, error}`
    Admin,
}

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    surface: Surface,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ApiError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            surface: Surface::Public,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    /// Renders as an admin failure body.
    #[must_use]
    pub fn admin(mut self) -> Self {
        self.surface = Surface::Admin;
        self
    }

    fn status(&self) -> StatusCode {
        match self.code {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "payment_processor" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match self.surface {
            Surface::Public => (status, Json(ErrorResponse { error: self.message })).into_response(),
            Surface::Admin => (status, Json(AdminFailure::new(self.message))).into_response(),
        }
    }
}

pub(super) fn map_db_error(request_id: &str, error: &nutrishop_db::DbError) -> ApiError {
    tracing::error!(request_id, error = %error, "database query failed");
    ApiError::new("internal_error", "database query failed")
}

/// Stripe's own message is passed through; it is what the caller needs to act on.
pub(super) fn map_stripe_error(request_id: &str, error: &StripeError) -> ApiError {
    tracing::error!(request_id, error = %error, "stripe request failed");
    ApiError::new("payment_processor", error.to_string())
}

pub(super) fn map_json_rejection(rejection: &JsonRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn admin_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/sync-product-to-stripe", post(admin::sync_product))
        .route("/sync-discount-to-stripe", post(admin::sync_discount))
        .route("/delete-product-from-stripe", post(admin::delete_product))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route(
            "/create-payment-intent",
            post(payments::create_payment_intent),
        )
        .route("/validate-discount", post(payments::validate_discount));

    Router::new()
        .merge(public_routes)
        .merge(admin_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match nutrishop_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    database: "unavailable",
                }),
            )
        }
    }
}
