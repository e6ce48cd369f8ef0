use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use nutrishop_core::AdminFailure;
use subtle::{Choice, ConstantTimeEq};
use uuid::Uuid;

const ADMIN_TOKENS_VAR: &str = "NUTRISHOP_ADMIN_TOKENS";

/// Correlation id for one request; handlers log it with every event.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer tokens accepted on the admin sync routes.
#[derive(Clone)]
pub struct AuthState {
    tokens: Arc<Vec<String>>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("tokens", &self.tokens.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl AuthState {
    /// Reads `NUTRISHOP_ADMIN_TOKENS`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no token is configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(ADMIN_TOKENS_VAR).unwrap_or_default();
        Self::from_tokens(&raw, is_development)
    }

    /// Parses a comma-separated token list. An empty list disables auth in
    /// development only.
    ///
    /// # Errors
    ///
    /// Fails when `raw` holds no token and `is_development` is false.
    pub fn from_tokens(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let tokens: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        if tokens.is_empty() {
            if is_development {
                tracing::warn!(
                    "{ADMIN_TOKENS_VAR} not set; admin auth disabled in development environment"
                );
                return Ok(Self {
                    tokens: Arc::new(Vec::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "{ADMIN_TOKENS_VAR} is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(Self {
            tokens: Arc::new(tokens),
            enabled: true,
        })
    }

    /// Compares against every configured token without short-circuiting.
    fn allows(&self, token: &str) -> bool {
        self.tokens
            .iter()
            .fold(Choice::from(0), |found, candidate| {
                found | candidate.as_bytes().ct_eq(token.as_bytes())
            })
            .into()
    }
}

/// Reuses the caller's `x-request-id` or mints a UUID, exposes it to
/// handlers as [`RequestId`] and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Rejects admin requests without a configured bearer token, before any
/// handler runs.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => {
            tracing::warn!(path = %req.uri().path(), "rejected admin request without valid token");
            (
                StatusCode::UNAUTHORIZED,
                Json(AdminFailure::new("Unauthorized")),
            )
                .into_response()
        }
    }
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
