use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings for the server and admin CLI.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// `None` is allowed for the CLI; the server refuses to start without it.
    pub stripe_secret_key: Option<String>,
    pub stripe_publishable_key: Option<String>,
    pub stripe_api_base: String,
    pub stripe_timeout_secs: u64,
    /// ISO 4217 code in Stripe's lower-case form.
    pub currency: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field(
                "stripe_secret_key",
                &self.stripe_secret_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "stripe_publishable_key",
                &self.stripe_publishable_key.as_ref().map(|_| "[redacted]"),
            )
            .field("stripe_api_base", &self.stripe_api_base)
            .field("stripe_timeout_secs", &self.stripe_timeout_secs)
            .field("currency", &self.currency)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}

/// Settings for the client-side storefront library.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the nutrishop server (payment-intent and discount endpoints).
    pub api_url: String,
    pub stripe_publishable_key: String,
    pub stripe_api_base: String,
    pub request_timeout_secs: u64,
    /// File holding the anonymous cart session identifier.
    pub session_path: PathBuf,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url)
            .field("stripe_publishable_key", &"[redacted]")
            .field("stripe_api_base", &self.stripe_api_base)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("session_path", &self.session_path)
            .finish()
    }
}
