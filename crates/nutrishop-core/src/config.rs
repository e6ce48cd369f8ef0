use crate::app_config::{AppConfig, Environment, StorefrontConfig};
use crate::ConfigError;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load storefront configuration, reading `.env` first.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_storefront_config() -> Result<StorefrontConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_storefront_config_from_env()
}

/// Load storefront configuration from the current process environment.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_storefront_config_from_env() -> Result<StorefrontConfig, ConfigError> {
    build_storefront_config(|key| std::env::var(key))
}

struct Lookup<F> {
    lookup: F,
}

impl<F> Lookup<F>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    fn require(&self, var: &str) -> Result<String, ConfigError> {
        (self.lookup)(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    }

    fn optional(&self, var: &str) -> Option<String> {
        (self.lookup)(var).ok().filter(|v| !v.trim().is_empty())
    }

    fn or_default(&self, var: &str, default: &str) -> String {
        (self.lookup)(var).unwrap_or_else(|_| default.to_string())
    }

    fn parse<T>(&self, var: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.or_default(var, default);
        raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can use a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let env = Lookup { lookup };

    let database_url = env.require("DATABASE_URL")?;
    let environment = parse_environment(&env.or_default("NUTRISHOP_ENV", "development"));
    let bind_addr = env.parse("NUTRISHOP_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = env.or_default("NUTRISHOP_LOG_LEVEL", "info");

    let stripe_secret_key = env.optional("STRIPE_SECRET_KEY");
    let stripe_publishable_key = env.optional("STRIPE_PUBLISHABLE_KEY");
    let stripe_api_base = env.or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE);
    let stripe_timeout_secs = env.parse("NUTRISHOP_STRIPE_TIMEOUT_SECS", "30")?;
    let currency = env.or_default("NUTRISHOP_CURRENCY", "usd").to_lowercase();

    let db_max_connections = env.parse("NUTRISHOP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = env.parse("NUTRISHOP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = env.parse("NUTRISHOP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env: environment,
        bind_addr,
        log_level,
        stripe_secret_key,
        stripe_publishable_key,
        stripe_api_base,
        stripe_timeout_secs,
        currency,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

fn build_storefront_config<F>(lookup: F) -> Result<StorefrontConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let env = Lookup { lookup };

    Ok(StorefrontConfig {
        api_url: env.require("NUTRISHOP_API_URL")?,
        stripe_publishable_key: env.require("STRIPE_PUBLISHABLE_KEY")?,
        stripe_api_base: env.or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
        request_timeout_secs: env.parse("NUTRISHOP_STOREFRONT_TIMEOUT_SECS", "30")?,
        session_path: env.parse("NUTRISHOP_SESSION_PATH", "./.nutrishop/session.json")?,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
