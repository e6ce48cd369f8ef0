mod api;
mod middleware;

use nutrishop_stripe::StripeClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = nutrishop_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let secret_key = config
        .stripe_secret_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("STRIPE_SECRET_KEY is required to run the server"))?;
    let stripe = StripeClient::with_base_url(
        secret_key,
        config.stripe_timeout_secs,
        &config.stripe_api_base,
    )?;

    let pool_config = nutrishop_db::PoolConfig::from_app_config(&config);
    let pool = nutrishop_db::connect_pool(&config.database_url, pool_config).await?;
    nutrishop_db::run_migrations(&pool).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        nutrishop_core::Environment::Development
    ))?;
    let app = build_app(
        AppState {
            pool,
            stripe,
            currency: config.currency.clone(),
        },
        auth,
    );

    tracing::info!(bind_addr = %config.bind_addr, env = %config.env, "nutrishop server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
