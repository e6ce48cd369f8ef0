mod discounts;
mod orders;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::orders::OrdersCommands;

#[derive(Debug, Parser)]
#[command(name = "nutrishop-cli")]
#[command(about = "Nutrishop operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect discount codes and their Stripe coupons
    Discounts {
        #[command(subcommand)]
        command: DiscountsCommands,
    },
    /// Inspect and fulfil orders
    Orders {
        #[command(subcommand)]
        command: OrdersCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check connectivity and that migrations have run
    Ping,
}

#[derive(Debug, Subcommand)]
enum DiscountsCommands {
    /// List every discount code, newest first
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("nutrishop-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = nutrishop_core::load_app_config()?;
    let pool = nutrishop_db::connect_pool(
        &config.database_url,
        nutrishop_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match command {
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = nutrishop_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            nutrishop_db::health_check(&pool).await?;
            println!("database reachable and migrated");
        }
        Commands::Discounts {
            command: DiscountsCommands::List,
        } => discounts::run_discounts_list(&pool).await?,
        Commands::Orders { command } => orders::run(&pool, command).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
