//! Order inspection and fulfilment status updates.

use clap::Subcommand;
use nutrishop_db::ORDER_STATUSES;
use uuid::Uuid;

#[derive(Debug, Subcommand)]
pub enum OrdersCommands {
    /// List recent orders
    List {
        /// Only show orders with this status
        #[arg(long)]
        status: Option<String>,
        /// Maximum number of orders to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show one order with its line items
    Show {
        #[arg(long)]
        id: Uuid,
    },
    /// Move an order to a new fulfilment status
    SetStatus {
        #[arg(long)]
        id: Uuid,
        /// One of pending, processing, shipped, delivered, cancelled
        #[arg(long)]
        status: String,
    },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: OrdersCommands) -> anyhow::Result<()> {
    match command {
        OrdersCommands::List { status, limit } => {
            let status = status.as_deref().map(validate_status).transpose()?;
            run_orders_list(pool, status, i64::from(limit)).await
        }
        OrdersCommands::Show { id } => run_orders_show(pool, id).await,
        OrdersCommands::SetStatus { id, status } => {
            let status = validate_status(&status)?;
            nutrishop_db::update_order_status(pool, id, status)
                .await
                .map_err(|e| match e {
                    nutrishop_db::DbError::NotFound => anyhow::anyhow!("order {id} not found"),
                    other => other.into(),
                })?;
            tracing::info!(order_id = %id, status, "order status updated");
            println!("order {id} is now {status}");
            Ok(())
        }
    }
}

/// Returns the canonical status string, or an error naming the valid ones.
pub(crate) fn validate_status(status: &str) -> anyhow::Result<&'static str> {
    let wanted = status.trim().to_ascii_lowercase();
    ORDER_STATUSES
        .iter()
        .copied()
        .find(|known| *known == wanted)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "unknown order status '{status}'; expected one of: {}",
                ORDER_STATUSES.join(", ")
            )
        })
}

async fn run_orders_list(
    pool: &sqlx::PgPool,
    status: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let orders = nutrishop_db::list_orders(pool, status, limit).await?;

    if orders.is_empty() {
        println!(
            "no orders found{}",
            status.map(|s| format!(" with status {s}")).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<38}{:<18}{:<12}{:<11}{:<12}CUSTOMER",
        "ID", "PLACED", "STATUS", "TOTAL", "DISCOUNT"
    );
    for order in &orders {
        let total = format!("{:.2}", order.total_amount);
        println!(
            "{:<38}{:<18}{:<12}{:<11}{:<12}{} <{}>",
            order.id,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.status,
            total,
            order.discount_code.as_deref().unwrap_or("-"),
            order.customer_name,
            order.customer_email,
        );
    }

    Ok(())
}

async fn run_orders_show(pool: &sqlx::PgPool, id: Uuid) -> anyhow::Result<()> {
    let order = nutrishop_db::get_order(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("order {id} not found"))?;
    let items = nutrishop_db::list_order_items(pool, id).await?;

    println!("Order: {}", order.id);
    println!("Status: {}", order.status);
    println!("Customer: {} <{}>", order.customer_name, order.customer_email);
    if let Some(phone) = &order.customer_phone {
        println!("Phone: {phone}");
    }
    println!("Ship to: {}", order.shipping_address);
    println!("Payment: {}", order.stripe_payment_id);
    if let Some(code) = &order.discount_code {
        println!("Discount: {code}");
    }
    println!("Total: {:.2}", order.total_amount);
    println!();
    println!("{:<38}{:<6}PRICE", "PRODUCT", "QTY");
    for item in &items {
        println!(
            "{:<38}{:<6}{:.2}",
            item.product_id, item.quantity, item.price_at_time
        );
    }

    Ok(())
}
