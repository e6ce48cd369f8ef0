use chrono::Utc;
use nutrishop_core::DiscountCode;

/// Prints discount codes with their redemption and Stripe sync state.
///
/// # Errors
///
/// Returns an error if the query fails or a row holds an unknown type.
pub(crate) async fn run_discounts_list(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let rows = nutrishop_db::list_discounts(pool).await?;
    if rows.is_empty() {
        println!("no discount codes found");
        return Ok(());
    }

    let now = Utc::now();
    println!(
        "{:<16}{:<14}{:<10}{:<12}{:<10}STRIPE COUPON",
        "CODE", "TYPE", "VALUE", "REDEEMED", "STATE"
    );
    for row in rows {
        let discount = DiscountCode::try_from(row)?;
        let state = match discount.check_redeemable(now) {
            Ok(()) => "usable".to_string(),
            Err(rejection) => rejection_label(rejection).to_string(),
        };
        let redeemed = match discount.max_redemptions {
            Some(max) => format!("{}/{max}", discount.redemptions_count),
            None => discount.redemptions_count.to_string(),
        };
        println!(
            "{:<16}{:<14}{:<10}{:<12}{:<10}{}",
            discount.code,
            discount.discount_type.as_str(),
            discount.discount_value,
            redeemed,
            state,
            discount.stripe_coupon_id.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

fn rejection_label(rejection: nutrishop_core::DiscountRejection) -> &'static str {
    match rejection {
        nutrishop_core::DiscountRejection::Inactive => "inactive",
        nutrishop_core::DiscountRejection::Expired => "expired",
        nutrishop_core::DiscountRejection::Exhausted => "exhausted",
    }
}
