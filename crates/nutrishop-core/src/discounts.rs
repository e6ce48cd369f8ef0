//! Discount codes and the arithmetic that turns them into an amount off.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    FixedAmount,
}

impl DiscountKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
        }
    }
}

impl std::str::FromStr for DiscountKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed_amount" => Ok(Self::FixedAmount),
            other => Err(CoreError::UnknownDiscountType(other.to_string())),
        }
    }
}

/// Mirrors Stripe's coupon `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponDuration {
    Once,
    Repeating,
    Forever,
}

impl CouponDuration {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Repeating => "repeating",
            Self::Forever => "forever",
        }
    }
}

impl std::str::FromStr for CouponDuration {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(Self::Once),
            "repeating" => Ok(Self::Repeating),
            "forever" => Ok(Self::Forever),
            other => Err(CoreError::UnknownCouponDuration(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: Uuid,
    /// Stored upper-case; see [`DiscountCode::normalize`].
    pub code: String,
    pub discount_type: DiscountKind,
    /// Percent (e.g. `15`) for percentage codes, major currency units for fixed ones.
    pub discount_value: Decimal,
    pub duration: CouponDuration,
    pub duration_in_months: Option<i32>,
    pub is_active: bool,
    pub max_redemptions: Option<i32>,
    pub redemptions_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub stripe_coupon_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Why a code cannot be redeemed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DiscountRejection {
    #[error("Discount code is not active")]
    Inactive,
    #[error("Discount code has expired")]
    Expired,
    #[error("Discount code has reached its redemption limit")]
    Exhausted,
}

/// The effect of a code on a specific amount, in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountQuote {
    pub code: String,
    pub discount_type: DiscountKind,
    pub original_amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
}

impl DiscountCode {
    /// Canonical form used for storage and lookup: trimmed and upper-cased.
    #[must_use]
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// # Errors
    ///
    /// Returns the first [`DiscountRejection`] that applies.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), DiscountRejection> {
        if !self.is_active {
            return Err(DiscountRejection::Inactive);
        }
        if self.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(DiscountRejection::Expired);
        }
        if self
            .max_redemptions
            .is_some_and(|max| self.redemptions_count >= max)
        {
            return Err(DiscountRejection::Exhausted);
        }
        Ok(())
    }

    /// Amount taken off `amount` (minor units), never more than `amount` itself.
    #[must_use]
    pub fn amount_off(&self, amount: i64) -> i64 {
        if amount <= 0 {
            return 0;
        }
        let raw = match self.discount_type {
            DiscountKind::Percentage => {
                Decimal::from(amount) * self.discount_value / Decimal::ONE_HUNDRED
            }
            DiscountKind::FixedAmount => self.discount_value * Decimal::ONE_HUNDRED,
        };
        raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
            .clamp(0, amount)
    }

    /// Checks redeemability and prices the discount against `amount`.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountRejection`] if the code cannot be redeemed at `now`.
    pub fn quote(&self, amount: i64, now: DateTime<Utc>) -> Result<DiscountQuote, DiscountRejection> {
        self.check_redeemable(now)?;
        let discount_amount = self.amount_off(amount);
        Ok(DiscountQuote {
            code: self.code.clone(),
            discount_type: self.discount_type,
            original_amount: amount,
            discount_amount,
            final_amount: amount - discount_amount,
        })
    }
}
