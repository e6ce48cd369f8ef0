//! Conversions between decimal prices and integer minor-unit amounts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::CoreError;

/// Converts a major-unit amount (e.g. `12.345`) into minor units (`1235`),
/// rounding half away from zero.
///
/// # Errors
///
/// Returns [`CoreError::AmountOutOfRange`] if the result does not fit in `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, CoreError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|cents| cents.to_i64())
        .ok_or(CoreError::AmountOutOfRange(amount))
}

/// Renders a minor-unit amount as a two-decimal string, e.g. `3348` → `"33.48"`.
#[must_use]
pub fn format_minor_units(amount: i64) -> String {
    Decimal::new(amount, 2).to_string()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn converts_whole_cents() {
        assert_eq!(to_minor_units(dec("33.48")).unwrap(), 3348);
        assert_eq!(to_minor_units(dec("0")).unwrap(), 0);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(to_minor_units(dec("0.125")).unwrap(), 13);
        assert_eq!(to_minor_units(dec("0.124")).unwrap(), 12);
    }

    #[test]
    fn rejects_amounts_beyond_i64() {
        let result = to_minor_units(Decimal::MAX);
        assert!(matches!(result, Err(CoreError::AmountOutOfRange(_))));
    }

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(format_minor_units(3348), "33.48");
        assert_eq!(format_minor_units(500), "5.00");
        assert_eq!(format_minor_units(7), "0.07");
    }
}
