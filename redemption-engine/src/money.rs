//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts live as `f64` at rest (SQLite REAL, serde) but every piece of
//! arithmetic routes through `Decimal` and comes back rounded to 2 decimal
//! places, so the ledger only ever sees whole-cent values.

use rust_decimal::prelude::*;

/// Rounding target for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: f64 = 0.01;

/// Round to 2 decimal places, half away from zero.
///
/// Non-finite input collapses to 0.0 rather than poisoning a ledger row.
pub fn round(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| {
            d.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
                .to_f64()
                .unwrap_or(0.0)
        })
        .unwrap_or(0.0)
}

/// `percent`% of `total`, rounded
pub fn percentage_of(total: f64, percent: f64) -> f64 {
    let total = Decimal::from_f64(total).unwrap_or_default();
    let percent = Decimal::from_f64(percent).unwrap_or_default();
    let result = total * percent / Decimal::ONE_HUNDRED;
    result
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Smaller of two amounts, rounded (fixed discounts cap at the cart total;
/// gift cards apply at most their balance)
pub fn min_amount(a: f64, b: f64) -> f64 {
    round(a.min(b))
}

/// Tolerance-based equality for amounts that crossed f64 storage
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round(2.345), 2.35);
        assert_eq!(round(2.344), 2.34);
        assert_eq!(round(-2.345), -2.35);
    }

    #[test]
    fn test_round_collapses_non_finite() {
        assert_eq!(round(f64::NAN), 0.0);
        assert_eq!(round(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(100.0, 20.0), 20.0);
        // 20% of 49.99 = 9.998 → 10.00
        assert_eq!(percentage_of(49.99, 20.0), 10.0);
        assert_eq!(percentage_of(0.0, 20.0), 0.0);
    }

    #[test]
    fn test_min_amount_caps_at_total() {
        assert_eq!(min_amount(10.0, 7.5), 7.5);
        assert_eq!(min_amount(5.0, 7.5), 5.0);
    }

    #[test]
    fn test_approx_eq_tolerates_storage_drift() {
        assert!(approx_eq(10.0, 10.0 + 1e-9));
        assert!(!approx_eq(10.0, 10.02));
    }
}
