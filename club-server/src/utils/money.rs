//! Money helpers
//!
//! Monetary values are stored as f64 at the database boundary; every
//! comparison and rounding step goes through `Decimal` so float noise never
//! decides a reconciliation.

use rust_decimal::prelude::*;

/// Tolerance for monetary comparisons (one cent)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert an f64 amount to a 2-decimal Decimal
pub fn dec(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

/// Round an amount to cents
pub fn round2(value: f64) -> f64 {
    dec(value).to_f64().unwrap_or(0.0)
}

/// Difference `actual - expected`, rounded to cents
pub fn diff(actual: f64, expected: f64) -> f64 {
    (dec(actual) - dec(expected)).to_f64().unwrap_or(0.0)
}

/// Whether two amounts agree within the one-cent tolerance
pub fn within_tolerance(a: f64, b: f64) -> bool {
    (dec(a) - dec(b)).abs() <= MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_cent_is_within_tolerance() {
        assert!(within_tolerance(100_000.0, 100_000.01));
        assert!(within_tolerance(100_000.01, 100_000.0));
        assert!(!within_tolerance(100_000.0, 100_000.02));
        assert!(!within_tolerance(100_000.0, 100_050.0));
    }

    #[test]
    fn diff_is_exact_at_cent_scale() {
        assert_eq!(diff(100_000.01, 100_000.0), 0.01);
        assert_eq!(diff(99.99, 100.0), -0.01);
        assert_eq!(diff(10.0, 10.0), 0.0);
    }

    #[test]
    fn round2_strips_float_noise() {
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(25_000.004), 25_000.0);
    }
}
