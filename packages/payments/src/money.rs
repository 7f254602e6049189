//! Integer-cent arithmetic shared by the fee and refund calculators.
//!
//! Amounts are `i64` minor currency units. Rates are [`Decimal`] so that
//! `0.059` is exactly `0.059`. Every rounding in this crate goes through
//! [`round_half_up`] or [`proportional_cents`], which round midpoints away
//! from zero at the cent boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round a cent-denominated decimal to a whole cent, midpoint away from zero.
///
/// Values outside the `i64` range saturate.
pub fn round_half_up(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(if value.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
}

/// `round_half_up(amount * numerator / denominator)` evaluated exactly.
///
/// The ratio is never materialized, so there is no precision loss however
/// awkward the denominator. A zero denominator yields 0.
pub fn proportional_cents(amount: i64, numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }

    let product = amount as i128 * numerator as i128;
    let negative = (product < 0) != (denominator < 0);
    let n = product.unsigned_abs();
    let d = (denominator as i128).unsigned_abs();

    let rounded = (2 * n + d) / (2 * d);
    let signed = if negative {
        -(rounded as i128)
    } else {
        rounded as i128
    };

    i64::try_from(signed).unwrap_or(if negative { i64::MIN } else { i64::MAX })
}

/// `10689` -> `106.89`
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// `106.885` -> `10689`
pub fn decimal_to_cents(value: Decimal) -> i64 {
    match value.checked_mul(Decimal::ONE_HUNDRED) {
        Some(cents) => round_half_up(cents),
        None if value.is_sign_negative() => i64::MIN,
        None => i64::MAX,
    }
}

/// Human readable dollar amount, e.g. `123456` -> `"$1,234.56"`.
pub fn format_cents(cents: i64) -> String {
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let fraction = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if cents < 0 { "-" } else { "" };
    format!("{sign}${grouped}.{fraction:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(dec!(590.0)), 590);
        assert_eq!(round_half_up(dec!(0.5)), 1);
        assert_eq!(round_half_up(dec!(0.49)), 0);
        assert_eq!(round_half_up(dec!(2.5)), 3);
        assert_eq!(round_half_up(dec!(-2.5)), -3);
    }

    #[test]
    fn test_proportional_cents() {
        // 10000 * 5344 / 10689 = 4999.53...
        assert_eq!(proportional_cents(10_000, 5_344, 10_689), 5_000);
        // 689 * 5344 / 10689 = 344.47...
        assert_eq!(proportional_cents(689, 5_344, 10_689), 344);
        // exact midpoint rounds up
        assert_eq!(proportional_cents(1, 1, 2), 1);
        assert_eq!(proportional_cents(3, 1, 2), 2);
        assert_eq!(proportional_cents(-3, 1, 2), -2);
        assert_eq!(proportional_cents(100, 1, 0), 0);
    }

    #[test]
    fn test_proportional_cents_no_overflow() {
        let big = i64::MAX / 2;
        assert_eq!(proportional_cents(big, big, big), big);
    }

    #[test]
    fn test_decimal_conversions() {
        assert_eq!(cents_to_decimal(10_689), dec!(106.89));
        assert_eq!(decimal_to_cents(dec!(106.89)), 10_689);
        assert_eq!(decimal_to_cents(dec!(0.995)), 100);
        assert_eq!(decimal_to_cents(dec!(0.994)), 99);
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(10_689), "$106.89");
        assert_eq!(format_cents(123_456), "$1,234.56");
        assert_eq!(format_cents(100_000_000), "$1,000,000.00");
        assert_eq!(format_cents(-50), "-$0.50");
    }
}
