//! Monetary arithmetic for line items.
//!
//! Amounts and prices are `Decimal` so totals are exact; there is a single implicit
//! currency and no rounding beyond the natural precision of `Decimal`.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Fractional digits kept by storage (`NUMERIC(19, 4)`).
pub const MONEY_SCALE: u32 = 4;

/// Largest unit price, deposit or transaction amount (10^12).
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Largest line item quantity (10^6). `MAX_PRICE * MAX_AMOUNT` stays far inside
/// `Decimal` range, so a line total of bounded inputs never overflows.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Reject values outside `[-max, max]` or with more than [`MONEY_SCALE`] decimals.
pub fn ensure_bounded(field: &str, value: Decimal, max: Decimal) -> DomainResult<()> {
    if value.abs() > max {
        return Err(DomainError::validation(format!(
            "{field} must not exceed {max} in magnitude"
        )));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(DomainError::validation(format!(
            "{field} allows at most {MONEY_SCALE} decimal places"
        )));
    }
    Ok(())
}

/// Line total = quantity × unit price.
pub fn line_total(amount: Decimal, unit_price: Decimal) -> DomainResult<Decimal> {
    amount
        .checked_mul(unit_price)
        .ok_or_else(|| DomainError::invariant("line total overflow"))
}

/// Sum of already computed line totals.
pub fn sum_totals<I>(totals: I) -> DomainResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    totals.into_iter().try_fold(Decimal::ZERO, |acc, t| {
        acc.checked_add(t)
            .ok_or_else(|| DomainError::invariant("document total overflow"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn line_total_is_exact() {
        let total = line_total(Decimal::new(3, 0), Decimal::new(110, 2)).unwrap();
        assert_eq!(total, Decimal::new(330, 2));
    }

    #[test]
    fn overflow_is_an_invariant_violation() {
        let err = line_total(Decimal::MAX, Decimal::new(2, 0)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn bounds_are_powers_of_ten() {
        assert_eq!(MAX_PRICE, Decimal::new(1_000_000_000_000, 0));
        assert_eq!(MAX_AMOUNT, Decimal::new(1_000_000, 0));
        assert!(line_total(MAX_AMOUNT, MAX_PRICE).is_ok());
    }

    #[test]
    fn bounded_values_respect_magnitude_and_scale() {
        assert!(ensure_bounded("price", MAX_PRICE, MAX_PRICE).is_ok());
        assert!(ensure_bounded("price", -MAX_PRICE, MAX_PRICE).is_ok());
        assert!(ensure_bounded("price", Decimal::new(12345, 4), MAX_PRICE).is_ok());
        // Trailing zeros do not count towards the scale.
        assert!(ensure_bounded("price", Decimal::new(150000, 5), MAX_PRICE).is_ok());

        let err = ensure_bounded("price", MAX_PRICE + Decimal::ONE, MAX_PRICE).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("price")));
        let err = ensure_bounded("price", Decimal::new(12345, 5), MAX_PRICE).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("decimal places")));
    }

    #[test]
    fn empty_sum_is_zero() {
        assert_eq!(sum_totals(Vec::new()).unwrap(), Decimal::ZERO);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Summing cents as decimals matches integer arithmetic on the same cents.
        #[test]
        fn decimal_sum_matches_integer_cents(
            lines in prop::collection::vec((1i64..1_000, 0i64..1_000_000), 0..20)
        ) {
            let mut expected_cents: i128 = 0;
            let mut totals = Vec::new();
            for (qty, cents) in &lines {
                expected_cents += (*qty as i128) * (*cents as i128);
                totals.push(line_total(Decimal::new(*qty, 0), Decimal::new(*cents, 2)).unwrap());
            }
            let sum = sum_totals(totals).unwrap();
            prop_assert_eq!(sum, Decimal::from_i128_with_scale(expected_cents, 2));
        }
    }
}
