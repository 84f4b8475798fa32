//! Property-based tests for currency operations.
//!
//! - Identity: converting into the same currency never changes the amount
//! - Reciprocity: `rate(A, B) * rate(B, A) ≈ 1`
//! - Pivot consistency: `rate(A, B) == rate(A, USD) / rate(B, USD)`

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::rates::{RateRecord, RateTable};
use super::service::CurrencyService;

/// Strategy to generate signed amounts (-1,000,000.00 to 1,000,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (-100_000_000i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive rates to USD (0.000001 to 1000.000000).
fn rate_to_usd() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|v| Decimal::new(v, 6))
}

/// Strategy to generate currency codes.
fn currency_code() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("USD"), Just("EUR"), Just("GBP"), Just("JPY"), Just("XYZ")]
}

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn table(eur: Decimal, gbp: Decimal, jpy: Decimal) -> RateTable {
    let effective_from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    RateTable::new(
        [("EUR", eur), ("GBP", gbp), ("JPY", jpy)]
            .into_iter()
            .map(|(currency, rate)| RateRecord {
                currency_from: currency.to_string(),
                rate,
                effective_from,
                effective_to: None,
            })
            .collect(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Same-currency conversion is exact, with or without stored rates.
    #[test]
    fn prop_same_currency_is_identity(
        amount in amount(),
        currency in currency_code(),
    ) {
        let empty = RateTable::default();
        let converted = CurrencyService::convert(amount, currency, currency, at(), &empty).unwrap();
        prop_assert_eq!(converted, amount);
        prop_assert_eq!(converted.scale(), amount.scale());
    }

    /// Rates in opposite directions multiply to one within decimal tolerance.
    #[test]
    fn prop_rates_are_reciprocal(
        eur in rate_to_usd(),
        gbp in rate_to_usd(),
        jpy in rate_to_usd(),
        a in prop_oneof![Just("USD"), Just("EUR"), Just("GBP"), Just("JPY")],
        b in prop_oneof![Just("USD"), Just("EUR"), Just("GBP"), Just("JPY")],
    ) {
        let rates = table(eur, gbp, jpy);
        let forward = CurrencyService::get_rate(a, b, at(), &rates).unwrap();
        let backward = CurrencyService::get_rate(b, a, at(), &rates).unwrap();
        let product = forward * backward;
        prop_assert!(
            (product - Decimal::ONE).abs() < Decimal::new(1, 12),
            "{} -> {} gave {} * {} = {}", a, b, forward, backward, product
        );
    }

    /// Cross rates equal the ratio of the two USD pivot rates.
    #[test]
    fn prop_cross_rate_pivots_through_usd(
        eur in rate_to_usd(),
        gbp in rate_to_usd(),
        jpy in rate_to_usd(),
    ) {
        let rates = table(eur, gbp, jpy);
        for (a, b) in [("EUR", "GBP"), ("GBP", "JPY"), ("JPY", "EUR")] {
            let cross = CurrencyService::get_rate(a, b, at(), &rates).unwrap();
            let a_usd = CurrencyService::get_rate(a, "USD", at(), &rates).unwrap();
            let b_usd = CurrencyService::get_rate(b, "USD", at(), &rates).unwrap();
            prop_assert_eq!(cross, a_usd / b_usd);
        }
    }

    /// A currency without a stored rate always fails unless it is a no-op.
    #[test]
    fn prop_unknown_currency_fails(
        amount in amount(),
        other in prop_oneof![Just("USD"), Just("EUR"), Just("GBP")],
    ) {
        let rates = table(Decimal::ONE, Decimal::ONE, Decimal::ONE);
        let result = CurrencyService::convert(amount, "XYZ", other, at(), &rates);
        prop_assert!(result.unwrap_err().is_rate_not_found());
    }
}
