//! Currency service: rate resolution through the USD pivot and conversion.
//!
//! `get_rate(from, to)` returns the factor such that
//! `amount_in_to = amount_in_from * rate`. Only `X -> USD` rates are stored,
//! so every other pair is derived from two pivot lookups.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use super::error::CurrencyError;
use super::rates::{PIVOT_CURRENCY, RateLookup};

/// Currency service for rate resolution and conversion.
pub struct CurrencyService;

impl CurrencyService {
    /// Resolves the rate from `from` to `to` at `at`.
    ///
    /// - same currency: 1, no lookup
    /// - `to == USD`: direct lookup of `from`
    /// - `from == USD`: `1 / lookup(to)`
    /// - cross pair: `lookup(from) / lookup(to)`, the `from` side checked first
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::ExchangeRateNotFound` naming the missing side.
    pub fn get_rate<R>(
        from: &str,
        to: &str,
        at: DateTime<Utc>,
        rates: &R,
    ) -> Result<Decimal, CurrencyError>
    where
        R: RateLookup + ?Sized,
    {
        if from == to {
            return Ok(Decimal::ONE);
        }

        if to == PIVOT_CURRENCY {
            return Self::rate_to_usd(from, at, rates);
        }

        if from == PIVOT_CURRENCY {
            let to_rate = Self::rate_to_usd(to, at, rates)?;
            return Self::divide(Decimal::ONE, to_rate, from, to);
        }

        let from_rate = Self::rate_to_usd(from, at, rates)?;
        let to_rate = Self::rate_to_usd(to, at, rates)?;
        Self::divide(from_rate, to_rate, from, to)
    }

    /// Converts `amount` from `from` to `to` at `at`.
    ///
    /// Same-currency conversion returns `amount` untouched. Results are not
    /// rounded; rounding is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::Conversion` carrying the amount and the
    /// underlying rate failure.
    pub fn convert<R>(
        amount: Decimal,
        from: &str,
        to: &str,
        at: DateTime<Utc>,
        rates: &R,
    ) -> Result<Decimal, CurrencyError>
    where
        R: RateLookup + ?Sized,
    {
        if from == to {
            return Ok(amount);
        }

        let wrap = |source: CurrencyError| CurrencyError::Conversion {
            amount,
            from: from.to_string(),
            to: to.to_string(),
            source: Box::new(source),
        };

        let rate = Self::get_rate(from, to, at, rates).map_err(wrap)?;
        amount.checked_mul(rate).ok_or_else(|| {
            wrap(CurrencyError::Overflow {
                from: from.to_string(),
                to: to.to_string(),
            })
        })
    }

    /// Round a decimal value using Banker's Rounding.
    ///
    /// Rounds 2.5 → 2 and 3.5 → 4 (to nearest even).
    #[must_use]
    pub fn round(value: Decimal, decimal_places: u32) -> Decimal {
        value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
    }

    fn rate_to_usd<R>(currency: &str, at: DateTime<Utc>, rates: &R) -> Result<Decimal, CurrencyError>
    where
        R: RateLookup + ?Sized,
    {
        if currency == PIVOT_CURRENCY {
            return Ok(Decimal::ONE);
        }
        rates
            .rate_to_usd(currency, at)
            .ok_or_else(|| CurrencyError::ExchangeRateNotFound {
                currency: currency.to_string(),
                at,
            })
    }

    fn divide(
        numerator: Decimal,
        denominator: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Decimal, CurrencyError> {
        if denominator.is_zero() {
            return Err(CurrencyError::ZeroRate {
                currency: to.to_string(),
            });
        }
        numerator
            .checked_div(denominator)
            .ok_or_else(|| CurrencyError::Overflow {
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::rates::{RateRecord, RateTable};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn jan_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn table() -> RateTable {
        RateTable::new(vec![
            RateRecord {
                currency_from: "EUR".to_string(),
                rate: dec!(1.08),
                effective_from: jan_2024(),
                effective_to: None,
            },
            RateRecord {
                currency_from: "GBP".to_string(),
                rate: dec!(1.26),
                effective_from: jan_2024(),
                effective_to: None,
            },
        ])
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_same_currency_needs_no_lookup() {
        let empty = RateTable::default();
        assert_eq!(
            CurrencyService::get_rate("JPY", "JPY", now(), &empty).unwrap(),
            Decimal::ONE
        );
        assert_eq!(
            CurrencyService::convert(dec!(12.345), "JPY", "JPY", now(), &empty).unwrap(),
            dec!(12.345)
        );
    }

    #[test]
    fn test_to_usd_is_direct_lookup() {
        let rate = CurrencyService::get_rate("EUR", "USD", now(), &table()).unwrap();
        assert_eq!(rate, dec!(1.08));
    }

    #[test]
    fn test_from_usd_is_inverse() {
        let rate = CurrencyService::get_rate("USD", "EUR", now(), &table()).unwrap();
        assert_eq!(rate, Decimal::ONE / dec!(1.08));
    }

    #[test]
    fn test_cross_pair_pivots_through_usd() {
        let rate = CurrencyService::get_rate("EUR", "GBP", now(), &table()).unwrap();
        assert_eq!(rate, dec!(1.08) / dec!(1.26));
    }

    #[test]
    fn test_missing_from_side_reported_first() {
        let err = CurrencyService::get_rate("CAD", "AUD", now(), &table()).unwrap_err();
        assert_eq!(
            err,
            CurrencyError::ExchangeRateNotFound {
                currency: "CAD".to_string(),
                at: now(),
            }
        );

        let err = CurrencyService::get_rate("EUR", "AUD", now(), &table()).unwrap_err();
        assert!(matches!(
            err,
            CurrencyError::ExchangeRateNotFound { ref currency, .. } if currency == "AUD"
        ));
    }

    #[test]
    fn test_rate_not_active_before_effective_from() {
        let before = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let err = CurrencyService::get_rate("EUR", "USD", before, &table()).unwrap_err();
        assert!(err.is_rate_not_found());
    }

    #[test]
    fn test_convert_scenarios() {
        let to_usd = CurrencyService::convert(dec!(1000), "EUR", "USD", now(), &table()).unwrap();
        assert_eq!(to_usd, dec!(1080.00));

        let to_eur = CurrencyService::convert(dec!(1000), "USD", "EUR", now(), &table()).unwrap();
        assert_eq!(CurrencyService::round(to_eur, 2), dec!(925.93));
    }

    #[test]
    fn test_convert_failure_carries_amount() {
        let err = CurrencyService::convert(dec!(50), "CHF", "USD", now(), &table()).unwrap_err();
        match &err {
            CurrencyError::Conversion {
                amount, from, to, ..
            } => {
                assert_eq!(*amount, dec!(50));
                assert_eq!(from, "CHF");
                assert_eq!(to, "USD");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_rate_not_found());
        assert_eq!(err.error_code(), "EXCHANGE_RATE_NOT_FOUND");
    }

    #[test]
    fn test_zero_rate_is_rejected_as_divisor() {
        let lookup = |currency: &str, _at: DateTime<Utc>| (currency == "XAU").then_some(Decimal::ZERO);
        let err = CurrencyService::get_rate("USD", "XAU", now(), &lookup).unwrap_err();
        assert_eq!(
            err,
            CurrencyError::ZeroRate {
                currency: "XAU".to_string()
            }
        );
    }

    #[test]
    fn test_bankers_rounding_midpoint_to_even() {
        assert_eq!(CurrencyService::round(dec!(2.5), 0), dec!(2));
        assert_eq!(CurrencyService::round(dec!(3.5), 0), dec!(4));
        assert_eq!(CurrencyService::round(dec!(2.25), 1), dec!(2.2));
        assert_eq!(CurrencyService::round(dec!(2.35), 1), dec!(2.4));
    }
}
