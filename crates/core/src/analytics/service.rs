//! Read-only analytics over account balances.
//!
//! Missing rates never fail these reads. `enrich` reports the error so the
//! caller can log it; aggregates skip the accounts they cannot convert.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::{BalanceEnrichment, CurrencyBreakdown, Holding, TotalBalance};
use crate::currency::{CurrencyError, CurrencyService, PIVOT_CURRENCY, RateLookup};

/// Decimal places used for converted display values and percentages.
pub const DISPLAY_SCALE: u32 = 2;

/// Analytics service.
pub struct AnalyticsService;

impl AnalyticsService {
    /// Converts a balance into the default currency for display.
    ///
    /// # Errors
    ///
    /// Returns the rate failure; callers degrade to
    /// [`BalanceEnrichment::unavailable`].
    pub fn enrich<R>(
        holding: &Holding,
        default_currency: &str,
        at: DateTime<Utc>,
        rates: &R,
    ) -> Result<BalanceEnrichment, CurrencyError>
    where
        R: RateLookup + ?Sized,
    {
        if holding.currency == default_currency {
            return Ok(BalanceEnrichment::unavailable(default_currency));
        }

        let rate = CurrencyService::get_rate(&holding.currency, default_currency, at, rates)?;
        let converted = CurrencyService::convert(
            holding.balance,
            &holding.currency,
            default_currency,
            at,
            rates,
        )?;

        Ok(BalanceEnrichment {
            default_currency: default_currency.to_string(),
            balance_in_default_currency: Some(CurrencyService::round(converted, DISPLAY_SCALE)),
            exchange_rate_used: Some(rate),
        })
    }

    /// Share of each holding in the USD-converted total, as a 0..1 fraction.
    ///
    /// Holdings without a rate are left out of the total and map to `None`.
    /// Every convertible holding maps to 0 when the total is 0.
    #[must_use]
    pub fn percentages_of_total<R>(
        holdings: &[Holding],
        at: DateTime<Utc>,
        rates: &R,
    ) -> HashMap<i32, Option<Decimal>>
    where
        R: RateLookup + ?Sized,
    {
        let in_usd: Vec<(i32, Option<Decimal>)> = holdings
            .iter()
            .map(|holding| {
                let value = CurrencyService::convert(
                    holding.balance,
                    &holding.currency,
                    PIVOT_CURRENCY,
                    at,
                    rates,
                )
                .ok();
                (holding.account_id, value)
            })
            .collect();

        let total: Decimal = in_usd.iter().filter_map(|(_, value)| *value).sum();

        in_usd
            .into_iter()
            .map(|(account_id, value)| {
                let share = value.map(|value| {
                    if total.is_zero() {
                        Decimal::ZERO
                    } else {
                        CurrencyService::round(value / total, DISPLAY_SCALE)
                    }
                });
                (account_id, share)
            })
            .collect()
    }

    /// Share of `target` in the USD-converted total of `holdings`.
    #[must_use]
    pub fn percentage_of_total<R>(
        target: &Holding,
        holdings: &[Holding],
        at: DateTime<Utc>,
        rates: &R,
    ) -> Option<Decimal>
    where
        R: RateLookup + ?Sized,
    {
        Self::percentages_of_total(holdings, at, rates)
            .get(&target.account_id)
            .copied()
            .flatten()
    }

    /// Sums every balance into `default_currency`, with a per-currency breakdown.
    #[must_use]
    pub fn total_balance<R>(
        holdings: &[Holding],
        default_currency: &str,
        at: DateTime<Utc>,
        rates: &R,
    ) -> TotalBalance
    where
        R: RateLookup + ?Sized,
    {
        let mut by_currency: BTreeMap<&str, (Decimal, Vec<i32>)> = BTreeMap::new();
        for holding in holdings {
            let entry = by_currency
                .entry(holding.currency.as_str())
                .or_insert_with(|| (Decimal::ZERO, Vec::new()));
            entry.0 += holding.balance;
            entry.1.push(holding.account_id);
        }

        let mut total = Decimal::ZERO;
        let mut unconverted_account_ids = Vec::new();
        let mut breakdown = Vec::with_capacity(by_currency.len());

        for (currency, (balance, account_ids)) in by_currency {
            let rate = CurrencyService::get_rate(currency, default_currency, at, rates).ok();
            let converted = CurrencyService::convert(balance, currency, default_currency, at, rates)
                .ok()
                .map(|value| CurrencyService::round(value, DISPLAY_SCALE));

            match converted {
                Some(value) => total += value,
                None => unconverted_account_ids.extend(account_ids.iter().copied()),
            }

            breakdown.push(CurrencyBreakdown {
                currency: currency.to_string(),
                balance,
                converted_balance: converted,
                exchange_rate: rate.filter(|_| converted.is_some()),
                account_count: account_ids.len(),
            });
        }

        TotalBalance {
            default_currency: default_currency.to_string(),
            total: CurrencyService::round(total, DISPLAY_SCALE),
            breakdown,
            unconverted_account_ids,
            as_of: at,
        }
    }
}
