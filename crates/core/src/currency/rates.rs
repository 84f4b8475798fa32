//! Exchange-rate records and the active-rate selection rule.
//!
//! Every stored rate is quoted against the pivot currency (USD). A record
//! is active at `t` when `effective_from <= t` and `effective_to` is either
//! open or `>= t`. Overlapping windows are allowed; the most recent
//! `effective_from` wins.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// The pivot currency every rate is quoted against.
pub const PIVOT_CURRENCY: &str = "USD";

/// Rates seeded into an empty store, as `(currency, rate_to_usd)`.
pub const DEFAULT_RATES: [(&str, Decimal); 8] = [
    ("EUR", dec!(1.08)),
    ("GBP", dec!(1.26)),
    ("JPY", dec!(0.0067)),
    ("CAD", dec!(0.74)),
    ("AUD", dec!(0.66)),
    ("CHF", dec!(1.10)),
    ("CNY", dec!(0.14)),
    ("RUB", dec!(0.011)),
];

/// One time-bounded `currency -> USD` rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    /// Quoted currency.
    pub currency_from: String,
    /// Units of USD per one unit of `currency_from`.
    pub rate: Decimal,
    /// Start of validity (inclusive).
    pub effective_from: DateTime<Utc>,
    /// End of validity (inclusive); `None` means open-ended.
    pub effective_to: Option<DateTime<Utc>>,
}

impl RateRecord {
    /// Returns true when this record is active at `at`.
    #[must_use]
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.effective_from <= at && self.effective_to.is_none_or(|end| end >= at)
    }
}

/// Picks the active record for `currency` at `at`: latest `effective_from` first.
#[must_use]
pub fn select_active_rate<'a>(
    records: &'a [RateRecord],
    currency: &str,
    at: DateTime<Utc>,
) -> Option<&'a RateRecord> {
    records
        .iter()
        .filter(|record| record.currency_from == currency && record.is_active_at(at))
        .max_by_key(|record| record.effective_from)
}

/// Source of `currency -> USD` rates.
///
/// Implementations never answer for USD itself; the engine short-circuits it.
pub trait RateLookup {
    /// Returns the active rate to USD for `currency` at `at`.
    fn rate_to_usd(&self, currency: &str, at: DateTime<Utc>) -> Option<Decimal>;
}

impl<F> RateLookup for F
where
    F: Fn(&str, DateTime<Utc>) -> Option<Decimal>,
{
    fn rate_to_usd(&self, currency: &str, at: DateTime<Utc>) -> Option<Decimal> {
        self(currency, at)
    }
}

/// In-memory rate store applying [`select_active_rate`].
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    records: Vec<RateRecord>,
}

impl RateTable {
    /// Wraps a set of records.
    #[must_use]
    pub const fn new(records: Vec<RateRecord>) -> Self {
        Self { records }
    }

    /// Materializes every active rate at `at`.
    #[must_use]
    pub fn snapshot(&self, at: DateTime<Utc>) -> RateSnapshot {
        let mut snapshot = RateSnapshot::new(at);
        for record in &self.records {
            if snapshot.rates.contains_key(&record.currency_from) {
                continue;
            }
            if let Some(active) = select_active_rate(&self.records, &record.currency_from, at) {
                snapshot
                    .rates
                    .insert(active.currency_from.clone(), active.rate);
            }
        }
        snapshot
    }
}

impl RateLookup for RateTable {
    fn rate_to_usd(&self, currency: &str, at: DateTime<Utc>) -> Option<Decimal> {
        select_active_rate(&self.records, currency, at).map(|record| record.rate)
    }
}

/// Every active rate at one instant; USD is always present at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateSnapshot {
    /// The instant the snapshot describes.
    pub at: DateTime<Utc>,
    /// Currency code to rate-to-USD.
    pub rates: BTreeMap<String, Decimal>,
}

impl RateSnapshot {
    /// Creates a snapshot holding only the pivot.
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(PIVOT_CURRENCY.to_string(), Decimal::ONE);
        Self { at, rates }
    }

    /// Returns the rate for `currency`, if present.
    #[must_use]
    pub fn get(&self, currency: &str) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }
}
