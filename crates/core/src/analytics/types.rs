//! Analytics data types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An account balance as seen by analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Account ID.
    pub account_id: i32,
    /// Account currency.
    pub currency: String,
    /// Balance in the account currency.
    pub balance: Decimal,
}

/// Default-currency view of one balance.
///
/// Both values are `None` when the account already uses the default
/// currency or when no rate is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEnrichment {
    /// The currency the balance was converted into.
    pub default_currency: String,
    /// Balance converted into the default currency, 2 dp.
    pub balance_in_default_currency: Option<Decimal>,
    /// Rate used for the conversion.
    pub exchange_rate_used: Option<Decimal>,
}

impl BalanceEnrichment {
    /// An enrichment with no converted values.
    #[must_use]
    pub fn unavailable(default_currency: impl Into<String>) -> Self {
        Self {
            default_currency: default_currency.into(),
            balance_in_default_currency: None,
            exchange_rate_used: None,
        }
    }
}

/// Per-currency line of a total-balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyBreakdown {
    /// Currency code.
    pub currency: String,
    /// Sum of balances in this currency.
    pub balance: Decimal,
    /// That sum converted into the default currency; `None` without a rate.
    pub converted_balance: Option<Decimal>,
    /// Rate used for the conversion.
    pub exchange_rate: Option<Decimal>,
    /// Number of accounts in this currency.
    pub account_count: usize,
}

/// Total balance across all accounts in the default currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalBalance {
    /// The currency of `total`.
    pub default_currency: String,
    /// Sum of every convertible balance, 2 dp.
    pub total: Decimal,
    /// One line per currency, ordered by code.
    pub breakdown: Vec<CurrencyBreakdown>,
    /// Accounts left out of `total` because no rate was available.
    pub unconverted_account_ids: Vec<i32>,
    /// Instant the rates were resolved for.
    pub as_of: DateTime<Utc>,
}
