//! Balance analytics: default-currency enrichment, share of total, totals.

pub mod service;
pub mod types;

pub use service::{AnalyticsService, DISPLAY_SCALE};
pub use types::{BalanceEnrichment, CurrencyBreakdown, Holding, TotalBalance};
