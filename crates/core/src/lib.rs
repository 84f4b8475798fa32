//! Core business logic for Coinpurse.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Rates arrive through the [`currency::RateLookup`] seam and account state is
//! passed in by value, so every rule here can be tested without storage.
//!
//! # Modules
//!
//! - `currency` - Exchange rates, USD-pivot conversion, rate file parsing
//! - `ledger` - Balance effects of transactions and transfers
//! - `analytics` - Default-currency enrichment and balance aggregates
//! - `budget` - Monthly category budgets, actuals and variance

pub mod analytics;
pub mod budget;
pub mod currency;
pub mod ledger;
