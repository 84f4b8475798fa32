//! Ledger mutation rules.
//!
//! Balances are simple running totals. This module computes the balance
//! effect of every transaction and transfer mutation:
//! - `service` - single-account transactions
//! - `transfer` - dual-account transfers and destination-amount resolution
//! - `types` - account state and transfer amounts
//! - `error` - the ledger error taxonomy

pub mod error;
pub mod service;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::{LedgerError, TransferRule};
pub use service::LedgerService;
pub use transfer::{EXCHANGE_RATE_SCALE, TransferService};
pub use types::{AccountState, TransferAmountChanges, TransferAmounts, TransferPlan};
