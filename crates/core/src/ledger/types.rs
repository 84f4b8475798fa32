//! Ledger domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The slice of an account the ledger reads and mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    /// Account id.
    pub id: i32,
    /// ISO currency code of the account.
    pub currency: String,
    /// Current running balance.
    pub balance: Decimal,
}

impl AccountState {
    /// Creates an account state.
    #[must_use]
    pub fn new(id: i32, currency: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id,
            currency: currency.into(),
            balance,
        }
    }
}

/// Amounts of a transfer as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAmounts {
    /// Debited from the source account, in its currency.
    pub from_amount: Decimal,
    /// Credited to the destination account, in its currency.
    pub to_amount: Decimal,
    /// `to_amount / from_amount`; `None` for same-currency transfers.
    pub exchange_rate: Option<Decimal>,
}

/// Amount fields changed by a transfer update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferAmountChanges {
    /// New source amount.
    pub from_amount: Option<Decimal>,
    /// New destination amount.
    pub to_amount: Option<Decimal>,
}

impl TransferAmountChanges {
    /// Returns true when neither amount changes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.from_amount.is_none() && self.to_amount.is_none()
    }
}

/// Outcome of planning a transfer: what to store and the balances to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// Amounts to persist on the transfer row.
    pub amounts: TransferAmounts,
    /// New balance of the source account.
    pub from_balance: Decimal,
    /// New balance of the destination account.
    pub to_balance: Decimal,
}
