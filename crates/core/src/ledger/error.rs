//! Ledger error types for validation and state errors.
//!
//! Every failure of a transaction or transfer mutation is one of these
//! variants, carrying the ids and amounts involved.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::currency::CurrencyError;

/// Validation rules a transfer request can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferRule {
    /// Source and destination are the same account.
    SameAccount,
    /// Same-currency transfer with a destination amount that differs from the source.
    DestinationAmountMismatch,
    /// A transfer amount is zero or negative.
    NonPositiveAmount,
}

impl TransferRule {
    /// Human-readable message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::SameAccount => "Transfer must be between different accounts",
            Self::DestinationAmountMismatch => {
                "For same-currency transfers, destination amount must equal source amount"
            }
            Self::NonPositiveAmount => "Transfer amounts must be greater than zero",
        }
    }
}

impl std::fmt::Display for TransferRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Not Found ==========
    /// Account not found.
    #[error("Account {0} not found")]
    AccountNotFound(i32),

    /// Category not found.
    #[error("Category {0} not found")]
    CategoryNotFound(i32),

    /// Transaction not found.
    #[error("Transaction {0} not found")]
    TransactionNotFound(i32),

    /// Transfer not found.
    #[error("Transfer {0} not found")]
    TransferNotFound(i32),

    // ========== Validation ==========
    /// Source account cannot cover the debit.
    #[error(
        "Insufficient funds in account {account_id}. Available: {available}, Required: {required}"
    )]
    InsufficientFunds {
        /// The account being debited.
        account_id: i32,
        /// Its balance before the debit.
        available: Decimal,
        /// The debit amount.
        required: Decimal,
    },

    /// Transfer request breaks a validation rule.
    #[error("{0}")]
    TransferValidation(TransferRule),

    // ========== Currency ==========
    /// Destination amount could not be derived from stored rates.
    #[error("Cannot convert {amount} {from} to {to}: {source}")]
    CurrencyConversion {
        /// Source currency.
        from: String,
        /// Destination currency.
        to: String,
        /// Amount that was being converted.
        amount: Decimal,
        /// Underlying rate failure.
        #[source]
        source: CurrencyError,
    },

    // ========== Arithmetic ==========
    /// Applying a delta would overflow the account balance.
    #[error("Balance overflow on account {0}")]
    BalanceOverflow(i32),
}

impl LedgerError {
    /// Returns true for the invalid-reference class (missing account, category, row).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_)
                | Self::CategoryNotFound(_)
                | Self::TransactionNotFound(_)
                | Self::TransferNotFound(_)
        )
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::TransferValidation(TransferRule::SameAccount) => "SAME_ACCOUNT_TRANSFER",
            Self::TransferValidation(TransferRule::DestinationAmountMismatch) => {
                "DESTINATION_AMOUNT_MISMATCH"
            }
            Self::TransferValidation(TransferRule::NonPositiveAmount) => "NON_POSITIVE_AMOUNT",
            Self::CurrencyConversion { .. } => "CURRENCY_CONVERSION_FAILED",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
        }
    }
}
