//! Budget error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Budget rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    /// Year outside the supported range.
    #[error("Budget year {0} must be between 2000 and 2100")]
    InvalidYear(i32),

    /// Month outside 1..=12.
    #[error("Budget month {0} must be between 1 and 12")]
    InvalidMonth(u32),

    /// Planned amounts cannot be negative.
    #[error("Planned amount {0} cannot be negative")]
    NegativePlannedAmount(Decimal),

    /// Category kind is neither `expense` nor `income`.
    #[error("Unknown category kind '{0}'; expected 'expense' or 'income'")]
    UnknownCategoryKind(String),
}

impl BudgetError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidYear(_) | Self::InvalidMonth(_) => "INVALID_BUDGET_PERIOD",
            Self::NegativePlannedAmount(_) => "NEGATIVE_PLANNED_AMOUNT",
            Self::UnknownCategoryKind(_) => "INVALID_CATEGORY_KIND",
        }
    }
}
