//! Budget data types.

use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::BudgetError;

/// First supported budget year.
pub const MIN_BUDGET_YEAR: i32 = 2000;
/// Last supported budget year.
pub const MAX_BUDGET_YEAR: i32 = 2100;

/// Whether a category tracks money going out or coming in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// Spending; counts transactions with a negative amount.
    #[default]
    Expense,
    /// Earnings; counts transactions with a positive amount.
    Income,
}

impl CategoryKind {
    /// Stored column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            other => Err(BudgetError::UnknownCategoryKind(other.to_string())),
        }
    }
}

/// A calendar month a budget applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetPeriod {
    year: i32,
    month: u32,
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl BudgetPeriod {
    /// Validates `year` (2000..=2100) and `month` (1..=12).
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidYear` or `BudgetError::InvalidMonth`.
    pub fn new(year: i32, month: u32) -> Result<Self, BudgetError> {
        if !(MIN_BUDGET_YEAR..=MAX_BUDGET_YEAR).contains(&year) {
            return Err(BudgetError::InvalidYear(year));
        }
        let first_day =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(BudgetError::InvalidMonth(month))?;
        let last_day = first_day
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or(BudgetError::InvalidMonth(month))?;
        Ok(Self {
            year,
            month,
            first_day,
            last_day,
        })
    }

    /// Budget year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Budget month, 1-based.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub const fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// Last day of the month, inclusive.
    #[must_use]
    pub const fn last_day(&self) -> NaiveDate {
        self.last_day
    }
}

/// A transaction amount in its own currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActualEntry {
    /// Signed amount as stored on the transaction.
    pub amount: Decimal,
    /// Transaction currency.
    pub currency: String,
}

/// Actual spending or income for one budget.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ActualAmount {
    /// Sum in the budget currency; `None` when some entry had no rate.
    pub amount: Option<Decimal>,
    /// Currencies that could not be converted, sorted.
    pub unconverted_currencies: Vec<String>,
}

/// Variance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    /// Under the expense budget, or over the income target.
    Favorable,
    /// Over the expense budget, or under the income target.
    Unfavorable,
    /// Exactly on budget.
    OnBudget,
}

/// Planned vs actual for one budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarianceResult {
    /// Planned amount.
    pub planned: Decimal,
    /// Actual amount.
    pub actual: Decimal,
    /// Signed so that positive is always favorable.
    pub variance: Decimal,
    /// Variance as a percentage of planned.
    pub variance_percent: Decimal,
    /// Actual as a percentage of planned.
    pub utilization_percent: Decimal,
    /// Classification of the variance.
    pub status: VarianceStatus,
}

/// One budget as fed into a period summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetLine {
    /// Kind of the budgeted category.
    pub kind: CategoryKind,
    /// Planned amount in `currency`.
    pub planned: Decimal,
    /// Actual amount in `currency`, if it could be computed.
    pub actual: Option<Decimal>,
    /// Budget currency.
    pub currency: String,
}

/// Totals for a period, in the default currency.
///
/// Every total is `None` when one of its inputs could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetSummary {
    /// Currency the totals are expressed in.
    pub currency: String,
    /// Number of budgets in the period.
    pub categories_count: usize,
    /// Sum of every planned amount.
    pub total_planned: Option<Decimal>,
    /// Sum of every actual amount.
    pub total_actual: Option<Decimal>,
    /// Planned amounts of income categories.
    pub income_planned: Option<Decimal>,
    /// Actual amounts of income categories.
    pub income_actual: Option<Decimal>,
    /// Planned amounts of expense categories.
    pub expense_planned: Option<Decimal>,
    /// Actual amounts of expense categories.
    pub expense_actual: Option<Decimal>,
    /// Currencies without a rate into the default currency, sorted.
    pub unconverted_currencies: Vec<String>,
}
