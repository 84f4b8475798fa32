//! Budget service: actuals, variance and period totals.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::BudgetError;
use super::types::{
    ActualAmount, ActualEntry, BudgetLine, BudgetSummary, CategoryKind, VarianceResult,
    VarianceStatus,
};
use crate::analytics::DISPLAY_SCALE;
use crate::currency::{CurrencyError, CurrencyService, RateLookup};

/// Budget service for business logic.
pub struct BudgetService;

impl BudgetService {
    /// Whether a transaction amount counts towards a category of `kind`.
    ///
    /// Expense categories count outflows, income categories count inflows.
    #[must_use]
    pub fn counts(kind: CategoryKind, amount: Decimal) -> bool {
        match kind {
            CategoryKind::Expense => amount.is_sign_negative() && !amount.is_zero(),
            CategoryKind::Income => amount.is_sign_positive() && !amount.is_zero(),
        }
    }

    /// Sums the absolute value of every counting entry, in `currency`.
    ///
    /// An entry whose currency has no rate makes the total unavailable and
    /// is listed in `unconverted_currencies`. The total is rounded to 2 dp.
    ///
    /// # Errors
    ///
    /// Returns any conversion failure other than a missing rate.
    pub fn actual_amount<R>(
        kind: CategoryKind,
        entries: &[ActualEntry],
        currency: &str,
        at: DateTime<Utc>,
        rates: &R,
    ) -> Result<ActualAmount, CurrencyError>
    where
        R: RateLookup + ?Sized,
    {
        let mut total = Decimal::ZERO;
        let mut unconverted = BTreeSet::new();

        for entry in entries.iter().filter(|e| Self::counts(kind, e.amount)) {
            match CurrencyService::convert(entry.amount.abs(), &entry.currency, currency, at, rates)
            {
                Ok(converted) => total = checked_add(total, converted, &entry.currency, currency)?,
                Err(err) if err.is_rate_not_found() => {
                    unconverted.insert(entry.currency.clone());
                }
                Err(err) => return Err(err),
            }
        }

        Ok(ActualAmount {
            amount: unconverted
                .is_empty()
                .then(|| CurrencyService::round(total, DISPLAY_SCALE)),
            unconverted_currencies: unconverted.into_iter().collect(),
        })
    }

    /// Calculates variance between planned and actual amounts.
    ///
    /// Expense: `variance = planned - actual`. Income: `variance = actual - planned`.
    /// Positive variance is favorable either way.
    #[must_use]
    pub fn calculate_variance(
        planned: Decimal,
        actual: Decimal,
        kind: CategoryKind,
    ) -> VarianceResult {
        let variance = match kind {
            CategoryKind::Income => actual - planned,
            CategoryKind::Expense => planned - actual,
        };

        let status = match variance.cmp(&Decimal::ZERO) {
            std::cmp::Ordering::Greater => VarianceStatus::Favorable,
            std::cmp::Ordering::Less => VarianceStatus::Unfavorable,
            std::cmp::Ordering::Equal => VarianceStatus::OnBudget,
        };

        let percent_of_planned = |value: Decimal| {
            if planned.is_zero() {
                Decimal::ZERO
            } else {
                (value / planned * Decimal::ONE_HUNDRED).round_dp(DISPLAY_SCALE)
            }
        };

        VarianceResult {
            planned,
            actual,
            variance,
            variance_percent: percent_of_planned(variance),
            utilization_percent: percent_of_planned(actual),
            status,
        }
    }

    /// Rejects negative planned amounts.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NegativePlannedAmount`.
    pub fn validate_planned_amount(amount: Decimal) -> Result<(), BudgetError> {
        if amount < Decimal::ZERO {
            return Err(BudgetError::NegativePlannedAmount(amount));
        }
        Ok(())
    }

    /// Totals a period's budgets in `default_currency`.
    ///
    /// # Errors
    ///
    /// Returns any conversion failure other than a missing rate.
    pub fn summarize<R>(
        lines: &[BudgetLine],
        default_currency: &str,
        at: DateTime<Utc>,
        rates: &R,
    ) -> Result<BudgetSummary, CurrencyError>
    where
        R: RateLookup + ?Sized,
    {
        let mut unconverted = BTreeSet::new();
        let mut income_planned = Some(Decimal::ZERO);
        let mut income_actual = Some(Decimal::ZERO);
        let mut expense_planned = Some(Decimal::ZERO);
        let mut expense_actual = Some(Decimal::ZERO);

        for line in lines {
            let planned = convert_or_skip(
                Some(line.planned),
                &line.currency,
                default_currency,
                at,
                rates,
                &mut unconverted,
            )?;
            let actual = convert_or_skip(
                line.actual,
                &line.currency,
                default_currency,
                at,
                rates,
                &mut unconverted,
            )?;

            let (planned_total, actual_total) = match line.kind {
                CategoryKind::Income => (&mut income_planned, &mut income_actual),
                CategoryKind::Expense => (&mut expense_planned, &mut expense_actual),
            };
            *planned_total = sum(*planned_total, planned);
            *actual_total = sum(*actual_total, actual);
        }

        let round = |value: Option<Decimal>| value.map(|v| CurrencyService::round(v, DISPLAY_SCALE));
        Ok(BudgetSummary {
            currency: default_currency.to_string(),
            categories_count: lines.len(),
            total_planned: round(sum(income_planned, expense_planned)),
            total_actual: round(sum(income_actual, expense_actual)),
            income_planned: round(income_planned),
            income_actual: round(income_actual),
            expense_planned: round(expense_planned),
            expense_actual: round(expense_actual),
            unconverted_currencies: unconverted.into_iter().collect(),
        })
    }
}

fn convert_or_skip<R>(
    amount: Option<Decimal>,
    from: &str,
    to: &str,
    at: DateTime<Utc>,
    rates: &R,
    unconverted: &mut BTreeSet<String>,
) -> Result<Option<Decimal>, CurrencyError>
where
    R: RateLookup + ?Sized,
{
    let Some(amount) = amount else {
        return Ok(None);
    };
    match CurrencyService::convert(amount, from, to, at, rates) {
        Ok(converted) => Ok(Some(converted)),
        Err(err) if err.is_rate_not_found() => {
            unconverted.insert(from.to_string());
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn sum(left: Option<Decimal>, right: Option<Decimal>) -> Option<Decimal> {
    left?.checked_add(right?)
}

fn checked_add(
    total: Decimal,
    value: Decimal,
    from: &str,
    to: &str,
) -> Result<Decimal, CurrencyError> {
    total.checked_add(value).ok_or_else(|| CurrencyError::Overflow {
        from: from.to_string(),
        to: to.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{RateRecord, RateTable};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn rates() -> RateTable {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        RateTable::new(vec![RateRecord {
            currency_from: "EUR".to_string(),
            rate: dec!(1.08),
            effective_from: from,
            effective_to: None,
        }])
    }

    fn entry(amount: Decimal, currency: &str) -> ActualEntry {
        ActualEntry {
            amount,
            currency: currency.to_string(),
        }
    }

    #[test]
    fn test_expense_counts_only_outflows() {
        assert!(BudgetService::counts(CategoryKind::Expense, dec!(-5)));
        assert!(!BudgetService::counts(CategoryKind::Expense, dec!(5)));
        assert!(!BudgetService::counts(CategoryKind::Expense, Decimal::ZERO));
        assert!(BudgetService::counts(CategoryKind::Income, dec!(5)));
        assert!(!BudgetService::counts(CategoryKind::Income, dec!(-5)));
    }

    #[test]
    fn test_actual_amount_converts_into_budget_currency() {
        let entries = vec![
            entry(dec!(-40.00), "USD"),
            entry(dec!(-10.00), "EUR"),
            entry(dec!(200.00), "USD"),
        ];

        let actual =
            BudgetService::actual_amount(CategoryKind::Expense, &entries, "USD", at(), &rates())
                .unwrap();

        assert_eq!(actual.amount, Some(dec!(50.80)));
        assert!(actual.unconverted_currencies.is_empty());
    }

    #[test]
    fn test_actual_amount_is_unavailable_without_a_rate() {
        let entries = vec![entry(dec!(-40.00), "USD"), entry(dec!(-1000), "JPY")];

        let actual =
            BudgetService::actual_amount(CategoryKind::Expense, &entries, "USD", at(), &rates())
                .unwrap();

        assert_eq!(actual.amount, None);
        assert_eq!(actual.unconverted_currencies, vec!["JPY".to_string()]);
    }

    #[test]
    fn test_income_ignores_missing_rates_of_outflows() {
        let entries = vec![entry(dec!(100.00), "USD"), entry(dec!(-1000), "JPY")];

        let actual =
            BudgetService::actual_amount(CategoryKind::Income, &entries, "USD", at(), &rates())
                .unwrap();

        assert_eq!(actual.amount, Some(dec!(100.00)));
    }

    #[test]
    fn test_expense_variance_favorable() {
        let result = BudgetService::calculate_variance(dec!(1000), dec!(800), CategoryKind::Expense);

        assert_eq!(result.variance, dec!(200));
        assert_eq!(result.variance_percent, dec!(20.00));
        assert_eq!(result.utilization_percent, dec!(80.00));
        assert_eq!(result.status, VarianceStatus::Favorable);
    }

    #[test]
    fn test_income_variance_unfavorable() {
        let result = BudgetService::calculate_variance(dec!(1000), dec!(800), CategoryKind::Income);

        assert_eq!(result.variance, dec!(-200));
        assert_eq!(result.status, VarianceStatus::Unfavorable);
    }

    #[test]
    fn test_zero_plan_has_zero_percentages() {
        let result = BudgetService::calculate_variance(dec!(0), dec!(500), CategoryKind::Expense);

        assert_eq!(result.utilization_percent, dec!(0));
        assert_eq!(result.variance_percent, dec!(0));
        assert_eq!(result.status, VarianceStatus::Unfavorable);
    }

    #[test]
    fn test_negative_planned_amount_rejected() {
        assert_eq!(
            BudgetService::validate_planned_amount(dec!(-0.01)),
            Err(BudgetError::NegativePlannedAmount(dec!(-0.01)))
        );
        assert!(BudgetService::validate_planned_amount(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_summary_splits_income_and_expense() {
        let lines = vec![
            BudgetLine {
                kind: CategoryKind::Expense,
                planned: dec!(100.00),
                actual: Some(dec!(50.00)),
                currency: "EUR".to_string(),
            },
            BudgetLine {
                kind: CategoryKind::Income,
                planned: dec!(2000.00),
                actual: Some(dec!(2100.00)),
                currency: "USD".to_string(),
            },
        ];

        let summary = BudgetService::summarize(&lines, "USD", at(), &rates()).unwrap();

        assert_eq!(summary.categories_count, 2);
        assert_eq!(summary.expense_planned, Some(dec!(108.00)));
        assert_eq!(summary.expense_actual, Some(dec!(54.00)));
        assert_eq!(summary.income_planned, Some(dec!(2000.00)));
        assert_eq!(summary.total_planned, Some(dec!(2108.00)));
        assert_eq!(summary.total_actual, Some(dec!(2154.00)));
    }

    #[test]
    fn test_summary_without_rate_reports_unavailable_totals() {
        let lines = vec![
            BudgetLine {
                kind: CategoryKind::Expense,
                planned: dec!(5000),
                actual: Some(dec!(100)),
                currency: "JPY".to_string(),
            },
            BudgetLine {
                kind: CategoryKind::Income,
                planned: dec!(10.00),
                actual: Some(dec!(10.00)),
                currency: "USD".to_string(),
            },
        ];

        let summary = BudgetService::summarize(&lines, "USD", at(), &rates()).unwrap();

        assert_eq!(summary.expense_planned, None);
        assert_eq!(summary.total_planned, None);
        assert_eq!(summary.income_planned, Some(dec!(10.00)));
        assert_eq!(summary.unconverted_currencies, vec!["JPY".to_string()]);
    }

    #[test]
    fn test_summary_of_empty_period_is_zero() {
        let summary = BudgetService::summarize(&[], "EUR", at(), &rates()).unwrap();

        assert_eq!(summary.categories_count, 0);
        assert_eq!(summary.total_planned, Some(Decimal::ZERO));
        assert_eq!(summary.currency, "EUR");
    }
}
