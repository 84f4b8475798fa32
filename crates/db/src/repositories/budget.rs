//! Budget repository: planned amounts per category and month.
//!
//! Actuals are computed on read from the category's transactions (its
//! subcategories included) within the budget month. Missing exchange rates
//! never fail a read: the affected figures come back empty and are logged.

use chrono::{DateTime, Utc};
use coinpurse_core::budget::{
    ActualAmount, ActualEntry, BudgetError as BudgetRule, BudgetLine, BudgetPeriod,
    BudgetService, BudgetSummary, CategoryKind,
};
use coinpurse_core::currency::CurrencyError;
use coinpurse_shared::types::PageRequest;
use coinpurse_shared::types::money::AMOUNT_SCALE;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};

use super::category::descendant_ids;
use super::exchange_rate::load_rate_table;
use super::settings::stored_default_currency;
use crate::entities::{budgets, categories, transactions};

/// Error types for budget operations.
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    /// Budget not found.
    #[error("Budget {0} not found")]
    NotFound(i32),

    /// Budgeted category not found.
    #[error("Category {0} not found")]
    CategoryNotFound(i32),

    /// A budget already exists for this category and month.
    #[error("Budget for category {category_id} in {year}-{month:02} already exists")]
    Duplicate {
        /// Category of the existing budget.
        category_id: i32,
        /// Budget year.
        year: i32,
        /// Budget month.
        month: u32,
    },

    /// Period or amount rule failure.
    #[error(transparent)]
    Rule(#[from] BudgetRule),

    /// A conversion failed for a reason other than a missing rate.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    /// Budget year.
    pub year: i32,
    /// Budget month, 1-based.
    pub month: u32,
    /// Budgeted category.
    pub category_id: i32,
    /// Planned amount, non-negative.
    pub planned_amount: Decimal,
    /// Budget currency; the default currency when absent.
    pub currency: Option<String>,
}

/// Input for updating a budget. Period and category are fixed.
#[derive(Debug, Clone, Default)]
pub struct UpdateBudgetInput {
    /// New planned amount.
    pub planned_amount: Option<Decimal>,
    /// New currency.
    pub currency: Option<String>,
}

/// A budget with its actual amount and variance.
#[derive(Debug, Clone)]
pub struct BudgetWithActual {
    /// The stored budget.
    pub budget: budgets::Model,
    /// Kind of the budgeted category.
    pub kind: CategoryKind,
    /// Actual amount in the budget currency.
    pub actual: ActualAmount,
}

/// One page of a period's budgets plus totals over the whole period.
#[derive(Debug, Clone)]
pub struct BudgetPeriodReport {
    /// Budgets on the requested page.
    pub items: Vec<BudgetWithActual>,
    /// Number of budgets in the period.
    pub total: u64,
    /// Totals in the default currency.
    pub summary: BudgetSummary,
}

/// Budget repository.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    db: DatabaseConnection,
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a budget for one category and month.
    ///
    /// # Errors
    ///
    /// `Rule` for a bad period or negative amount, `CategoryNotFound`, and
    /// `Duplicate` when the category already has a budget that month.
    pub async fn create(&self, input: CreateBudgetInput) -> Result<budgets::Model, BudgetError> {
        let period = BudgetPeriod::new(input.year, input.month)?;
        BudgetService::validate_planned_amount(input.planned_amount)?;

        let txn = self.db.begin().await?;

        if categories::Entity::find_by_id(input.category_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(BudgetError::CategoryNotFound(input.category_id));
        }

        let existing = budgets::Entity::find()
            .filter(budgets::Column::BudgetYear.eq(period.year()))
            .filter(budgets::Column::BudgetMonth.eq(month_column(&period)))
            .filter(budgets::Column::CategoryId.eq(input.category_id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(BudgetError::Duplicate {
                category_id: input.category_id,
                year: period.year(),
                month: period.month(),
            });
        }

        let currency = match input.currency {
            Some(currency) => currency,
            None => stored_default_currency(&txn).await?,
        };

        let now = Utc::now();
        let budget = budgets::ActiveModel {
            budget_year: Set(period.year()),
            budget_month: Set(month_column(&period)),
            category_id: Set(input.category_id),
            planned_amount: Set(input.planned_amount.round_dp(AMOUNT_SCALE)),
            currency: Set(currency),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            budget_id = budget.id,
            category_id = budget.category_id,
            year = budget.budget_year,
            month = budget.budget_month,
            planned = %budget.planned_amount,
            "Budget created"
        );
        Ok(normalize(budget))
    }

    /// Finds a budget by id.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<budgets::Model>, BudgetError> {
        Ok(budgets::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(normalize))
    }

    /// Finds a budget and computes its actual amount as of `at`.
    pub async fn find_with_actual(
        &self,
        id: i32,
        at: DateTime<Utc>,
    ) -> Result<BudgetWithActual, BudgetError> {
        let budget = self.find_by_id(id).await?.ok_or(BudgetError::NotFound(id))?;
        let mut enriched = self.with_actuals(vec![budget], at).await?;
        enriched.pop().ok_or(BudgetError::NotFound(id))
    }

    /// Lists one page of a month's budgets with actuals, plus period totals
    /// in `default_currency`.
    ///
    /// # Errors
    ///
    /// `Rule` for a bad period; otherwise only query failures.
    pub async fn list_by_period(
        &self,
        year: i32,
        month: u32,
        page: &PageRequest,
        default_currency: &str,
        at: DateTime<Utc>,
    ) -> Result<BudgetPeriodReport, BudgetError> {
        let period = BudgetPeriod::new(year, month)?;

        let all: Vec<budgets::Model> = budgets::Entity::find()
            .filter(budgets::Column::BudgetYear.eq(period.year()))
            .filter(budgets::Column::BudgetMonth.eq(month_column(&period)))
            .order_by_asc(budgets::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(normalize)
            .collect();
        let total = all.len() as u64;

        let enriched = self.with_actuals(all, at).await?;
        let lines: Vec<BudgetLine> = enriched
            .iter()
            .map(|entry| BudgetLine {
                kind: entry.kind,
                planned: entry.budget.planned_amount,
                actual: entry.actual.amount,
                currency: entry.budget.currency.clone(),
            })
            .collect();

        let currencies = lines
            .iter()
            .map(|line| line.currency.as_str())
            .chain(std::iter::once(default_currency));
        let rates = load_rate_table(&self.db, currencies, at).await?;
        let summary = BudgetService::summarize(&lines, default_currency, at, &rates)?;
        if !summary.unconverted_currencies.is_empty() {
            warn!(
                year,
                month,
                default_currency,
                currencies = ?summary.unconverted_currencies,
                "Budget totals unavailable: no exchange rate"
            );
        }

        let items = enriched
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .collect();

        Ok(BudgetPeriodReport {
            items,
            total,
            summary,
        })
    }

    /// Updates the planned amount or currency.
    pub async fn update(
        &self,
        id: i32,
        input: UpdateBudgetInput,
    ) -> Result<budgets::Model, BudgetError> {
        if let Some(amount) = input.planned_amount {
            BudgetService::validate_planned_amount(amount)?;
        }

        let txn = self.db.begin().await?;
        let existing = budgets::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(BudgetError::NotFound(id))?;

        let mut active: budgets::ActiveModel = existing.into();
        if let Some(amount) = input.planned_amount {
            active.planned_amount = Set(amount.round_dp(AMOUNT_SCALE));
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(budget_id = id, planned = %updated.planned_amount, currency = %updated.currency, "Budget updated");
        Ok(normalize(updated))
    }

    /// Deletes a budget.
    pub async fn delete(&self, id: i32) -> Result<(), BudgetError> {
        let existing = budgets::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(BudgetError::NotFound(id))?;
        existing.delete(&self.db).await?;

        info!(budget_id = id, "Budget deleted");
        Ok(())
    }

    async fn with_actuals(
        &self,
        budgets: Vec<budgets::Model>,
        at: DateTime<Utc>,
    ) -> Result<Vec<BudgetWithActual>, BudgetError> {
        let mut gathered = Vec::with_capacity(budgets.len());
        for budget in budgets {
            let kind = category_kind(&self.db, budget.category_id).await?;
            let entries = actual_entries(&self.db, &budget).await?;
            gathered.push((budget, kind, entries));
        }

        let currencies: Vec<&str> = gathered
            .iter()
            .flat_map(|(budget, _, entries)| {
                entries
                    .iter()
                    .map(|entry| entry.currency.as_str())
                    .chain(std::iter::once(budget.currency.as_str()))
            })
            .collect();
        let rates = load_rate_table(&self.db, currencies, at).await?;

        let mut enriched = Vec::with_capacity(gathered.len());
        for (budget, kind, entries) in gathered {
            let actual =
                BudgetService::actual_amount(kind, &entries, &budget.currency, at, &rates)?;
            if actual.amount.is_none() {
                warn!(
                    budget_id = budget.id,
                    currency = %budget.currency,
                    unconverted = ?actual.unconverted_currencies,
                    "Budget actual unavailable: no exchange rate"
                );
            }
            enriched.push(BudgetWithActual {
                budget,
                kind,
                actual,
            });
        }
        Ok(enriched)
    }
}

/// Signed amounts and currencies of the transactions a budget covers.
async fn actual_entries<C>(conn: &C, budget: &budgets::Model) -> Result<Vec<ActualEntry>, BudgetError>
where
    C: ConnectionTrait,
{
    let month = u32::try_from(budget.budget_month).unwrap_or(0);
    let period = BudgetPeriod::new(budget.budget_year, month)?;
    let ids = descendant_ids(conn, budget.category_id).await?;

    let rows: Vec<(Decimal, String)> = transactions::Entity::find()
        .select_only()
        .column(transactions::Column::Amount)
        .column(transactions::Column::Currency)
        .filter(transactions::Column::CategoryId.is_in(ids))
        .filter(transactions::Column::TransactionDate.between(period.first_day(), period.last_day()))
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(amount, currency)| ActualEntry {
            amount: amount.round_dp(AMOUNT_SCALE),
            currency,
        })
        .collect())
}

async fn category_kind<C>(conn: &C, category_id: i32) -> Result<CategoryKind, BudgetError>
where
    C: ConnectionTrait,
{
    let category = categories::Entity::find_by_id(category_id)
        .one(conn)
        .await?
        .ok_or(BudgetError::CategoryNotFound(category_id))?;
    Ok(category.kind.parse::<CategoryKind>()?)
}

/// Deletes every budget of a category.
pub(crate) async fn delete_for_category<C>(conn: &C, category_id: i32) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let deleted = budgets::Entity::delete_many()
        .filter(budgets::Column::CategoryId.eq(category_id))
        .exec(conn)
        .await?;
    Ok(deleted.rows_affected)
}

fn month_column(period: &BudgetPeriod) -> i32 {
    i32::try_from(period.month()).unwrap_or(i32::MAX)
}

fn normalize(mut budget: budgets::Model) -> budgets::Model {
    budget.planned_amount = budget.planned_amount.round_dp(AMOUNT_SCALE);
    budget
}
