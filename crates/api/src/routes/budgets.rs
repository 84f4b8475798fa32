//! Budget routes: monthly planned amounts per category with actuals.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use coinpurse_core::budget::{BudgetService, BudgetSummary, CategoryKind, VarianceStatus};
use coinpurse_db::repositories::{
    BudgetRepository, BudgetWithActual, CreateBudgetInput, SettingsRepository, UpdateBudgetInput,
};
use coinpurse_shared::types::money::{deserialize_amount, deserialize_optional_amount};
use coinpurse_shared::types::{CurrencyCode, PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money;
use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiQuery};

/// Creates the budget routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(list_budgets).post(create_budget))
        .route(
            "/budgets/{budget_id}",
            get(get_budget).patch(update_budget).delete(delete_budget),
        )
}

/// Request body for creating a budget.
#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    /// Budget year, 2000..=2100.
    pub budget_year: i32,
    /// Budget month, 1..=12.
    pub budget_month: u32,
    /// Budgeted category.
    pub category_id: i32,
    /// Planned amount, non-negative.
    #[serde(deserialize_with = "deserialize_amount")]
    pub planned_amount: Decimal,
    /// Budget currency; the default currency when omitted.
    pub currency: Option<CurrencyCode>,
}

/// Request body for updating a budget.
#[derive(Debug, Deserialize)]
pub struct UpdateBudgetRequest {
    /// New planned amount.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub planned_amount: Option<Decimal>,
    /// New currency.
    pub currency: Option<CurrencyCode>,
}

/// Query selecting the budget month.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    /// Budget year.
    pub year: i32,
    /// Budget month.
    pub month: u32,
}

/// Response for a budget.
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    /// Budget ID.
    pub id: i32,
    /// Budget year.
    pub budget_year: i32,
    /// Budget month.
    pub budget_month: i32,
    /// Budgeted category.
    pub category_id: i32,
    /// Kind of the category.
    pub category_kind: CategoryKind,
    /// Planned amount.
    pub planned_amount: Decimal,
    /// Budget currency.
    pub currency: String,
    /// Actual amount in the budget currency; null without a rate.
    pub actual_amount: Option<Decimal>,
    /// Planned minus actual for expenses, actual minus planned for income.
    pub variance: Option<Decimal>,
    /// Actual as a percentage of planned.
    pub utilization_percent: Option<Decimal>,
    /// Variance classification.
    pub status: Option<VarianceStatus>,
    /// Transaction currencies without a rate into the budget currency.
    pub unconverted_currencies: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<BudgetWithActual> for BudgetResponse {
    fn from(entry: BudgetWithActual) -> Self {
        let BudgetWithActual {
            budget,
            kind,
            actual,
        } = entry;
        let variance = actual
            .amount
            .map(|amount| BudgetService::calculate_variance(budget.planned_amount, amount, kind));
        Self {
            id: budget.id,
            budget_year: budget.budget_year,
            budget_month: budget.budget_month,
            category_id: budget.category_id,
            category_kind: kind,
            planned_amount: money(budget.planned_amount),
            currency: budget.currency,
            actual_amount: actual.amount.map(money),
            variance: variance.as_ref().map(|v| money(v.variance)),
            utilization_percent: variance.as_ref().map(|v| money(v.utilization_percent)),
            status: variance.map(|v| v.status),
            unconverted_currencies: actual.unconverted_currencies,
            created_at: budget.created_at,
            updated_at: budget.updated_at,
        }
    }
}

/// Period totals in the default currency.
#[derive(Debug, Serialize)]
pub struct BudgetSummaryResponse {
    /// Currency of every total.
    pub currency: String,
    /// Budgets in the period.
    pub categories_count: usize,
    /// Sum of planned amounts.
    pub total_planned: Option<Decimal>,
    /// Sum of actual amounts.
    pub total_actual: Option<Decimal>,
    /// Planned income.
    pub income_planned: Option<Decimal>,
    /// Actual income.
    pub income_actual: Option<Decimal>,
    /// Planned expenses.
    pub expense_planned: Option<Decimal>,
    /// Actual expenses.
    pub expense_actual: Option<Decimal>,
    /// Currencies left unconverted; the totals they feed are null.
    pub unconverted_currencies: Vec<String>,
}

impl From<BudgetSummary> for BudgetSummaryResponse {
    fn from(summary: BudgetSummary) -> Self {
        Self {
            currency: summary.currency,
            categories_count: summary.categories_count,
            total_planned: summary.total_planned.map(money),
            total_actual: summary.total_actual.map(money),
            income_planned: summary.income_planned.map(money),
            income_actual: summary.income_actual.map(money),
            expense_planned: summary.expense_planned.map(money),
            expense_actual: summary.expense_actual.map(money),
            unconverted_currencies: summary.unconverted_currencies,
        }
    }
}

/// A page of budgets plus period totals.
#[derive(Debug, Serialize)]
pub struct BudgetListResponse {
    /// The page.
    #[serde(flatten)]
    pub page: PageResponse<BudgetResponse>,
    /// Totals over the whole period.
    pub summary: BudgetSummaryResponse,
}

/// GET `/budgets?year=&month=` - One month's budgets with actuals.
async fn list_budgets(
    State(state): State<AppState>,
    ApiQuery(period): ApiQuery<PeriodQuery>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<BudgetListResponse>> {
    let default_currency = SettingsRepository::new((*state.db).clone())
        .default_currency()
        .await?;
    let report = BudgetRepository::new((*state.db).clone())
        .list_by_period(
            period.year,
            period.month,
            &page,
            &default_currency,
            Utc::now(),
        )
        .await?;

    Ok(Json(BudgetListResponse {
        page: PageResponse::new(report.items, &page, report.total).map(BudgetResponse::from),
        summary: report.summary.into(),
    }))
}

/// POST `/budgets` - Create a budget.
async fn create_budget(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateBudgetRequest>,
) -> ApiResult<impl IntoResponse> {
    let repo = BudgetRepository::new((*state.db).clone());
    let budget = repo
        .create(CreateBudgetInput {
            year: payload.budget_year,
            month: payload.budget_month,
            category_id: payload.category_id,
            planned_amount: payload.planned_amount,
            currency: payload.currency.map(Into::into),
        })
        .await?;

    let response = repo.find_with_actual(budget.id, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(BudgetResponse::from(response))))
}

/// GET `/budgets/{budget_id}` - One budget with its actual amount.
async fn get_budget(
    State(state): State<AppState>,
    Path(budget_id): Path<i32>,
) -> ApiResult<Json<BudgetResponse>> {
    let budget = BudgetRepository::new((*state.db).clone())
        .find_with_actual(budget_id, Utc::now())
        .await?;
    Ok(Json(budget.into()))
}

/// PATCH `/budgets/{budget_id}` - Change the planned amount or currency.
async fn update_budget(
    State(state): State<AppState>,
    Path(budget_id): Path<i32>,
    ApiJson(payload): ApiJson<UpdateBudgetRequest>,
) -> ApiResult<Json<BudgetResponse>> {
    let repo = BudgetRepository::new((*state.db).clone());
    repo.update(
        budget_id,
        UpdateBudgetInput {
            planned_amount: payload.planned_amount,
            currency: payload.currency.map(Into::into),
        },
    )
    .await?;
    Ok(Json(repo.find_with_actual(budget_id, Utc::now()).await?.into()))
}

/// DELETE `/budgets/{budget_id}` - Delete a budget.
async fn delete_budget(
    State(state): State<AppState>,
    Path(budget_id): Path<i32>,
) -> ApiResult<StatusCode> {
    BudgetRepository::new((*state.db).clone())
        .delete(budget_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
