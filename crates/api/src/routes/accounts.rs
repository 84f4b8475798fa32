//! Account routes with default-currency enrichment.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use coinpurse_core::analytics::TotalBalance;
use coinpurse_core::ledger::EXCHANGE_RATE_SCALE;
use coinpurse_db::entities::accounts;
use coinpurse_db::repositories::{
    AccountRepository, CreateAccountInput, EnrichedAccount, SettingsRepository, UpdateAccountInput,
};
use coinpurse_shared::AppError;
use coinpurse_shared::types::money::deserialize_optional_amount;
use coinpurse_shared::types::{CurrencyCode, PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{money, rate};
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiQuery, deserialize_some};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/total-balance", get(get_total_balance))
        .route(
            "/accounts/{account_id}",
            get(get_account).patch(update_account).delete(delete_account),
        )
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account name.
    pub name: String,
    /// ISO currency code.
    pub currency: CurrencyCode,
    /// Opening balance; defaults to zero.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub balance: Option<Decimal>,
    /// Account description.
    pub description: Option<String>,
}

/// Request body for updating an account.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    /// Account name.
    pub name: Option<String>,
    /// ISO currency code. The balance is not converted.
    pub currency: Option<CurrencyCode>,
    /// Balance correction.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub balance: Option<Decimal>,
    /// Description; `null` clears it.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
}

/// Response for an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: i32,
    /// Account name.
    pub name: String,
    /// Currency code.
    pub currency: String,
    /// Current balance.
    pub balance: Decimal,
    /// Account description.
    pub description: Option<String>,
    /// Currency the converted balance is expressed in.
    pub default_currency: String,
    /// Balance in the default currency; null when same currency or no rate.
    pub balance_in_default_currency: Option<Decimal>,
    /// Rate applied for the conversion.
    pub exchange_rate_used: Option<Decimal>,
    /// Share of the total across all accounts, 0..1.
    pub percentage_of_total: Option<Decimal>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<EnrichedAccount> for AccountResponse {
    fn from(entry: EnrichedAccount) -> Self {
        let EnrichedAccount {
            account,
            enrichment,
            percentage_of_total,
        } = entry;
        Self {
            id: account.id,
            name: account.name,
            currency: account.currency,
            balance: money(account.balance),
            description: account.description,
            default_currency: enrichment.default_currency,
            balance_in_default_currency: enrichment.balance_in_default_currency.map(money),
            exchange_rate_used: enrichment
                .exchange_rate_used
                .map(|value| rate(value, EXCHANGE_RATE_SCALE)),
            percentage_of_total: percentage_of_total.map(money),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Response for the total balance across accounts.
#[derive(Debug, Serialize)]
pub struct TotalBalanceResponse {
    /// Currency of `total`.
    pub default_currency: String,
    /// Sum of every convertible balance.
    pub total: Decimal,
    /// Per-currency subtotals.
    pub breakdown: Vec<CurrencyBreakdownResponse>,
    /// Accounts left out because no rate was available.
    pub unconverted_account_ids: Vec<i32>,
    /// Instant the rates were resolved at.
    pub as_of: DateTime<Utc>,
}

/// One currency in the total balance.
#[derive(Debug, Serialize)]
pub struct CurrencyBreakdownResponse {
    /// Currency code.
    pub currency: String,
    /// Sum of balances in this currency.
    pub balance: Decimal,
    /// That sum in the default currency.
    pub converted_balance: Option<Decimal>,
    /// Rate applied.
    pub exchange_rate: Option<Decimal>,
    /// Number of accounts in this currency.
    pub account_count: usize,
}

impl From<TotalBalance> for TotalBalanceResponse {
    fn from(report: TotalBalance) -> Self {
        Self {
            default_currency: report.default_currency,
            total: money(report.total),
            breakdown: report
                .breakdown
                .into_iter()
                .map(|entry| CurrencyBreakdownResponse {
                    currency: entry.currency,
                    balance: money(entry.balance),
                    converted_balance: entry.converted_balance.map(money),
                    exchange_rate: entry
                        .exchange_rate
                        .map(|value| rate(value, EXCHANGE_RATE_SCALE)),
                    account_count: entry.account_count,
                })
                .collect(),
            unconverted_account_ids: report.unconverted_account_ids,
            as_of: report.as_of,
        }
    }
}

/// GET `/accounts` - List accounts.
async fn list_accounts(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<PageResponse<AccountResponse>>> {
    let repo = AccountRepository::new((*state.db).clone());
    let default_currency = SettingsRepository::new((*state.db).clone())
        .default_currency()
        .await?;

    let (accounts, total) = repo.list(&page).await?;
    let enriched = repo.enrich(accounts, &default_currency, Utc::now()).await?;

    Ok(Json(
        PageResponse::new(enriched, &page, total).map(AccountResponse::from),
    ))
}

/// POST `/accounts` - Create an account.
async fn create_account(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let balance = payload.balance.unwrap_or(Decimal::ZERO);
    if balance < Decimal::ZERO {
        return Err(ApiError::validation("Initial balance cannot be negative"));
    }

    let repo = AccountRepository::new((*state.db).clone());
    let account = repo
        .create(CreateAccountInput {
            name: payload.name,
            currency: payload.currency.into(),
            balance,
            description: payload.description,
        })
        .await?;

    let response = enriched_one(&state, &repo, account).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET `/accounts/{account_id}` - Get one account.
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<i32>,
) -> ApiResult<Json<AccountResponse>> {
    let repo = AccountRepository::new((*state.db).clone());
    let account = repo
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account {account_id} not found")))?;

    Ok(Json(enriched_one(&state, &repo, account).await?))
}

/// PATCH `/accounts/{account_id}` - Update an account.
async fn update_account(
    State(state): State<AppState>,
    Path(account_id): Path<i32>,
    ApiJson(payload): ApiJson<UpdateAccountRequest>,
) -> ApiResult<Json<AccountResponse>> {
    if payload.balance.is_some_and(|balance| balance < Decimal::ZERO) {
        return Err(ApiError::validation("Balance cannot be negative"));
    }

    let repo = AccountRepository::new((*state.db).clone());
    let account = repo
        .update(
            account_id,
            UpdateAccountInput {
                name: payload.name,
                currency: payload.currency.map(Into::into),
                balance: payload.balance,
                description: payload.description,
            },
        )
        .await?;

    Ok(Json(enriched_one(&state, &repo, account).await?))
}

/// DELETE `/accounts/{account_id}` - Delete an account without ledger rows.
async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<i32>,
) -> ApiResult<StatusCode> {
    AccountRepository::new((*state.db).clone())
        .delete(account_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/accounts/total-balance` - Total across accounts in the default currency.
async fn get_total_balance(State(state): State<AppState>) -> ApiResult<Json<TotalBalanceResponse>> {
    let default_currency = SettingsRepository::new((*state.db).clone())
        .default_currency()
        .await?;
    let report = AccountRepository::new((*state.db).clone())
        .total_balance(&default_currency, Utc::now())
        .await?;
    Ok(Json(report.into()))
}

async fn enriched_one(
    state: &AppState,
    repo: &AccountRepository,
    account: accounts::Model,
) -> ApiResult<AccountResponse> {
    let default_currency = SettingsRepository::new((*state.db).clone())
        .default_currency()
        .await?;
    repo.enrich(vec![account], &default_currency, Utc::now())
        .await?
        .pop()
        .map(AccountResponse::from)
        .ok_or_else(|| AppError::Internal("Enrichment returned no account".to_string()).into())
}
