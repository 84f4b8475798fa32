//! Transaction routes. Every mutation moves the account balance with it.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, NaiveDate, Utc};
use coinpurse_db::entities::transactions;
use coinpurse_db::repositories::{
    CreateTransactionInput, TransactionFilter, TransactionRepository, UpdateTransactionInput,
};
use coinpurse_shared::types::money::{deserialize_amount, deserialize_optional_amount};
use coinpurse_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money;
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiQuery, deserialize_some};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/{transaction_id}",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by account.
    pub account_id: Option<i32>,
    /// Filter by category, including its subcategories.
    pub category_id: Option<i32>,
    /// Items to skip.
    pub skip: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

impl ListTransactionsQuery {
    fn page(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest {
            skip: self.skip.unwrap_or(default.skip),
            limit: self.limit.unwrap_or(default.limit),
        }
    }
}

/// Request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Owning account.
    pub account_id: i32,
    /// Signed amount: positive income, negative expense.
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    /// Category.
    pub category_id: Option<i32>,
    /// Description.
    pub description: Option<String>,
    /// Booking date; defaults to today (UTC).
    pub transaction_date: Option<NaiveDate>,
}

/// Request body for updating a transaction.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    /// New signed amount.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub amount: Option<Decimal>,
    /// Category; `null` uncategorizes.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub category_id: Option<Option<i32>>,
    /// Description; `null` clears it.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    /// Booking date.
    pub transaction_date: Option<NaiveDate>,
}

/// Response for a transaction.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: i32,
    /// Owning account.
    pub account_id: i32,
    /// Signed amount.
    pub amount: Decimal,
    /// Account currency at creation.
    pub currency: String,
    /// Category.
    pub category_id: Option<i32>,
    /// Description.
    pub description: Option<String>,
    /// Booking date.
    pub transaction_date: NaiveDate,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<transactions::Model> for TransactionResponse {
    fn from(model: transactions::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            amount: money(model.amount),
            currency: model.currency,
            category_id: model.category_id,
            description: model.description,
            transaction_date: model.transaction_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// GET `/transactions`
async fn list_transactions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> ApiResult<Json<PageResponse<TransactionResponse>>> {
    let page = query.page();
    let filter = TransactionFilter {
        account_id: query.account_id,
        category_id: query.category_id,
    };
    let (rows, total) = TransactionRepository::new((*state.db).clone())
        .list(filter, &page)
        .await?;
    Ok(Json(
        PageResponse::new(rows, &page, total).map(TransactionResponse::from),
    ))
}

/// POST `/transactions`
async fn create_transaction(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateTransactionRequest>,
) -> ApiResult<impl IntoResponse> {
    let transaction = TransactionRepository::new((*state.db).clone())
        .create(CreateTransactionInput {
            account_id: payload.account_id,
            amount: payload.amount,
            category_id: payload.category_id,
            description: payload.description,
            transaction_date: payload
                .transaction_date
                .unwrap_or_else(|| Utc::now().date_naive()),
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse::from(transaction)),
    ))
}

/// GET `/transactions/{transaction_id}`
async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<i32>,
) -> ApiResult<Json<TransactionResponse>> {
    TransactionRepository::new((*state.db).clone())
        .find_by_id(transaction_id)
        .await?
        .map(|transaction| Json(transaction.into()))
        .ok_or_else(|| ApiError::not_found(format!("Transaction {transaction_id} not found")))
}

/// PATCH `/transactions/{transaction_id}`
async fn update_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<i32>,
    ApiJson(payload): ApiJson<UpdateTransactionRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    let transaction = TransactionRepository::new((*state.db).clone())
        .update(
            transaction_id,
            UpdateTransactionInput {
                amount: payload.amount,
                category_id: payload.category_id,
                description: payload.description,
                transaction_date: payload.transaction_date,
            },
        )
        .await?;
    Ok(Json(transaction.into()))
}

/// DELETE `/transactions/{transaction_id}`
async fn delete_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<i32>,
) -> ApiResult<StatusCode> {
    TransactionRepository::new((*state.db).clone())
        .delete(transaction_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
