//! Transfer routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use coinpurse_core::ledger::EXCHANGE_RATE_SCALE;
use coinpurse_db::entities::transfers;
use coinpurse_db::repositories::{
    CreateTransferInput, TransferRepository, UpdateTransferInput,
};
use coinpurse_shared::types::money::{deserialize_amount, deserialize_optional_amount};
use coinpurse_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{money, rate};
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiQuery, deserialize_some};

/// Creates the transfer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", get(list_transfers).post(create_transfer))
        .route(
            "/transfers/{transfer_id}",
            get(get_transfer).patch(update_transfer).delete(delete_transfer),
        )
}

/// Query parameters for listing transfers.
#[derive(Debug, Deserialize)]
pub struct ListTransfersQuery {
    /// Transfers into or out of this account.
    pub account_id: Option<i32>,
    /// Items to skip.
    pub skip: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Request body for creating a transfer.
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    /// Debited account.
    pub from_account_id: i32,
    /// Credited account.
    pub to_account_id: i32,
    /// Amount debited, in the source currency.
    #[serde(deserialize_with = "deserialize_amount")]
    pub from_amount: Decimal,
    /// Amount credited; computed from stored rates when omitted.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub to_amount: Option<Decimal>,
    /// Description.
    pub description: Option<String>,
}

/// Request body for updating a transfer.
#[derive(Debug, Deserialize)]
pub struct UpdateTransferRequest {
    /// New source amount.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub from_amount: Option<Decimal>,
    /// New destination amount.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub to_amount: Option<Decimal>,
    /// Description; `null` clears it.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
}

/// Response for a transfer.
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    /// Transfer ID.
    pub id: i32,
    /// Debited account.
    pub from_account_id: i32,
    /// Amount debited.
    pub from_amount: Decimal,
    /// Source currency.
    pub from_currency: String,
    /// Credited account.
    pub to_account_id: i32,
    /// Amount credited.
    pub to_amount: Decimal,
    /// Destination currency.
    pub to_currency: String,
    /// `to_amount / from_amount`; null for same-currency transfers.
    pub exchange_rate: Option<Decimal>,
    /// Description.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<transfers::Model> for TransferResponse {
    fn from(model: transfers::Model) -> Self {
        Self {
            id: model.id,
            from_account_id: model.from_account_id,
            from_amount: money(model.from_amount),
            from_currency: model.from_currency,
            to_account_id: model.to_account_id,
            to_amount: money(model.to_amount),
            to_currency: model.to_currency,
            exchange_rate: model
                .exchange_rate
                .map(|value| rate(value, EXCHANGE_RATE_SCALE)),
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// GET `/transfers`
async fn list_transfers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListTransfersQuery>,
) -> ApiResult<Json<PageResponse<TransferResponse>>> {
    let default = PageRequest::default();
    let page = PageRequest {
        skip: query.skip.unwrap_or(default.skip),
        limit: query.limit.unwrap_or(default.limit),
    };
    let (rows, total) = TransferRepository::new((*state.db).clone())
        .list(query.account_id, &page)
        .await?;
    Ok(Json(
        PageResponse::new(rows, &page, total).map(TransferResponse::from),
    ))
}

/// POST `/transfers`
async fn create_transfer(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateTransferRequest>,
) -> ApiResult<impl IntoResponse> {
    let transfer = TransferRepository::new((*state.db).clone())
        .create(CreateTransferInput {
            from_account_id: payload.from_account_id,
            to_account_id: payload.to_account_id,
            from_amount: payload.from_amount,
            to_amount: payload.to_amount,
            description: payload.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(TransferResponse::from(transfer))))
}

/// GET `/transfers/{transfer_id}`
async fn get_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<i32>,
) -> ApiResult<Json<TransferResponse>> {
    TransferRepository::new((*state.db).clone())
        .find_by_id(transfer_id)
        .await?
        .map(|transfer| Json(transfer.into()))
        .ok_or_else(|| ApiError::not_found(format!("Transfer {transfer_id} not found")))
}

/// PATCH `/transfers/{transfer_id}`
async fn update_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<i32>,
    ApiJson(payload): ApiJson<UpdateTransferRequest>,
) -> ApiResult<Json<TransferResponse>> {
    let transfer = TransferRepository::new((*state.db).clone())
        .update(
            transfer_id,
            UpdateTransferInput {
                from_amount: payload.from_amount,
                to_amount: payload.to_amount,
                description: payload.description,
            },
        )
        .await?;
    Ok(Json(transfer.into()))
}

/// DELETE `/transfers/{transfer_id}`
async fn delete_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<i32>,
) -> ApiResult<StatusCode> {
    TransferRepository::new((*state.db).clone())
        .delete(transfer_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
