//! Exchange rate routes: listing, snapshot, conversion and file import.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use coinpurse_core::currency::{ImportError, RateImportRecord, parse_csv, parse_json};
use coinpurse_db::entities::currency_rates;
use coinpurse_db::entities::currency_rates::RATE_COLUMN_SCALE;
use coinpurse_db::repositories::ExchangeRateRepository;
use coinpurse_shared::types::money::parse_amount;
use coinpurse_shared::types::{CurrencyCode, PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use super::rate;
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::ApiQuery;

/// Largest accepted rate file.
pub const MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// Digits shown on a computed pair rate.
const PAIR_RATE_SCALE: u32 = 12;

/// Creates the currency rate routes.
pub fn routes() -> Router<AppState> {
    let imports = Router::new()
        .route("/currency-rates/import/csv", post(import_csv))
        .route("/currency-rates/import/json", post(import_json))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_IMPORT_BYTES));

    Router::new()
        .route("/currency-rates", get(list_rates))
        .route("/currency-rates/current", get(current_rates))
        .route("/currency-rates/convert", get(convert))
        .merge(imports)
}

/// Query parameters for a conversion.
#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    /// Amount in `from`, at most two decimals.
    pub amount: String,
    /// Source currency.
    pub from: CurrencyCode,
    /// Target currency.
    pub to: CurrencyCode,
    /// Instant to resolve rates at; defaults to now.
    pub at: Option<DateTime<Utc>>,
}

/// Response for a conversion.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    /// Input amount.
    pub amount: Decimal,
    /// Source currency.
    pub from: String,
    /// Target currency.
    pub to: String,
    /// Rate applied: `converted_amount = amount * rate`.
    pub rate: Decimal,
    /// Result, unrounded.
    pub converted_amount: Decimal,
    /// Instant the rates were resolved at.
    pub at: DateTime<Utc>,
}

/// Response for the active rate snapshot.
#[derive(Debug, Serialize)]
pub struct CurrentRatesResponse {
    /// Pivot currency every rate points to.
    pub base_currency: &'static str,
    /// Currency code to rate-to-USD, USD included.
    pub rates: BTreeMap<String, Decimal>,
    /// Instant of the snapshot.
    pub as_of: DateTime<Utc>,
}

/// Response for a stored rate row.
#[derive(Debug, Serialize)]
pub struct RateResponse {
    /// Row ID.
    pub id: i32,
    /// Source currency.
    pub currency_from: String,
    /// Always USD.
    pub currency_to: String,
    /// Rate to USD.
    pub rate: Decimal,
    /// Start of the validity window.
    pub effective_from: DateTime<Utc>,
    /// End of the window; null when open-ended.
    pub effective_to: Option<DateTime<Utc>>,
}

impl From<currency_rates::Model> for RateResponse {
    fn from(model: currency_rates::Model) -> Self {
        Self {
            id: model.id,
            currency_from: model.currency_from,
            currency_to: model.currency_to,
            rate: rate(model.rate, RATE_COLUMN_SCALE),
            effective_from: model.effective_from,
            effective_to: model.effective_to,
        }
    }
}

/// Response for an import.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// Records processed (inserted or updated).
    pub imported: usize,
}

/// GET `/currency-rates`
async fn list_rates(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<PageResponse<RateResponse>>> {
    let (rows, total) = ExchangeRateRepository::new((*state.db).clone())
        .list(&page)
        .await?;
    Ok(Json(
        PageResponse::new(rows, &page, total).map(RateResponse::from),
    ))
}

/// GET `/currency-rates/current`
async fn current_rates(State(state): State<AppState>) -> ApiResult<Json<CurrentRatesResponse>> {
    let snapshot = ExchangeRateRepository::new((*state.db).clone())
        .current_rates(Utc::now())
        .await?;
    Ok(Json(CurrentRatesResponse {
        base_currency: "USD",
        rates: snapshot
            .rates
            .into_iter()
            .map(|(currency, value)| (currency, rate(value, RATE_COLUMN_SCALE)))
            .collect(),
        as_of: snapshot.at,
    }))
}

/// GET `/currency-rates/convert`
async fn convert(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ConvertQuery>,
) -> ApiResult<Json<ConvertResponse>> {
    let amount = parse_amount(&query.amount)?;
    let at = query.at.unwrap_or_else(Utc::now);
    let repo = ExchangeRateRepository::new((*state.db).clone());

    let pair_rate = repo
        .get_rate(query.from.as_str(), query.to.as_str(), at)
        .await?;
    let converted_amount = repo
        .convert(amount, query.from.as_str(), query.to.as_str(), at)
        .await?;

    Ok(Json(ConvertResponse {
        amount,
        from: query.from.into(),
        to: query.to.into(),
        rate: rate(pair_rate, PAIR_RATE_SCALE),
        converted_amount: converted_amount.normalize(),
        at,
    }))
}

/// POST `/currency-rates/import/csv`
async fn import_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let data = read_upload(multipart, "csv").await?;
    import(&state, parse_csv(&data)).await
}

/// POST `/currency-rates/import/json`
async fn import_json(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let data = read_upload(multipart, "json").await?;
    import(&state, parse_json(&data)).await
}

async fn import(
    state: &AppState,
    parsed: Result<Vec<RateImportRecord>, ImportError>,
) -> ApiResult<Json<ImportResponse>> {
    let records = parsed?;
    if records.is_empty() {
        return Err(ApiError::validation("Rate file contains no records"));
    }

    let imported = ExchangeRateRepository::new((*state.db).clone())
        .import_rates(&records)
        .await?;
    info!(imported, "Rate file imported");
    Ok(Json(ImportResponse { imported }))
}

/// Reads the `file` field, requiring a file name ending in `.{extension}`.
async fn read_upload(mut multipart: Multipart, extension: &str) -> ApiResult<Vec<u8>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let matches = file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(extension));
        if !matches {
            return Err(ApiError::validation(format!(
                "File must have a .{extension} extension"
            )));
        }

        return Ok(field.bytes().await?.to_vec());
    }

    Err(ApiError::validation(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}
