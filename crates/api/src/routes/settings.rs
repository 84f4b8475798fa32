//! Settings routes: the default display currency.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use coinpurse_db::entities::user_settings;
use coinpurse_db::repositories::SettingsRepository;
use coinpurse_shared::types::CurrencyCode;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::ApiJson;

/// Creates the settings routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).patch(update_settings))
}

/// Request body for updating settings.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// New default currency.
    pub default_currency: Option<CurrencyCode>,
}

/// Response for settings.
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    /// Currency balances are displayed in.
    pub default_currency: String,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<user_settings::Model> for SettingsResponse {
    fn from(model: user_settings::Model) -> Self {
        Self {
            default_currency: model.default_currency,
            updated_at: model.updated_at,
        }
    }
}

/// GET `/settings`
async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SettingsResponse>> {
    let settings = SettingsRepository::new((*state.db).clone())
        .get_or_create()
        .await?;
    Ok(Json(settings.into()))
}

/// PATCH `/settings`
async fn update_settings(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateSettingsRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    let repo = SettingsRepository::new((*state.db).clone());
    let settings = match payload.default_currency {
        Some(currency) => repo.update_default_currency(currency.as_str()).await?,
        None => repo.get_or_create().await?,
    };
    Ok(Json(settings.into()))
}
