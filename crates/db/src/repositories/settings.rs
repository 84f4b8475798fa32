//! Settings repository: the process-wide settings row.

use chrono::Utc;
use coinpurse_core::currency::PIVOT_CURRENCY;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set,
    TransactionTrait,
};
use tracing::info;

use crate::entities::user_settings;

/// Primary key of the single settings row.
pub const SETTINGS_ROW_ID: i32 = 1;

/// Error types for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Settings repository.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    db: DatabaseConnection,
}

impl SettingsRepository {
    /// Creates a new settings repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the settings row, creating it with USD on first read.
    pub async fn get_or_create(&self) -> Result<user_settings::Model, SettingsError> {
        let txn = self.db.begin().await?;
        let settings = match user_settings::Entity::find_by_id(SETTINGS_ROW_ID).one(&txn).await? {
            Some(settings) => settings,
            None => {
                let now = Utc::now();
                let created = user_settings::ActiveModel {
                    id: Set(SETTINGS_ROW_ID),
                    default_currency: Set(PIVOT_CURRENCY.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
                info!(default_currency = %created.default_currency, "Settings initialized");
                created
            }
        };
        txn.commit().await?;
        Ok(settings)
    }

    /// The currency enrichment and totals are displayed in.
    pub async fn default_currency(&self) -> Result<String, SettingsError> {
        Ok(self.get_or_create().await?.default_currency)
    }

    /// Sets the default display currency.
    pub async fn update_default_currency(
        &self,
        currency: &str,
    ) -> Result<user_settings::Model, SettingsError> {
        let current = self.get_or_create().await?;
        let mut active: user_settings::ActiveModel = current.into();
        active.default_currency = Set(currency.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        info!(default_currency = %updated.default_currency, "Default currency updated");
        Ok(updated)
    }
}

/// The stored default currency, or USD before the settings row exists.
pub(crate) async fn stored_default_currency<C>(conn: &C) -> Result<String, DbErr>
where
    C: ConnectionTrait,
{
    Ok(user_settings::Entity::find_by_id(SETTINGS_ROW_ID)
        .one(conn)
        .await?
        .map_or_else(|| PIVOT_CURRENCY.to_string(), |settings| settings.default_currency))
}
