//! `SeaORM` Entity for currency_rates table.
//!
//! Every row quotes `currency_from` against `currency_to`, which is always USD.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "currency_rates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub currency_from: String,
    pub currency_to: String,
    #[sea_orm(column_type = "Decimal(Some((16, 10)))")]
    pub rate: Decimal,
    pub effective_from: DateTimeUtc,
    pub effective_to: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Fractional digits of the `rate` column; import parsing rejects anything finer.
pub const RATE_COLUMN_SCALE: u32 = coinpurse_shared::types::RATE_SCALE;

impl From<Model> for coinpurse_core::currency::RateRecord {
    fn from(model: Model) -> Self {
        Self {
            currency_from: model.currency_from,
            rate: model.rate.round_dp(RATE_COLUMN_SCALE),
            effective_from: model.effective_from,
            effective_to: model.effective_to,
        }
    }
}
