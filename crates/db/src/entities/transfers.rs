//! `SeaORM` Entity for transfers table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub from_account_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub from_amount: Decimal,
    pub from_currency: String,
    pub to_account_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub to_amount: Decimal,
    pub to_currency: String,
    /// `None` when both sides share a currency.
    #[sea_orm(column_type = "Decimal(Some((16, 8)))", nullable)]
    pub exchange_rate: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::FromAccountId",
        to = "super::accounts::Column::Id"
    )]
    FromAccount,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::ToAccountId",
        to = "super::accounts::Column::Id"
    )]
    ToAccount,
}

impl ActiveModelBehavior for ActiveModel {}
