//! Initial database migration.
//!
//! Creates the ledger tables with the portable schema builder so the same
//! migration runs on PostgreSQL and SQLite.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: ACCOUNTS & CATEGORIES
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Accounts::Currency).string_len(3).not_null())
                    .col(
                        ColumnDef::new(Accounts::Balance)
                            .decimal_len(16, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Accounts::Description).text())
                    .col(timestamp(Accounts::CreatedAt))
                    .col(timestamp(Accounts::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Categories::Description).text())
                    .col(ColumnDef::new(Categories::ParentId).integer())
                    .col(timestamp(Categories::CreatedAt))
                    .col(timestamp(Categories::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_categories_parent")
                            .from(Categories::Table, Categories::ParentId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: LEDGER
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::AccountId).integer().not_null())
                    .col(
                        ColumnDef::new(Transactions::Amount)
                            .decimal_len(16, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Transactions::CategoryId).integer())
                    .col(ColumnDef::new(Transactions::Description).text())
                    .col(ColumnDef::new(Transactions::TransactionDate).date().not_null())
                    .col(timestamp(Transactions::CreatedAt))
                    .col(timestamp(Transactions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_account")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_category")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transfers::FromAccountId).integer().not_null())
                    .col(
                        ColumnDef::new(Transfers::FromAmount)
                            .decimal_len(16, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transfers::FromCurrency).string_len(3).not_null())
                    .col(ColumnDef::new(Transfers::ToAccountId).integer().not_null())
                    .col(ColumnDef::new(Transfers::ToAmount).decimal_len(16, 2).not_null())
                    .col(ColumnDef::new(Transfers::ToCurrency).string_len(3).not_null())
                    .col(ColumnDef::new(Transfers::ExchangeRate).decimal_len(16, 8))
                    .col(ColumnDef::new(Transfers::Description).text())
                    .col(timestamp(Transfers::CreatedAt))
                    .col(timestamp(Transfers::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transfers_from_account")
                            .from(Transfers::Table, Transfers::FromAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transfers_to_account")
                            .from(Transfers::Table, Transfers::ToAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 3: CURRENCY RATES & SETTINGS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(CurrencyRates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CurrencyRates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CurrencyRates::CurrencyFrom)
                            .string_len(3)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CurrencyRates::CurrencyTo)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(CurrencyRates::Rate)
                            .decimal_len(16, 10)
                            .not_null(),
                    )
                    .col(timestamp(CurrencyRates::EffectiveFrom))
                    .col(ColumnDef::new(CurrencyRates::EffectiveTo).timestamp_with_time_zone())
                    .col(timestamp(CurrencyRates::CreatedAt))
                    .col(timestamp(CurrencyRates::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSettings::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserSettings::DefaultCurrency)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(timestamp(UserSettings::CreatedAt))
                    .col(timestamp(UserSettings::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 4: INDEXES
        // ============================================================
        manager
            .create_index(
                Index::create()
                    .name("idx_currency_rate_lookup")
                    .table(CurrencyRates::Table)
                    .col(CurrencyRates::CurrencyFrom)
                    .col(CurrencyRates::CurrencyTo)
                    .col(CurrencyRates::EffectiveFrom)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_account")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_category")
                    .table(Transactions::Table)
                    .col(Transactions::CategoryId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_transfers_from_account")
                    .table(Transfers::Table)
                    .col(Transfers::FromAccountId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_transfers_to_account")
                    .table(Transfers::Table)
                    .col(Transfers::ToAccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Transfers::Table.into_iden(),
            Transactions::Table.into_iden(),
            Categories::Table.into_iden(),
            Accounts::Table.into_iden(),
            CurrencyRates::Table.into_iden(),
            UserSettings::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

fn timestamp<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Name,
    Currency,
    Balance,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Description,
    ParentId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    AccountId,
    Amount,
    Currency,
    CategoryId,
    Description,
    TransactionDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transfers {
    Table,
    Id,
    FromAccountId,
    FromAmount,
    FromCurrency,
    ToAccountId,
    ToAmount,
    ToCurrency,
    ExchangeRate,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CurrencyRates {
    Table,
    Id,
    CurrencyFrom,
    CurrencyTo,
    Rate,
    EffectiveFrom,
    EffectiveTo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserSettings {
    Table,
    Id,
    DefaultCurrency,
    CreatedAt,
    UpdatedAt,
}
