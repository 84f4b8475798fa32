//! Shared setup for repository integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use coinpurse_core::currency::RateImportRecord;
use coinpurse_db::migration::{Migrator, MigratorTrait};
use coinpurse_db::repositories::{AccountRepository, CreateAccountInput, ExchangeRateRepository};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

/// Fresh in-memory database with the schema applied.
///
/// One connection only: every pooled connection to `sqlite::memory:`
/// would otherwise see its own empty database.
pub async fn setup() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn jan_first_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Stores `currency -> USD` at `rate`, open-ended from 2024-01-01.
pub async fn store_rate(db: &DatabaseConnection, currency: &str, rate: Decimal) {
    ExchangeRateRepository::new(db.clone())
        .import_rates(&[RateImportRecord {
            currency_from: currency.to_string(),
            rate_to_usd: rate,
            effective_from: jan_first_2024(),
            effective_to: None,
        }])
        .await
        .expect("Failed to store rate");
}

pub async fn create_account(
    db: &DatabaseConnection,
    name: &str,
    currency: &str,
    balance: Decimal,
) -> i32 {
    AccountRepository::new(db.clone())
        .create(CreateAccountInput {
            name: name.to_string(),
            currency: currency.to_string(),
            balance,
            description: None,
        })
        .await
        .expect("Failed to create account")
        .id
}

/// Current balance, at money scale.
pub async fn balance_of(db: &DatabaseConnection, id: i32) -> Decimal {
    AccountRepository::new(db.clone())
        .find_by_id(id)
        .await
        .expect("Failed to load account")
        .expect("Account should exist")
        .balance
        .round_dp(2)
}

/// Makes every later balance write on `account_id` fail inside the database,
/// after whatever the surrounding transaction has already written.
pub async fn refuse_balance_writes(db: &DatabaseConnection, account_id: i32) {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER refuse_balance_writes BEFORE UPDATE ON accounts \
         WHEN NEW.id = {account_id} \
         BEGIN SELECT RAISE(ABORT, 'balance write refused'); END"
    ))
    .await
    .expect("Failed to install trigger");
}

pub async fn allow_balance_writes(db: &DatabaseConnection) {
    db.execute_unprepared("DROP TRIGGER refuse_balance_writes")
        .await
        .expect("Failed to drop trigger");
}
