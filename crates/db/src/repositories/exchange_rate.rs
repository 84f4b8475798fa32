//! Exchange rate repository: the persisted `X -> USD` rate store.
//!
//! Lookups load the candidate rows for the currencies involved and hand
//! them to the pure engine in `coinpurse_core::currency`, so the store
//! query and the in-memory selection rule always agree.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use coinpurse_core::currency::{
    CurrencyError, CurrencyService, DEFAULT_RATES, PIVOT_CURRENCY, RateImportRecord, RateSnapshot,
    RateTable,
};
use coinpurse_shared::types::PageRequest;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use crate::entities::currency_rates;

/// Error types for exchange rate operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeRateError {
    /// Rate resolution or conversion failed.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Exchange rate repository.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    db: DatabaseConnection,
}

impl ExchangeRateRepository {
    /// Creates a new exchange rate repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Upserts imported records by `(currency_from, USD, effective_from)`.
    ///
    /// A matching row gets its `rate` and `effective_to` overwritten; any
    /// other record is inserted. Runs as one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; nothing is kept in that case.
    pub async fn import_rates(&self, records: &[RateImportRecord]) -> Result<usize, ExchangeRateError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();
        let mut updated = 0usize;

        for record in records {
            let existing = currency_rates::Entity::find()
                .filter(currency_rates::Column::CurrencyFrom.eq(&record.currency_from))
                .filter(currency_rates::Column::CurrencyTo.eq(PIVOT_CURRENCY))
                .filter(currency_rates::Column::EffectiveFrom.eq(record.effective_from))
                .one(&txn)
                .await?;

            if let Some(existing) = existing {
                let mut active: currency_rates::ActiveModel = existing.into();
                active.rate = Set(record.rate_to_usd);
                active.effective_to = Set(record.effective_to);
                active.updated_at = Set(now);
                active.update(&txn).await?;
                updated += 1;
            } else {
                currency_rates::ActiveModel {
                    currency_from: Set(record.currency_from.clone()),
                    currency_to: Set(PIVOT_CURRENCY.to_string()),
                    rate: Set(record.rate_to_usd),
                    effective_from: Set(record.effective_from),
                    effective_to: Set(record.effective_to),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;

        info!(
            processed = records.len(),
            updated,
            inserted = records.len() - updated,
            "Imported exchange rates"
        );
        Ok(records.len())
    }

    /// Finds the active row for `currency` at `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_active_rate(
        &self,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<currency_rates::Model>, ExchangeRateError> {
        let row = active_rates_query(at)
            .filter(currency_rates::Column::CurrencyFrom.eq(currency))
            .one(&self.db)
            .await?;
        Ok(row)
    }

    /// Resolves the rate from `from` to `to` at `at`.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateError::Currency` when a side has no active rate.
    pub async fn get_rate(
        &self,
        from: &str,
        to: &str,
        at: DateTime<Utc>,
    ) -> Result<Decimal, ExchangeRateError> {
        let rates = load_rate_table(&self.db, [from, to], at).await?;
        Ok(CurrencyService::get_rate(from, to, at, &rates)?)
    }

    /// Converts `amount` from `from` to `to` at `at`.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateError::Currency` carrying the amount on failure.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
        at: DateTime<Utc>,
    ) -> Result<Decimal, ExchangeRateError> {
        let rates = load_rate_table(&self.db, [from, to], at).await?;
        Ok(CurrencyService::convert(amount, from, to, at, &rates)?)
    }

    /// Every rate active at `at`, plus USD at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn current_rates(&self, at: DateTime<Utc>) -> Result<RateSnapshot, ExchangeRateError> {
        let rows = active_rates_query(at).all(&self.db).await?;
        let table = RateTable::new(rows.into_iter().map(Into::into).collect());
        Ok(table.snapshot(at))
    }

    /// Lists stored rows, newest window first within each currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(
        &self,
        page: &PageRequest,
    ) -> Result<(Vec<currency_rates::Model>, u64), ExchangeRateError> {
        let total = currency_rates::Entity::find().count(&self.db).await?;
        let rows = currency_rates::Entity::find()
            .order_by_asc(currency_rates::Column::CurrencyFrom)
            .order_by_desc(currency_rates::Column::EffectiveFrom)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Seeds the built-in rates when the store is empty. Returns rows inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the count or an insert fails.
    pub async fn seed_default_rates(&self) -> Result<usize, ExchangeRateError> {
        let txn = self.db.begin().await?;
        if currency_rates::Entity::find().count(&txn).await? > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        for (currency, rate) in DEFAULT_RATES {
            currency_rates::ActiveModel {
                currency_from: Set(currency.to_string()),
                currency_to: Set(PIVOT_CURRENCY.to_string()),
                rate: Set(rate),
                effective_from: Set(now),
                effective_to: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(count = DEFAULT_RATES.len(), "Seeded default exchange rates");
        Ok(DEFAULT_RATES.len())
    }
}

fn active_rates_query(at: DateTime<Utc>) -> sea_orm::Select<currency_rates::Entity> {
    currency_rates::Entity::find()
        .filter(currency_rates::Column::CurrencyTo.eq(PIVOT_CURRENCY))
        .filter(currency_rates::Column::EffectiveFrom.lte(at))
        .filter(
            Condition::any()
                .add(currency_rates::Column::EffectiveTo.is_null())
                .add(currency_rates::Column::EffectiveTo.gte(at)),
        )
        .order_by_desc(currency_rates::Column::EffectiveFrom)
}

/// Loads the rows that can be active at `at` for the given currencies.
///
/// USD and duplicates are skipped. Works on a connection or inside a
/// transaction.
pub(crate) async fn load_rate_table<'a, C, I>(
    conn: &C,
    currencies: I,
    at: DateTime<Utc>,
) -> Result<RateTable, DbErr>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = &'a str>,
{
    let wanted: BTreeSet<&str> = currencies
        .into_iter()
        .filter(|currency| *currency != PIVOT_CURRENCY)
        .collect();
    if wanted.is_empty() {
        return Ok(RateTable::default());
    }

    let rows = active_rates_query(at)
        .filter(currency_rates::Column::CurrencyFrom.is_in(wanted))
        .all(conn)
        .await?;
    Ok(RateTable::new(rows.into_iter().map(Into::into).collect()))
}
