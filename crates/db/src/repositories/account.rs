//! Account repository: CRUD plus default-currency enrichment and totals.

use chrono::{DateTime, Utc};
use coinpurse_core::analytics::{AnalyticsService, BalanceEnrichment, Holding, TotalBalance};
use coinpurse_core::ledger::AccountState;
use coinpurse_shared::types::PageRequest;
use coinpurse_shared::types::money::AMOUNT_SCALE;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use tracing::{info, warn};

use super::exchange_rate::load_rate_table;
use crate::entities::{accounts, transactions, transfers};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found.
    #[error("Account {0} not found")]
    NotFound(i32),

    /// Cannot delete an account that still has ledger rows.
    #[error(
        "Cannot delete account {account_id}: it has {transactions} transactions and {transfers} transfers"
    )]
    HasLedgerEntries {
        /// The account.
        account_id: i32,
        /// Transactions referencing it.
        transactions: u64,
        /// Transfers referencing it on either side.
        transfers: u64,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Display name.
    pub name: String,
    /// ISO currency code.
    pub currency: String,
    /// Opening balance (non-negative).
    pub balance: Decimal,
    /// Optional description.
    pub description: Option<String>,
}

/// Input for updating an account. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    /// New name.
    pub name: Option<String>,
    /// New currency code. Existing balances are not converted.
    pub currency: Option<String>,
    /// Administrative balance correction.
    pub balance: Option<Decimal>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
}

/// An account with its default-currency view.
#[derive(Debug, Clone)]
pub struct EnrichedAccount {
    /// The account record.
    pub account: accounts::Model,
    /// Converted balance and rate, when available.
    pub enrichment: BalanceEnrichment,
    /// Share of the USD-converted total across all accounts (0..1).
    pub percentage_of_total: Option<Decimal>,
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(&self, input: CreateAccountInput) -> Result<accounts::Model, AccountError> {
        let now = Utc::now();
        let account = accounts::ActiveModel {
            name: Set(input.name),
            currency: Set(input.currency),
            balance: Set(input.balance.round_dp(AMOUNT_SCALE)),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(
            account_id = account.id,
            currency = %account.currency,
            balance = %account.balance,
            "Account created"
        );
        Ok(account)
    }

    /// Finds an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<accounts::Model>, AccountError> {
        Ok(accounts::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Lists accounts by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, page: &PageRequest) -> Result<(Vec<accounts::Model>, u64), AccountError> {
        let total = accounts::Entity::find().count(&self.db).await?;
        let rows = accounts::Entity::find()
            .order_by_asc(accounts::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Updates an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account does not exist.
    pub async fn update(
        &self,
        id: i32,
        input: UpdateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let existing = accounts::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let mut active: accounts::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency);
        }
        if let Some(balance) = input.balance {
            active.balance = Set(balance.round_dp(AMOUNT_SCALE));
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        info!(account_id = id, "Account updated");
        Ok(updated)
    }

    /// Deletes an account that has no transactions or transfers.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::HasLedgerEntries` while ledger rows reference it.
    pub async fn delete(&self, id: i32) -> Result<accounts::Model, AccountError> {
        let txn = self.db.begin().await?;

        let existing = accounts::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let transaction_count = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(id))
            .count(&txn)
            .await?;
        let transfer_count = transfers::Entity::find()
            .filter(
                Condition::any()
                    .add(transfers::Column::FromAccountId.eq(id))
                    .add(transfers::Column::ToAccountId.eq(id)),
            )
            .count(&txn)
            .await?;
        if transaction_count > 0 || transfer_count > 0 {
            return Err(AccountError::HasLedgerEntries {
                account_id: id,
                transactions: transaction_count,
                transfers: transfer_count,
            });
        }

        existing.clone().delete(&txn).await?;
        txn.commit().await?;

        info!(account_id = id, "Account deleted");
        Ok(existing)
    }

    /// Adds the default-currency view and share of total to each account.
    ///
    /// Missing rates degrade to empty fields and are logged, never raised.
    ///
    /// # Errors
    ///
    /// Returns an error only if a query fails.
    pub async fn enrich(
        &self,
        accounts: Vec<accounts::Model>,
        default_currency: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<EnrichedAccount>, AccountError> {
        let holdings = holdings(&self.db).await?;
        let currencies: Vec<&str> = holdings
            .iter()
            .map(|holding| holding.currency.as_str())
            .chain(accounts.iter().map(|account| account.currency.as_str()))
            .chain(std::iter::once(default_currency))
            .collect();
        let rates = load_rate_table(&self.db, currencies, at).await?;
        let shares = AnalyticsService::percentages_of_total(&holdings, at, &rates);

        Ok(accounts
            .into_iter()
            .map(|account| {
                let holding = holding_of(&account);
                let enrichment = AnalyticsService::enrich(&holding, default_currency, at, &rates)
                    .unwrap_or_else(|e| {
                        warn!(
                            account_id = account.id,
                            currency = %account.currency,
                            default_currency,
                            error = %e,
                            "Balance conversion unavailable"
                        );
                        BalanceEnrichment::unavailable(default_currency)
                    });
                let percentage_of_total = shares.get(&account.id).copied().flatten();
                EnrichedAccount {
                    account,
                    enrichment,
                    percentage_of_total,
                }
            })
            .collect())
    }

    /// Total of all balances in `default_currency`, with a per-currency breakdown.
    ///
    /// # Errors
    ///
    /// Returns an error only if a query fails.
    pub async fn total_balance(
        &self,
        default_currency: &str,
        at: DateTime<Utc>,
    ) -> Result<TotalBalance, AccountError> {
        let holdings = holdings(&self.db).await?;
        let currencies = holdings
            .iter()
            .map(|holding| holding.currency.as_str())
            .chain(std::iter::once(default_currency));
        let rates = load_rate_table(&self.db, currencies, at).await?;

        let report = AnalyticsService::total_balance(&holdings, default_currency, at, &rates);
        if !report.unconverted_account_ids.is_empty() {
            warn!(
                default_currency,
                skipped = ?report.unconverted_account_ids,
                "Accounts left out of total balance: no exchange rate"
            );
        }
        Ok(report)
    }
}

/// Loads an account inside a ledger transaction as the state the core works on.
pub(crate) async fn load_account_state<C>(
    conn: &C,
    id: i32,
) -> Result<Option<(accounts::Model, AccountState)>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(accounts::Entity::find_by_id(id).one(conn).await?.map(|model| {
        let state = AccountState::new(model.id, model.currency.clone(), normalize(model.balance));
        (model, state)
    }))
}

/// Writes a new balance on an account inside a ledger transaction.
pub(crate) async fn write_balance<C>(
    conn: &C,
    account: accounts::Model,
    balance: Decimal,
    at: DateTime<Utc>,
) -> Result<accounts::Model, DbErr>
where
    C: ConnectionTrait,
{
    let mut active: accounts::ActiveModel = account.into();
    active.balance = Set(normalize(balance));
    active.updated_at = Set(at);
    active.update(conn).await
}

/// Rounds stored money to its column scale.
fn normalize(value: Decimal) -> Decimal {
    value.round_dp(AMOUNT_SCALE)
}

fn holding_of(account: &accounts::Model) -> Holding {
    Holding {
        account_id: account.id,
        currency: account.currency.clone(),
        balance: normalize(account.balance),
    }
}

async fn holdings<C>(conn: &C) -> Result<Vec<Holding>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(accounts::Entity::find()
        .order_by_asc(accounts::Column::Id)
        .all(conn)
        .await?
        .iter()
        .map(holding_of)
        .collect())
}
