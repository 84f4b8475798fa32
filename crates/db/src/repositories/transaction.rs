//! Transaction repository: single-account ledger rows.
//!
//! Every mutation loads the owning account inside one database
//! transaction, computes the new balance with `LedgerService`, and writes
//! the row and the balance before committing. Any early return drops the
//! transaction, which rolls both writes back.

use chrono::{NaiveDate, Utc};
use coinpurse_core::ledger::{LedgerError, LedgerService};
use coinpurse_shared::types::PageRequest;
use coinpurse_shared::types::money::AMOUNT_SCALE;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};
use tracing::info;

use super::account::{load_account_state, write_balance};
use super::category::descendant_ids;
use crate::entities::{categories, transactions};

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Ledger rule failure (missing account, category or transaction).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// Owning account.
    pub account_id: i32,
    /// Signed amount: positive income, negative expense.
    pub amount: Decimal,
    /// Optional category.
    pub category_id: Option<i32>,
    /// Optional description.
    pub description: Option<String>,
    /// Booking date.
    pub transaction_date: NaiveDate,
}

/// Input for updating a transaction. Only `amount` touches the balance.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    /// New signed amount.
    pub amount: Option<Decimal>,
    /// New category; `Some(None)` uncategorizes.
    pub category_id: Option<Option<i32>>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New booking date.
    pub transaction_date: Option<NaiveDate>,
}

/// Filter for listing transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFilter {
    /// Only this account.
    pub account_id: Option<i32>,
    /// This category and its subcategories.
    pub category_id: Option<i32>,
}

/// Transaction repository.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a transaction and applies `+amount` to its account.
    ///
    /// The row's currency is copied from the account.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` / `CategoryNotFound` for unresolved references.
    pub async fn create(
        &self,
        input: CreateTransactionInput,
    ) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;

        let (account, state) = load_account_state(&txn, input.account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(input.account_id))?;
        if let Some(category_id) = input.category_id {
            ensure_category(&txn, category_id).await?;
        }

        let amount = input.amount.round_dp(AMOUNT_SCALE);
        let new_balance = LedgerService::post_transaction(&state, amount)?;

        let now = Utc::now();
        let transaction = transactions::ActiveModel {
            account_id: Set(account.id),
            amount: Set(amount),
            currency: Set(account.currency.clone()),
            category_id: Set(input.category_id),
            description: Set(input.description),
            transaction_date: Set(input.transaction_date),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        write_balance(&txn, account, new_balance, now).await?;

        txn.commit().await?;

        info!(
            transaction_id = transaction.id,
            account_id = transaction.account_id,
            amount = %transaction.amount,
            balance = %new_balance,
            "Transaction created"
        );
        Ok(transaction)
    }

    /// Finds a transaction by id.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<transactions::Model>, TransactionError> {
        Ok(transactions::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Lists transactions, newest booking date first.
    pub async fn list(
        &self,
        filter: TransactionFilter,
        page: &PageRequest,
    ) -> Result<(Vec<transactions::Model>, u64), TransactionError> {
        let mut query = transactions::Entity::find();
        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id));
        }
        if let Some(category_id) = filter.category_id {
            let ids = descendant_ids(&self.db, category_id).await?;
            query = query.filter(transactions::Column::CategoryId.is_in(ids));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = newest_first(query)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Updates a transaction. A changed amount reverses the old delta and
    /// applies the new one in the same unit as the row update.
    pub async fn update(
        &self,
        id: i32,
        input: UpdateTransactionInput,
    ) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;

        let existing = transactions::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))?;
        if let Some(Some(category_id)) = input.category_id {
            ensure_category(&txn, category_id).await?;
        }

        let now = Utc::now();
        let old_amount = existing.amount.round_dp(AMOUNT_SCALE);
        let new_amount = input
            .amount
            .map(|amount| amount.round_dp(AMOUNT_SCALE))
            .filter(|amount| *amount != old_amount);

        let mut amended = None;
        if let Some(new_amount) = new_amount {
            let (account, state) = load_account_state(&txn, existing.account_id)
                .await?
                .ok_or(LedgerError::AccountNotFound(existing.account_id))?;
            let balance = LedgerService::amend_transaction(&state, old_amount, new_amount)?;
            amended = Some((account, balance));
        }

        let mut active: transactions::ActiveModel = existing.into();
        if let Some(amount) = new_amount {
            active.amount = Set(amount);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(date) = input.transaction_date {
            active.transaction_date = Set(date);
        }
        active.updated_at = Set(now);

        let updated = active.update(&txn).await?;
        let new_balance = match amended {
            Some((account, balance)) => {
                write_balance(&txn, account, balance, now).await?;
                Some(balance)
            }
            None => None,
        };
        txn.commit().await?;

        info!(
            transaction_id = id,
            account_id = updated.account_id,
            amount = %updated.amount,
            balance = ?new_balance,
            "Transaction updated"
        );
        Ok(updated)
    }

    /// Deletes a transaction and reverses its amount on the account.
    pub async fn delete(&self, id: i32) -> Result<(), TransactionError> {
        let txn = self.db.begin().await?;

        let existing = transactions::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))?;
        let (account, state) = load_account_state(&txn, existing.account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(existing.account_id))?;

        let new_balance =
            LedgerService::reverse_transaction(&state, existing.amount.round_dp(AMOUNT_SCALE))?;
        let account_id = account.id;
        existing.delete(&txn).await?;
        write_balance(&txn, account, new_balance, Utc::now()).await?;

        txn.commit().await?;

        info!(
            transaction_id = id,
            account_id,
            balance = %new_balance,
            "Transaction deleted"
        );
        Ok(())
    }
}

fn newest_first(query: Select<transactions::Entity>) -> Select<transactions::Entity> {
    query
        .order_by_desc(transactions::Column::TransactionDate)
        .order_by_desc(transactions::Column::Id)
}

async fn ensure_category<C>(conn: &C, id: i32) -> Result<(), TransactionError>
where
    C: ConnectionTrait,
{
    if categories::Entity::find_by_id(id).one(conn).await?.is_none() {
        return Err(LedgerError::CategoryNotFound(id).into());
    }
    Ok(())
}
