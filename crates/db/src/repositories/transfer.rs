//! Transfer repository: dual-account ledger rows.
//!
//! Destination amounts, rates and balances come from `TransferService`;
//! this module loads the accounts and rates inside one database
//! transaction and persists the resulting plan.

use chrono::{DateTime, Utc};
use coinpurse_core::currency::RateTable;
use coinpurse_core::ledger::{
    AccountState, LedgerError, TransferAmountChanges, TransferAmounts, TransferService,
};
use coinpurse_shared::types::PageRequest;
use coinpurse_shared::types::money::AMOUNT_SCALE;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use tracing::info;

use super::account::{load_account_state, write_balance};
use super::exchange_rate::load_rate_table;
use crate::entities::{accounts, transfers};

/// Error types for transfer operations.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Ledger rule failure: missing account, validation, funds or rate.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a transfer.
#[derive(Debug, Clone)]
pub struct CreateTransferInput {
    /// Debited account.
    pub from_account_id: i32,
    /// Credited account.
    pub to_account_id: i32,
    /// Amount debited, in the source currency.
    pub from_amount: Decimal,
    /// Amount credited; derived from stored rates when absent.
    pub to_amount: Option<Decimal>,
    /// Optional description.
    pub description: Option<String>,
}

/// Input for updating a transfer.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransferInput {
    /// New source amount.
    pub from_amount: Option<Decimal>,
    /// New destination amount.
    pub to_amount: Option<Decimal>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
}

/// Transfer repository.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    db: DatabaseConnection,
}

impl TransferRepository {
    /// Creates a new transfer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a transfer: debits the source, credits the destination.
    ///
    /// # Errors
    ///
    /// - `TransferValidation` for same-account or non-positive requests
    /// - `AccountNotFound` when either account is missing
    /// - `CurrencyConversion` when no rate resolves the destination amount
    /// - `InsufficientFunds` when the source balance is below `from_amount`
    pub async fn create(&self, input: CreateTransferInput) -> Result<transfers::Model, TransferError> {
        let from_amount = input.from_amount.round_dp(AMOUNT_SCALE);
        let to_amount = input.to_amount.map(|amount| amount.round_dp(AMOUNT_SCALE));
        TransferService::validate_request(
            input.from_account_id,
            input.to_account_id,
            from_amount,
            to_amount,
        )?;

        let txn = self.db.begin().await?;

        let (from, from_state) = load_account(&txn, input.from_account_id).await?;
        let (to, to_state) = load_account(&txn, input.to_account_id).await?;

        let now = Utc::now();
        let rates = if from.currency != to.currency && to_amount.is_none() {
            load_rate_table(&txn, [from.currency.as_str(), to.currency.as_str()], now).await?
        } else {
            RateTable::default()
        };
        let plan = TransferService::plan_transfer(
            &from_state,
            &to_state,
            from_amount,
            to_amount,
            now,
            &rates,
        )?;

        let transfer = transfers::ActiveModel {
            from_account_id: Set(from.id),
            from_amount: Set(plan.amounts.from_amount),
            from_currency: Set(from.currency.clone()),
            to_account_id: Set(to.id),
            to_amount: Set(plan.amounts.to_amount),
            to_currency: Set(to.currency.clone()),
            exchange_rate: Set(plan.amounts.exchange_rate),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        write_balance(&txn, from, plan.from_balance, now).await?;
        write_balance(&txn, to, plan.to_balance, now).await?;

        txn.commit().await?;

        info!(
            transfer_id = transfer.id,
            from_account_id = transfer.from_account_id,
            to_account_id = transfer.to_account_id,
            from_amount = %transfer.from_amount,
            to_amount = %transfer.to_amount,
            exchange_rate = ?transfer.exchange_rate,
            "Transfer created"
        );
        Ok(transfer)
    }

    /// Finds a transfer by id.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<transfers::Model>, TransferError> {
        Ok(transfers::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Lists transfers, newest first, optionally touching one account on either side.
    pub async fn list(
        &self,
        account_id: Option<i32>,
        page: &PageRequest,
    ) -> Result<(Vec<transfers::Model>, u64), TransferError> {
        let mut query = transfers::Entity::find();
        if let Some(account_id) = account_id {
            query = query.filter(
                Condition::any()
                    .add(transfers::Column::FromAccountId.eq(account_id))
                    .add(transfers::Column::ToAccountId.eq(account_id)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(transfers::Column::CreatedAt)
            .order_by_desc(transfers::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Updates a transfer.
    ///
    /// Amount changes reverse the prior effect on both accounts, re-resolve
    /// the destination side and re-check funds before applying the new
    /// effect. A description-only change leaves balances alone.
    pub async fn update(
        &self,
        id: i32,
        input: UpdateTransferInput,
    ) -> Result<transfers::Model, TransferError> {
        let changes = TransferAmountChanges {
            from_amount: input.from_amount.map(|amount| amount.round_dp(AMOUNT_SCALE)),
            to_amount: input.to_amount.map(|amount| amount.round_dp(AMOUNT_SCALE)),
        };

        let txn = self.db.begin().await?;

        let existing = transfers::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(LedgerError::TransferNotFound(id))?;
        let now = Utc::now();
        let mut active: transfers::ActiveModel = existing.clone().into();

        if !changes.is_empty() {
            let (from, from_state) = load_account(&txn, existing.from_account_id).await?;
            let (to, to_state) = load_account(&txn, existing.to_account_id).await?;

            let rates = amendment_rates(&txn, &from, &to, changes, now).await?;
            let plan = TransferService::plan_amendment(
                &stored_amounts(&existing),
                &from_state,
                &to_state,
                changes,
                now,
                &rates,
            )?;

            active.from_amount = Set(plan.amounts.from_amount);
            active.from_currency = Set(from.currency.clone());
            active.to_amount = Set(plan.amounts.to_amount);
            active.to_currency = Set(to.currency.clone());
            active.exchange_rate = Set(plan.amounts.exchange_rate);
            write_balance(&txn, from, plan.from_balance, now).await?;
            write_balance(&txn, to, plan.to_balance, now).await?;
        }

        if let Some(description) = input.description {
            active.description = Set(description);
        }
        active.updated_at = Set(now);

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            transfer_id = id,
            from_amount = %updated.from_amount,
            to_amount = %updated.to_amount,
            exchange_rate = ?updated.exchange_rate,
            rebalanced = !changes.is_empty(),
            "Transfer updated"
        );
        Ok(updated)
    }

    /// Deletes a transfer, crediting back the source and debiting the destination.
    pub async fn delete(&self, id: i32) -> Result<(), TransferError> {
        let txn = self.db.begin().await?;

        let existing = transfers::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(LedgerError::TransferNotFound(id))?;
        let (from, from_state) = load_account(&txn, existing.from_account_id).await?;
        let (to, to_state) = load_account(&txn, existing.to_account_id).await?;

        let (from_balance, to_balance) =
            TransferService::reverse_transfer(&stored_amounts(&existing), &from_state, &to_state)?;

        let now = Utc::now();
        write_balance(&txn, from, from_balance, now).await?;
        write_balance(&txn, to, to_balance, now).await?;
        existing.delete(&txn).await?;

        txn.commit().await?;

        info!(
            transfer_id = id,
            from_balance = %from_balance,
            to_balance = %to_balance,
            "Transfer deleted"
        );
        Ok(())
    }
}

fn stored_amounts(transfer: &transfers::Model) -> TransferAmounts {
    TransferAmounts {
        from_amount: transfer.from_amount.round_dp(AMOUNT_SCALE),
        to_amount: transfer.to_amount.round_dp(AMOUNT_SCALE),
        exchange_rate: transfer.exchange_rate,
    }
}

async fn load_account<C>(conn: &C, id: i32) -> Result<(accounts::Model, AccountState), TransferError>
where
    C: ConnectionTrait,
{
    load_account_state(conn, id)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(id).into())
}

/// Rates are only consulted when the destination amount must be derived.
async fn amendment_rates<C>(
    conn: &C,
    from: &accounts::Model,
    to: &accounts::Model,
    changes: TransferAmountChanges,
    at: DateTime<Utc>,
) -> Result<RateTable, DbErr>
where
    C: ConnectionTrait,
{
    if from.currency == to.currency || changes.to_amount.is_some() {
        return Ok(RateTable::default());
    }
    load_rate_table(conn, [from.currency.as_str(), to.currency.as_str()], at).await
}
