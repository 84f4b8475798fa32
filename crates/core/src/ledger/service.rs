//! Balance arithmetic for single-account transactions.
//!
//! A transaction contributes `+amount` to its account: positive is income,
//! negative is expense. Creation applies the delta, an amount update
//! reverses the old delta and applies the new one, and deletion reverses it.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::AccountState;

/// Ledger service for transaction balance effects.
///
/// Pure functions only; persisting the new balance together with the
/// transaction row is the caller's job.
pub struct LedgerService;

impl LedgerService {
    /// Balance after posting a new transaction of `amount`.
    pub fn post_transaction(account: &AccountState, amount: Decimal) -> Result<Decimal, LedgerError> {
        Self::shift(account, amount)
    }

    /// Balance after changing a transaction's amount from `old_amount` to `new_amount`.
    pub fn amend_transaction(
        account: &AccountState,
        old_amount: Decimal,
        new_amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let reversed = Self::shift(account, -old_amount)?;
        reversed
            .checked_add(new_amount)
            .ok_or(LedgerError::BalanceOverflow(account.id))
    }

    /// Balance after deleting a transaction of `amount`.
    pub fn reverse_transaction(
        account: &AccountState,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        Self::shift(account, -amount)
    }

    pub(crate) fn shift(account: &AccountState, delta: Decimal) -> Result<Decimal, LedgerError> {
        account
            .balance
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow(account.id))
    }
}
