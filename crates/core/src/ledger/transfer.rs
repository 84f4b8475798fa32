//! Transfer planning: destination-amount resolution and balance effects.
//!
//! A transfer debits `from_amount` from the source account and credits
//! `to_amount` to the destination account. When currencies match the two
//! amounts are equal and no rate is stored.

use chrono::{DateTime, Utc};
use coinpurse_shared::types::money::AMOUNT_SCALE;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use super::error::{LedgerError, TransferRule};
use super::service::LedgerService;
use super::types::{AccountState, TransferAmountChanges, TransferAmounts, TransferPlan};
use crate::currency::{CurrencyService, RateLookup};

/// Fractional digits kept on a transfer's exchange rate.
pub const EXCHANGE_RATE_SCALE: u32 = 8;

/// Transfer planning service. Pure; the caller persists the plan atomically.
pub struct TransferService;

impl TransferService {
    /// Checks the request-level rules: distinct accounts, positive amounts.
    pub fn validate_request(
        from_account_id: i32,
        to_account_id: i32,
        from_amount: Decimal,
        to_amount: Option<Decimal>,
    ) -> Result<(), LedgerError> {
        if from_account_id == to_account_id {
            return Err(LedgerError::TransferValidation(TransferRule::SameAccount));
        }
        Self::validate_amounts(from_amount, to_amount)
    }

    /// Computes the destination amount and rate.
    ///
    /// - same currency: `to_amount` must be absent or equal to `from_amount`; no rate
    /// - different currency with `to_amount`: implied rate `to_amount / from_amount`
    /// - different currency without: current rate, `to_amount = from_amount * rate`
    ///
    /// # Errors
    ///
    /// `TransferValidation` for a same-currency mismatch, `CurrencyConversion`
    /// when no rate can be resolved.
    pub fn resolve_destination_amount<R>(
        from_amount: Decimal,
        from_currency: &str,
        to_currency: &str,
        requested_to_amount: Option<Decimal>,
        at: DateTime<Utc>,
        rates: &R,
    ) -> Result<TransferAmounts, LedgerError>
    where
        R: RateLookup + ?Sized,
    {
        Self::validate_amounts(from_amount, requested_to_amount)?;

        if from_currency == to_currency {
            if requested_to_amount.is_some_and(|to_amount| to_amount != from_amount) {
                return Err(LedgerError::TransferValidation(
                    TransferRule::DestinationAmountMismatch,
                ));
            }
            return Ok(TransferAmounts {
                from_amount,
                to_amount: from_amount,
                exchange_rate: None,
            });
        }

        if let Some(to_amount) = requested_to_amount {
            return Ok(TransferAmounts {
                from_amount,
                to_amount,
                exchange_rate: Some(Self::round_rate(to_amount / from_amount)),
            });
        }

        let conversion_error = |source| LedgerError::CurrencyConversion {
            from: from_currency.to_string(),
            to: to_currency.to_string(),
            amount: from_amount,
            source,
        };
        let rate = CurrencyService::get_rate(from_currency, to_currency, at, rates)
            .map_err(conversion_error)?;
        let converted = CurrencyService::convert(from_amount, from_currency, to_currency, at, rates)
            .map_err(conversion_error)?;

        Ok(TransferAmounts {
            from_amount,
            to_amount: converted
                .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero),
            exchange_rate: Some(Self::round_rate(rate)),
        })
    }

    /// Plans a new transfer between two loaded accounts.
    ///
    /// Funds are checked after the destination amount is resolved.
    pub fn plan_transfer<R>(
        from: &AccountState,
        to: &AccountState,
        from_amount: Decimal,
        requested_to_amount: Option<Decimal>,
        at: DateTime<Utc>,
        rates: &R,
    ) -> Result<TransferPlan, LedgerError>
    where
        R: RateLookup + ?Sized,
    {
        Self::validate_request(from.id, to.id, from_amount, requested_to_amount)?;

        let amounts = Self::resolve_destination_amount(
            from_amount,
            &from.currency,
            &to.currency,
            requested_to_amount,
            at,
            rates,
        )?;

        if from.balance < amounts.from_amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: from.id,
                available: from.balance,
                required: amounts.from_amount,
            });
        }

        Ok(TransferPlan {
            amounts,
            from_balance: LedgerService::shift(from, -amounts.from_amount)?,
            to_balance: LedgerService::shift(to, amounts.to_amount)?,
        })
    }

    /// Plans an amount change on an existing transfer.
    ///
    /// The prior effect is reversed on both accounts first, then the new
    /// amounts are resolved and funds re-checked against the reversed source
    /// balance. A changed `from_amount` alone re-derives the destination side;
    /// a changed `to_amount` alone keeps the stored `from_amount`.
    pub fn plan_amendment<R>(
        existing: &TransferAmounts,
        from: &AccountState,
        to: &AccountState,
        changes: TransferAmountChanges,
        at: DateTime<Utc>,
        rates: &R,
    ) -> Result<TransferPlan, LedgerError>
    where
        R: RateLookup + ?Sized,
    {
        let (reversed_from, reversed_to) = Self::reverse_transfer(existing, from, to)?;
        let from_amount = changes.from_amount.unwrap_or(existing.from_amount);

        Self::plan_transfer(
            &AccountState::new(from.id, from.currency.clone(), reversed_from),
            &AccountState::new(to.id, to.currency.clone(), reversed_to),
            from_amount,
            changes.to_amount,
            at,
            rates,
        )
    }

    /// Balances after undoing a transfer: `(from_balance, to_balance)`.
    pub fn reverse_transfer(
        existing: &TransferAmounts,
        from: &AccountState,
        to: &AccountState,
    ) -> Result<(Decimal, Decimal), LedgerError> {
        Ok((
            LedgerService::shift(from, existing.from_amount)?,
            LedgerService::shift(to, -existing.to_amount)?,
        ))
    }

    fn validate_amounts(from_amount: Decimal, to_amount: Option<Decimal>) -> Result<(), LedgerError> {
        if from_amount <= Decimal::ZERO || to_amount.is_some_and(|amount| amount <= Decimal::ZERO) {
            return Err(LedgerError::TransferValidation(
                TransferRule::NonPositiveAmount,
            ));
        }
        Ok(())
    }

    fn round_rate(rate: Decimal) -> Decimal {
        rate.round_dp_with_strategy(EXCHANGE_RATE_SCALE, RoundingStrategy::MidpointNearestEven)
            .normalize()
    }
}
