//! Property-based tests for the ledger services.
//!
//! - Balance integrity: after any sequence of mutations, every balance equals
//!   opening + transaction amounts + transfers in - transfers out
//! - Exact reversal: create followed by delete restores balances exactly

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::service::LedgerService;
use super::transfer::TransferService;
use super::types::{AccountState, TransferAmountChanges, TransferAmounts};
use crate::currency::{RateRecord, RateTable};

/// Strategy to generate signed transaction amounts (-5,000.00 to 5,000.00).
fn signed_amount() -> impl Strategy<Value = Decimal> {
    (-500_000i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive transfer amounts (0.01 to 2,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..200_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive rates to USD (0.0001 to 10.0000).
fn rate_to_usd() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|v| Decimal::new(v, 4))
}

#[derive(Debug, Clone)]
enum Op {
    PostTransaction { account: usize, amount: Decimal },
    AmendTransaction { index: usize, amount: Decimal },
    DeleteTransaction { index: usize },
    CreateTransfer { from: usize, to: usize, amount: Decimal },
    AmendTransfer { index: usize, amount: Decimal },
    DeleteTransfer { index: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3, signed_amount()).prop_map(|(account, amount)| Op::PostTransaction { account, amount }),
        (0usize..8, signed_amount()).prop_map(|(index, amount)| Op::AmendTransaction { index, amount }),
        (0usize..8).prop_map(|index| Op::DeleteTransaction { index }),
        (0usize..3, 0usize..3, positive_amount())
            .prop_map(|(from, to, amount)| Op::CreateTransfer { from, to, amount }),
        (0usize..8, positive_amount()).prop_map(|(index, amount)| Op::AmendTransfer { index, amount }),
        (0usize..8).prop_map(|index| Op::DeleteTransfer { index }),
    ]
}

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn rates(eur: Decimal, gbp: Decimal) -> RateTable {
    let effective_from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    RateTable::new(vec![
        RateRecord {
            currency_from: "EUR".to_string(),
            rate: eur,
            effective_from,
            effective_to: None,
        },
        RateRecord {
            currency_from: "GBP".to_string(),
            rate: gbp,
            effective_from,
            effective_to: None,
        },
    ])
}

struct Book {
    accounts: Vec<AccountState>,
    opening: Vec<Decimal>,
    transactions: Vec<(usize, Decimal)>,
    transfers: Vec<(usize, usize, TransferAmounts)>,
}

impl Book {
    fn new(openings: [Decimal; 3]) -> Self {
        let accounts = ["USD", "EUR", "GBP"]
            .iter()
            .zip(openings)
            .enumerate()
            .map(|(i, (currency, balance))| {
                AccountState::new(i32::try_from(i).unwrap() + 1, *currency, balance)
            })
            .collect();
        Self {
            accounts,
            opening: openings.to_vec(),
            transactions: Vec::new(),
            transfers: Vec::new(),
        }
    }

    /// Applies one operation; rejected operations must leave the book untouched.
    fn apply(&mut self, op: &Op, rates: &RateTable) {
        match *op {
            Op::PostTransaction { account, amount } => {
                let balance = LedgerService::post_transaction(&self.accounts[account], amount).unwrap();
                self.accounts[account].balance = balance;
                self.transactions.push((account, amount));
            }
            Op::AmendTransaction { index, amount } => {
                if let Some(&(account, old)) = self.transactions.get(index) {
                    let balance =
                        LedgerService::amend_transaction(&self.accounts[account], old, amount).unwrap();
                    self.accounts[account].balance = balance;
                    self.transactions[index].1 = amount;
                }
            }
            Op::DeleteTransaction { index } => {
                if index < self.transactions.len() {
                    let (account, amount) = self.transactions.remove(index);
                    let balance =
                        LedgerService::reverse_transaction(&self.accounts[account], amount).unwrap();
                    self.accounts[account].balance = balance;
                }
            }
            Op::CreateTransfer { from, to, amount } => {
                if let Ok(plan) = TransferService::plan_transfer(
                    &self.accounts[from],
                    &self.accounts[to],
                    amount,
                    None,
                    at(),
                    rates,
                ) {
                    self.accounts[from].balance = plan.from_balance;
                    self.accounts[to].balance = plan.to_balance;
                    self.transfers.push((from, to, plan.amounts));
                }
            }
            Op::AmendTransfer { index, amount } => {
                if let Some(&(from, to, existing)) = self.transfers.get(index) {
                    let changes = TransferAmountChanges {
                        from_amount: Some(amount),
                        to_amount: None,
                    };
                    if let Ok(plan) = TransferService::plan_amendment(
                        &existing,
                        &self.accounts[from],
                        &self.accounts[to],
                        changes,
                        at(),
                        rates,
                    ) {
                        self.accounts[from].balance = plan.from_balance;
                        self.accounts[to].balance = plan.to_balance;
                        self.transfers[index].2 = plan.amounts;
                    }
                }
            }
            Op::DeleteTransfer { index } => {
                if index < self.transfers.len() {
                    let (from, to, amounts) = self.transfers.remove(index);
                    let (from_balance, to_balance) = TransferService::reverse_transfer(
                        &amounts,
                        &self.accounts[from],
                        &self.accounts[to],
                    )
                    .unwrap();
                    self.accounts[from].balance = from_balance;
                    self.accounts[to].balance = to_balance;
                }
            }
        }
    }

    fn expected_balance(&self, account: usize) -> Decimal {
        let transactions: Decimal = self
            .transactions
            .iter()
            .filter(|(a, _)| *a == account)
            .map(|(_, amount)| *amount)
            .sum();
        let incoming: Decimal = self
            .transfers
            .iter()
            .filter(|(_, to, _)| *to == account)
            .map(|(_, _, amounts)| amounts.to_amount)
            .sum();
        let outgoing: Decimal = self
            .transfers
            .iter()
            .filter(|(from, _, _)| *from == account)
            .map(|(_, _, amounts)| amounts.from_amount)
            .sum();
        self.opening[account] + transactions + incoming - outgoing
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balances always equal the net effect of the live ledger rows.
    #[test]
    fn prop_balance_matches_ledger_after_any_sequence(
        openings in (positive_amount(), positive_amount(), positive_amount()),
        eur in rate_to_usd(),
        gbp in rate_to_usd(),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let rates = rates(eur, gbp);
        let mut book = Book::new([openings.0, openings.1, openings.2]);
        for op in &ops {
            book.apply(op, &rates);
        }
        for account in 0..3 {
            prop_assert_eq!(book.accounts[account].balance, book.expected_balance(account));
        }
    }

    /// Creating then deleting a transfer restores both balances exactly.
    #[test]
    fn prop_transfer_reversal_is_exact(
        from_balance in positive_amount(),
        to_balance in signed_amount(),
        amount in positive_amount(),
        eur in rate_to_usd(),
        gbp in rate_to_usd(),
        to_currency in prop_oneof![Just("USD"), Just("EUR"), Just("GBP")],
    ) {
        let rates = rates(eur, gbp);
        let from = AccountState::new(1, "EUR", from_balance);
        let to = AccountState::new(2, to_currency, to_balance);

        match TransferService::plan_transfer(&from, &to, amount, None, at(), &rates) {
            Ok(plan) => {
                let (from_after, to_after) = TransferService::reverse_transfer(
                    &plan.amounts,
                    &AccountState::new(1, "EUR", plan.from_balance),
                    &AccountState::new(2, to_currency, plan.to_balance),
                )
                .unwrap();
                prop_assert_eq!(from_after, from_balance);
                prop_assert_eq!(to_after, to_balance);
            }
            Err(err) => {
                prop_assert!(from_balance < amount, "unexpected rejection: {}", err);
            }
        }
    }

    /// Creating then deleting a transaction restores the balance exactly.
    #[test]
    fn prop_transaction_reversal_is_exact(
        balance in signed_amount(),
        amount in signed_amount(),
    ) {
        let account = AccountState::new(1, "USD", balance);
        let posted = LedgerService::post_transaction(&account, amount).unwrap();
        let restored =
            LedgerService::reverse_transaction(&AccountState::new(1, "USD", posted), amount).unwrap();
        prop_assert_eq!(restored, balance);
    }

    /// Same-currency transfers never carry a rate and move equal amounts.
    #[test]
    fn prop_same_currency_transfer_is_symmetric(
        amount in positive_amount(),
    ) {
        let amounts = TransferService::resolve_destination_amount(
            amount, "GBP", "GBP", None, at(), &RateTable::default(),
        )
        .unwrap();
        prop_assert_eq!(amounts.to_amount, amount);
        prop_assert!(amounts.exchange_rate.is_none());
    }
}
