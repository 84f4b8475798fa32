//! `SeaORM` entity definitions.

pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod currency_rates;
pub mod transactions;
pub mod transfers;
pub mod user_settings;
