//! API route definitions.

use axum::Router;
use rust_decimal::Decimal;

use crate::AppState;

pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod currency_rates;
pub mod health;
pub mod settings;
pub mod transactions;
pub mod transfers;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(accounts::routes())
        .merge(categories::routes())
        .merge(transactions::routes())
        .merge(transfers::routes())
        .merge(budgets::routes())
        .merge(currency_rates::routes())
        .merge(settings::routes())
}

/// Money as rendered in responses: always two fractional digits.
pub(crate) fn money(value: Decimal) -> Decimal {
    let mut value = value.round_dp(2);
    value.rescale(2);
    value
}

/// Rates as rendered in responses: at most `scale` digits, trailing zeros dropped.
pub(crate) fn rate(value: Decimal, scale: u32) -> Decimal {
    value.round_dp(scale).normalize()
}
