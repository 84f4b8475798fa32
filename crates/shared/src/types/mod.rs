//! Common types shared across crates.

pub mod money;
pub mod pagination;

pub use money::{CurrencyCode, MoneyError, RATE_SCALE, parse_amount, parse_rate, parse_rate_number};
pub use pagination::{PageRequest, PageResponse};
