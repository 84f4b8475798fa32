//! Multi-currency handling and exchange rates.
//!
//! - `rates` - time-bounded rate records and the active-rate rule
//! - `service` - rate resolution through the USD pivot and conversion
//! - `import` - CSV/JSON rate file parsing

pub mod error;
pub mod import;
pub mod rates;
pub mod service;

#[cfg(test)]
mod props;

pub use error::{CurrencyError, ImportError};
pub use import::{RateImportRecord, parse_csv, parse_json, parse_timestamp};
pub use rates::{
    DEFAULT_RATES, PIVOT_CURRENCY, RateLookup, RateRecord, RateSnapshot, RateTable,
    select_active_rate,
};
pub use service::CurrencyService;
