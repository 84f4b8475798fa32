//! Currency engine error types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while resolving rates or converting amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    /// No active `currency -> USD` rate at the requested instant.
    #[error("Exchange rate not found for {currency} to USD at {at}")]
    ExchangeRateNotFound {
        /// The currency without an active rate.
        currency: String,
        /// The instant the lookup was made for.
        at: DateTime<Utc>,
    },

    /// A stored rate is zero and cannot be used as a divisor.
    #[error("Exchange rate for {currency} to USD is zero")]
    ZeroRate {
        /// The currency whose rate is zero.
        currency: String,
    },

    /// Decimal arithmetic overflowed.
    #[error("Arithmetic overflow converting between {from} and {to}")]
    Overflow {
        /// Source currency.
        from: String,
        /// Target currency.
        to: String,
    },

    /// Conversion of a specific amount failed.
    #[error("Cannot convert {amount} {from} to {to}: {source}")]
    Conversion {
        /// The amount that was being converted.
        amount: Decimal,
        /// Source currency.
        from: String,
        /// Target currency.
        to: String,
        /// Underlying rate failure.
        #[source]
        source: Box<CurrencyError>,
    },
}

impl CurrencyError {
    /// Returns true when the failure is a missing rate, at any wrapping depth.
    #[must_use]
    pub fn is_rate_not_found(&self) -> bool {
        match self {
            Self::ExchangeRateNotFound { .. } => true,
            Self::Conversion { source, .. } => source.is_rate_not_found(),
            Self::ZeroRate { .. } | Self::Overflow { .. } => false,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ExchangeRateNotFound { .. } => "EXCHANGE_RATE_NOT_FOUND",
            Self::ZeroRate { .. } => "INVALID_EXCHANGE_RATE",
            Self::Overflow { .. } => "CONVERSION_OVERFLOW",
            Self::Conversion { source, .. } => source.error_code(),
        }
    }
}

/// Errors raised while parsing a rate import file.
///
/// Any error aborts the whole import.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// The file is not readable as CSV.
    #[error("Invalid CSV in record {record}: {message}")]
    Csv {
        /// 1-based data record number (header excluded).
        record: u64,
        /// Parser message.
        message: String,
    },

    /// The file is not valid JSON or has the wrong top-level shape.
    #[error("Invalid JSON: {0}")]
    Json(String),

    /// A record parsed but carries an invalid value.
    #[error("Invalid rate record {record}: {message}")]
    InvalidRecord {
        /// 1-based record number.
        record: u64,
        /// What was wrong with it.
        message: String,
    },
}
