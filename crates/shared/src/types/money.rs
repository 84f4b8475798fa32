//! Currency codes and the decimal parsing boundary.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount or rate that enters the system as text goes through
//! [`parse_amount`] or [`parse_rate`], which accept one canonical decimal
//! form and reject everything else.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Maximum fractional digits accepted for a monetary amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Maximum fractional digits accepted for an exchange rate; matches the stored rate column.
pub const RATE_SCALE: u32 = 10;

/// Exclusive upper bound for an exchange rate; the stored rate column keeps six integer digits.
pub const RATE_LIMIT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Errors raised at the money parsing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Currency code is not three ASCII letters.
    #[error("invalid currency code '{0}': expected three letters")]
    InvalidCurrency(String),

    /// Text is not a canonical decimal number.
    #[error("invalid decimal '{0}'")]
    InvalidDecimal(String),

    /// Too many fractional digits.
    #[error("'{value}' has more than {max} decimal places")]
    TooManyDecimals {
        /// The offending input.
        value: String,
        /// Allowed fractional digits.
        max: u32,
    },

    /// Rate is zero or negative.
    #[error("rate must be greater than zero, got '{0}'")]
    NonPositiveRate(String),

    /// Rate does not fit the stored rate column.
    #[error("rate '{0}' must be less than 1000000")]
    RateOutOfRange(String),
}

/// An ISO-4217-shaped currency code, always uppercase.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// The pivot currency every stored rate is quoted against.
    pub const USD: Self = Self(*b"USD");

    /// Parses and normalizes a currency code.
    pub fn parse(code: &str) -> Result<Self, MoneyError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(MoneyError::InvalidCurrency(code.to_string()));
        }
        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns true for the pivot currency.
    #[must_use]
    pub fn is_usd(&self) -> bool {
        *self == Self::USD
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Parses a signed monetary amount with at most two fractional digits.
///
/// Accepted: `150`, `-150.5`, `0.25`. Rejected: `1e3`, ` 5`, `1,000`, `+5`, `.5`, `1.234`.
pub fn parse_amount(input: &str) -> Result<Decimal, MoneyError> {
    let unsigned = input.strip_prefix('-').unwrap_or(input);
    parse_canonical(input, unsigned, AMOUNT_SCALE)
}

/// Parses an exchange rate: unsigned, strictly positive, below [`RATE_LIMIT`],
/// at most [`RATE_SCALE`] fractional digits.
pub fn parse_rate(input: &str) -> Result<Decimal, MoneyError> {
    let rate = parse_canonical(input, input, RATE_SCALE)?;
    check_rate(rate, input)
}

/// Reads an exchange rate from a JSON number, which may be written in exponent form.
///
/// The number's shortest textual form is parsed exactly, so `6.7e-6` yields `0.0000067`;
/// the same scale and range rules as [`parse_rate`] apply.
pub fn parse_rate_number(number: &serde_json::Number) -> Result<Decimal, MoneyError> {
    let text = number.to_string();
    let rate = Decimal::from_str_exact(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| MoneyError::InvalidDecimal(text.clone()))?
        .normalize();
    if rate.scale() > RATE_SCALE {
        return Err(MoneyError::TooManyDecimals {
            value: text,
            max: RATE_SCALE,
        });
    }
    check_rate(rate, &text)
}

fn check_rate(rate: Decimal, input: &str) -> Result<Decimal, MoneyError> {
    if rate <= Decimal::ZERO {
        return Err(MoneyError::NonPositiveRate(input.to_string()));
    }
    if rate >= RATE_LIMIT {
        return Err(MoneyError::RateOutOfRange(input.to_string()));
    }
    Ok(rate)
}

fn parse_canonical(input: &str, unsigned: &str, max_scale: u32) -> Result<Decimal, MoneyError> {
    let invalid = || MoneyError::InvalidDecimal(input.to_string());

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > max_scale as usize {
            return Err(MoneyError::TooManyDecimals {
                value: input.to_string(),
                max: max_scale,
            });
        }
    }

    Decimal::from_str(input).map_err(|_| invalid())
}

/// Accepts a JSON string or number; numbers are read through their textual form.
#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalText {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalText {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Serde helper routing an amount field through [`parse_amount`].
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let text = DecimalText::deserialize(deserializer)?.into_text();
    parse_amount(&text).map_err(serde::de::Error::custom)
}

/// Serde helper for an optional amount field; `null` and absence both map to `None`.
pub fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<DecimalText>::deserialize(deserializer)?
        .map(|value| parse_amount(&value.into_text()).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
