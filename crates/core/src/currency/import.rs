//! Rate import parsing for CSV and JSON files.
//!
//! CSV header: `currency_from,rate_to_usd,effective_from[,effective_to]`.
//! JSON: a bare array of the same record shape, or `{"rates": [...]}`.
//! Any bad record fails the whole file.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use coinpurse_shared::types::{CurrencyCode, MoneyError, parse_rate, parse_rate_number};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::error::ImportError;
use super::rates::PIVOT_CURRENCY;

/// One validated `currency -> USD` rate ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateImportRecord {
    /// Quoted currency, uppercase.
    pub currency_from: String,
    /// Units of USD per unit of `currency_from`.
    pub rate_to_usd: Decimal,
    /// Start of validity.
    pub effective_from: DateTime<Utc>,
    /// End of validity, if bounded.
    pub effective_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    currency_from: String,
    rate_to_usd: String,
    effective_from: String,
    #[serde(default)]
    effective_to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonRow {
    currency_from: String,
    rate_to_usd: Value,
    effective_from: String,
    #[serde(default)]
    effective_to: Option<String>,
}

/// Parses a CSV rate file.
///
/// # Errors
///
/// Returns `ImportError` on the first malformed record.
pub fn parse_csv(data: &[u8]) -> Result<Vec<RateImportRecord>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        let record = index as u64 + 1;
        let row = row.map_err(|e| ImportError::Csv {
            record,
            message: e.to_string(),
        })?;
        records.push(build_record(
            record,
            &row.currency_from,
            parse_rate(&row.rate_to_usd),
            &row.effective_from,
            row.effective_to.as_deref(),
        )?);
    }
    Ok(records)
}

/// Parses a JSON rate file.
///
/// # Errors
///
/// Returns `ImportError` when the document shape is wrong or a record is malformed.
pub fn parse_json(data: &[u8]) -> Result<Vec<RateImportRecord>, ImportError> {
    let document: Value =
        serde_json::from_slice(data).map_err(|e| ImportError::Json(e.to_string()))?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("rates") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ImportError::Json(
                    "expected an array or an object with a \"rates\" array".to_string(),
                ));
            }
        },
        _ => {
            return Err(ImportError::Json(
                "expected an array or an object with a \"rates\" array".to_string(),
            ));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let record = index as u64 + 1;
            let row: JsonRow =
                serde_json::from_value(item).map_err(|e| ImportError::InvalidRecord {
                    record,
                    message: e.to_string(),
                })?;
            let rate_to_usd = match &row.rate_to_usd {
                Value::String(text) => parse_rate(text),
                Value::Number(number) => parse_rate_number(number),
                other => {
                    return Err(ImportError::InvalidRecord {
                        record,
                        message: format!("rate_to_usd must be a number or string, got {other}"),
                    });
                }
            };
            build_record(
                record,
                &row.currency_from,
                rate_to_usd,
                &row.effective_from,
                row.effective_to.as_deref(),
            )
        })
        .collect()
}

fn build_record(
    record: u64,
    currency_from: &str,
    rate_to_usd: Result<Decimal, MoneyError>,
    effective_from: &str,
    effective_to: Option<&str>,
) -> Result<RateImportRecord, ImportError> {
    let invalid = |message: String| ImportError::InvalidRecord { record, message };

    let currency = CurrencyCode::parse(currency_from).map_err(|e| invalid(e.to_string()))?;
    if currency.as_str() == PIVOT_CURRENCY {
        return Err(invalid("USD is the pivot currency and has no rate".to_string()));
    }

    let rate_to_usd = rate_to_usd.map_err(|e| invalid(e.to_string()))?;

    let effective_from = parse_timestamp(effective_from)
        .ok_or_else(|| invalid(format!("invalid effective_from '{effective_from}'")))?;

    let effective_to = match effective_to.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => {
            let end = parse_timestamp(text)
                .ok_or_else(|| invalid(format!("invalid effective_to '{text}'")))?;
            if end < effective_from {
                return Err(invalid(
                    "effective_to must not be earlier than effective_from".to_string(),
                ));
            }
            Some(end)
        }
        None => None,
    };

    Ok(RateImportRecord {
        currency_from: currency.to_string(),
        rate_to_usd,
        effective_from,
        effective_to,
    })
}

/// Parses an ISO-8601 timestamp. Values without an offset are taken as UTC;
/// a bare date means midnight.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
