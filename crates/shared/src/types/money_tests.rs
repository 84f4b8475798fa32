use super::*;
use rstest::rstest;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[test]
fn test_currency_code_normalizes_case() {
    let code = CurrencyCode::parse("eur").unwrap();
    assert_eq!(code.as_str(), "EUR");
    assert_eq!(format!("{code}"), "EUR");
    assert!(!code.is_usd());
    assert!(CurrencyCode::parse("Usd").unwrap().is_usd());
}

#[rstest]
#[case("")]
#[case("US")]
#[case("USDX")]
#[case("U$D")]
#[case("12A")]
#[case("ÜSD")]
fn test_currency_code_rejects(#[case] input: &str) {
    assert!(matches!(
        CurrencyCode::parse(input),
        Err(MoneyError::InvalidCurrency(_))
    ));
}

#[test]
fn test_currency_code_serde() {
    let code: CurrencyCode = serde_json::from_str("\"gbp\"").unwrap();
    assert_eq!(code.as_str(), "GBP");
    assert_eq!(serde_json::to_string(&code).unwrap(), "\"GBP\"");
    assert!(serde_json::from_str::<CurrencyCode>("\"pounds\"").is_err());
}

#[rstest]
#[case("150", dec!(150))]
#[case("-150.00", dec!(-150.00))]
#[case("0.5", dec!(0.5))]
#[case("1000.25", dec!(1000.25))]
#[case("0", dec!(0))]
fn test_parse_amount_accepts(#[case] input: &str, #[case] expected: Decimal) {
    assert_eq!(parse_amount(input).unwrap(), expected);
}

#[rstest]
#[case("")]
#[case("-")]
#[case("+5")]
#[case(".5")]
#[case("5.")]
#[case(" 5")]
#[case("5 ")]
#[case("1,000")]
#[case("1e3")]
#[case("abc")]
#[case("--5")]
fn test_parse_amount_rejects_non_canonical(#[case] input: &str) {
    assert!(matches!(
        parse_amount(input),
        Err(MoneyError::InvalidDecimal(_))
    ));
}

#[test]
fn test_parse_amount_rejects_extra_precision() {
    assert_eq!(
        parse_amount("1.234"),
        Err(MoneyError::TooManyDecimals {
            value: "1.234".to_string(),
            max: 2,
        })
    );
}

#[test]
fn test_parse_rate() {
    assert_eq!(parse_rate("1.08").unwrap(), dec!(1.08));
    assert_eq!(parse_rate("0.0067").unwrap(), dec!(0.0067));
    assert_eq!(parse_rate("0.0000000001").unwrap(), dec!(0.0000000001));
    assert_eq!(parse_rate("999999.99").unwrap(), dec!(999999.99));
    assert!(matches!(
        parse_rate("0"),
        Err(MoneyError::NonPositiveRate(_))
    ));
    assert!(matches!(
        parse_rate("-1.08"),
        Err(MoneyError::InvalidDecimal(_))
    ));
    assert!(matches!(
        parse_rate("0.00000000001"),
        Err(MoneyError::TooManyDecimals { max: 10, .. })
    ));
    assert!(matches!(
        parse_rate("1000000"),
        Err(MoneyError::RateOutOfRange(_))
    ));
}

fn json_number(text: &str) -> serde_json::Number {
    serde_json::from_str(text).unwrap()
}

#[rstest]
#[case("1.08", dec!(1.08))]
#[case("0.0000067", dec!(0.0000067))]
#[case("6.7e-6", dec!(0.0000067))]
#[case("0.0000238", dec!(0.0000238))]
#[case("2", dec!(2))]
#[case("1.5E2", dec!(150))]
fn test_parse_rate_number_accepts(#[case] text: &str, #[case] expected: Decimal) {
    assert_eq!(parse_rate_number(&json_number(text)).unwrap(), expected);
}

#[test]
fn test_parse_rate_number_applies_rate_rules() {
    assert!(matches!(
        parse_rate_number(&json_number("1e-11")),
        Err(MoneyError::TooManyDecimals { max: 10, .. })
    ));
    assert!(matches!(
        parse_rate_number(&json_number("1e+20")),
        Err(MoneyError::RateOutOfRange(_))
    ));
    assert!(matches!(
        parse_rate_number(&json_number("0")),
        Err(MoneyError::NonPositiveRate(_))
    ));
    assert!(matches!(
        parse_rate_number(&json_number("-1.08")),
        Err(MoneyError::NonPositiveRate(_))
    ));
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(deserialize_with = "deserialize_amount")]
    amount: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    to_amount: Option<Decimal>,
}

#[test]
fn test_deserialize_amount_from_string_and_number() {
    let payload: Payload = serde_json::from_str(r#"{"amount": "-12.50"}"#).unwrap();
    assert_eq!(payload.amount, dec!(-12.50));
    assert_eq!(payload.to_amount, None);

    let payload: Payload =
        serde_json::from_str(r#"{"amount": 99.99, "to_amount": 108}"#).unwrap();
    assert_eq!(payload.amount, dec!(99.99));
    assert_eq!(payload.to_amount, Some(dec!(108)));

    let payload: Payload =
        serde_json::from_str(r#"{"amount": 1, "to_amount": null}"#).unwrap();
    assert_eq!(payload.to_amount, None);
}

#[test]
fn test_deserialize_amount_rejects_ambiguous_input() {
    assert!(serde_json::from_str::<Payload>(r#"{"amount": "1.005"}"#).is_err());
    assert!(serde_json::from_str::<Payload>(r#"{"amount": "1e2"}"#).is_err());
    assert!(serde_json::from_str::<Payload>(r#"{"amount": true}"#).is_err());
}
