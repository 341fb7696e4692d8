//! Loose value parsing shared by the record adapters.
//!
//! Source data carries numbers as strings, prices with currency symbols, and
//! dates in several formats. Everything here returns `None` instead of failing
//! so that a bad optional field never rejects a whole record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Date formats accepted for collection dates, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// Naive datetime formats accepted for timestamps, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Returns the trimmed, non-empty text form of a scalar JSON value.
#[must_use]
pub fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads a finite float from a JSON number or numeric string.
#[must_use]
pub fn value_to_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => parse_f64(s),
        _ => None,
    }
}

/// Parses a finite float from text.
#[must_use]
pub fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a price such as `"10"`, `"$1,250.50"`, or `"12.5 USD"`.
#[must_use]
pub fn parse_price(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_end_matches("USD")
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    parse_f64(&cleaned)
}

/// Reads a price from a JSON number or price string.
#[must_use]
pub fn value_to_price(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => parse_price(s),
        other => value_to_f64(other),
    }
}

/// Parses a whole, non-negative count. Fractional or negative values are
/// rejected.
#[must_use]
pub fn parse_count(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return Some(n);
    }
    float_to_count(parse_f64(trimmed)?)
}

/// Reads a whole, non-negative count from a JSON number or string.
#[must_use]
pub fn value_to_count(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| n.as_f64().and_then(float_to_count)),
        serde_json::Value::String(s) => parse_count(s),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_count(v: f64) -> Option<u32> {
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) {
        Some(v as u32)
    } else {
        None
    }
}

/// Parses a calendar date. Full timestamps are accepted and truncated to
/// their date.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_timestamp(trimmed).map(|dt| dt.date_naive()))
}

/// Parses an RFC 3339 timestamp, a naive ISO-like datetime (assumed UTC),
/// or a bare date (midnight UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
    {
        return Some(dt.and_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Reads a timestamp from a string or epoch-milliseconds number.
#[must_use]
pub fn value_to_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => parse_timestamp(s),
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prices_with_symbols() {
        assert_eq!(parse_price("$1,250.50"), Some(1250.5));
        assert_eq!(parse_price("12.5 USD"), Some(12.5));
        assert_eq!(parse_price("free"), None);
    }

    #[test]
    fn parses_counts() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("3.0"), Some(3));
        assert_eq!(parse_count("3.5"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(value_to_count(&serde_json::json!(4)), Some(4));
        assert_eq!(value_to_count(&serde_json::json!(-4)), None);
    }

    #[test]
    fn parses_dates_in_several_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(parse_date("01/15/2024"), Some(expected));
        assert_eq!(parse_date("2024-01-15T14:30:00.000"), Some(expected));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn parses_timestamps() {
        let dt = parse_timestamp("2024-01-15T14:30:00.000").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");

        let dt = parse_timestamp("2024-01-15T14:30:00+02:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 12:30:00 UTC");

        let dt = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 00:00:00 UTC");
    }

    #[test]
    fn blank_strings_are_absent() {
        assert_eq!(value_to_string(&serde_json::json!("   ")), None);
        assert_eq!(value_to_string(&serde_json::json!(null)), None);
        assert_eq!(value_to_string(&serde_json::json!(42)), Some("42".to_string()));
    }
}
