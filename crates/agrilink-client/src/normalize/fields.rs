//! Alias-aware accessors over a raw JSON record.
//!
//! Every accessor takes the accepted names in priority order and reads the
//! first one that is present and non-null. A present value of the wrong type
//! yields `None` (the caller applies the field default) and a warning.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

pub(crate) type Record = Map<String, Value>;

/// The first non-null value among `names`, with the name it was found under.
pub(crate) fn first<'a>(
    record: &'a Record,
    names: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    names.iter().find_map(|name| {
        record
            .get(*name)
            .filter(|v| !v.is_null())
            .map(|v| (*name, v))
    })
}

fn mistyped(name: &str, value: &Value, expected: &str) {
    tracing::warn!(field = name, value = %value, expected, "ignoring mistyped response field");
}

/// Strings as-is; numbers rendered in their JSON form.
pub(crate) fn text(record: &Record, names: &[&'static str]) -> Option<String> {
    let (name, value) = first(record, names)?;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        other => {
            mistyped(name, other, "string");
            None
        }
    }
}

/// JSON numbers or numeric strings.
pub(crate) fn decimal(record: &Record, names: &[&'static str]) -> Option<Decimal> {
    let (name, value) = first(record, names)?;
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };
    if parsed.is_none() {
        mistyped(name, value, "number");
    }
    parsed
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Non-negative whole numbers, from JSON numbers or numeric strings.
/// Fractional values are truncated.
pub(crate) fn count(record: &Record, names: &[&'static str]) -> Option<u64> {
    let (name, value) = first(record, names)?;
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    };
    if parsed.is_none() {
        mistyped(name, value, "non-negative integer");
    }
    parsed
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn whole(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value < u64::MAX as f64).then(|| value.trunc() as u64)
}

/// Booleans, plus the strings `"true"` / `"false"`.
pub(crate) fn flag(record: &Record, names: &[&'static str]) -> Option<bool> {
    let (name, value) = first(record, names)?;
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        other => {
            mistyped(name, other, "boolean");
            None
        }
    }
}

/// RFC 3339 strings, naive `YYYY-MM-DDTHH:MM:SS` strings read as UTC, or
/// epoch milliseconds.
pub(crate) fn timestamp(record: &Record, names: &[&'static str]) -> Option<DateTime<Utc>> {
    let (name, value) = first(record, names)?;
    let parsed = match value {
        Value::String(s) => parse_timestamp(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    if parsed.is_none() {
        mistyped(name, value, "timestamp");
    }
    parsed
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}

/// Arrays of strings (non-string items skipped) or a comma-separated string.
pub(crate) fn string_list(record: &Record, names: &[&'static str]) -> Vec<String> {
    match first(record, names) {
        Some((_, Value::Array(items))) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Some((_, Value::String(s))) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Some((name, other)) => {
            mistyped(name, other, "list of strings");
            Vec::new()
        }
        None => Vec::new(),
    }
}
