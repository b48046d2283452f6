//! Error-response normalization into [`NormalizedError`].

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::NormalizedError;

/// One field's raw error value, in any of the shapes backends send.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFieldError {
    Text(String),
    List(Vec<RawFieldItem>),
    Structured { message: String },
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFieldItem {
    Text(String),
    Structured { message: String },
    Other(Value),
}

impl RawFieldItem {
    fn into_message(self) -> Option<String> {
        match self {
            RawFieldItem::Text(text) | RawFieldItem::Structured { message: text } => Some(text),
            RawFieldItem::Other(Value::Null) => None,
            RawFieldItem::Other(other) => Some(other.to_string()),
        }
    }
}

impl RawFieldError {
    fn into_messages(self) -> Vec<String> {
        match self {
            RawFieldError::Text(text) | RawFieldError::Structured { message: text } => vec![text],
            RawFieldError::List(items) => items
                .into_iter()
                .filter_map(RawFieldItem::into_message)
                .collect(),
            RawFieldError::Other(Value::Null) => Vec::new(),
            RawFieldError::Other(other) => vec![other.to_string()],
        }
    }
}

/// Normalizes any error body. Never fails; unknown shapes produce a generic
/// message with status `0`.
#[must_use]
pub fn normalize_error(body: &Value) -> NormalizedError {
    let field_errors = extract_field_errors(body);
    NormalizedError {
        status: extract_status(body),
        message: extract_message(body, field_errors.as_ref()),
        field_errors,
    }
}

/// Like [`normalize_error`], using `http_status` when the body carries none.
#[must_use]
pub fn normalize_http_error(http_status: u16, body: &Value) -> NormalizedError {
    let mut error = normalize_error(body);
    if error.status == 0 {
        error.status = http_status;
    }
    error
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn extract_message(
    body: &Value,
    field_errors: Option<&BTreeMap<String, Vec<String>>>,
) -> String {
    if let Value::String(text) = body {
        if !text.trim().is_empty() {
            return text.clone();
        }
    }

    let candidates = [
        body.get("message"),
        body.pointer("/error/message"),
        body.pointer("/data/message"),
        body.get("errors"),
    ];
    if let Some(message) = candidates.into_iter().find_map(non_empty_str) {
        return message.to_owned();
    }

    match field_errors {
        Some(map) if !map.is_empty() => {
            format!("Validation failed with {} error(s)", map.len())
        }
        _ => "An error occurred".to_owned(),
    }
}

fn extract_field_errors(body: &Value) -> Option<BTreeMap<String, Vec<String>>> {
    [
        body.get("errors"),
        body.get("validationErrors"),
        body.pointer("/data/errors"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_object)
    .map(|raw| {
        raw.iter()
            .filter_map(|(field, value)| {
                let messages = serde_json::from_value::<RawFieldError>(value.clone())
                    .map(RawFieldError::into_messages)
                    .unwrap_or_default();
                (!messages.is_empty()).then(|| (field.clone(), messages))
            })
            .collect::<BTreeMap<_, _>>()
    })
    .find(|map| !map.is_empty())
}

fn extract_status(body: &Value) -> u16 {
    ["status", "statusCode", "code"]
        .into_iter()
        .filter_map(|key| body.get(key))
        .find_map(status_code)
        .unwrap_or(0)
}

fn status_code(value: &Value) -> Option<u16> {
    let code = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u16::try_from(code).ok().filter(|code| *code != 0)
}
