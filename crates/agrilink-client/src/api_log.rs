//! Bounded in-memory log of API traffic for debugging and support exports.
//!
//! Each entry is also emitted as a `tracing` event. Sensitive keys are
//! redacted before an entry is stored or emitted.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_CAPACITY: usize = 50;

const REDACTED: &str = "[REDACTED]";

/// Key fragments (matched case-insensitively) whose values are never logged.
const SENSITIVE_KEYS: [&str; 6] = [
    "password",
    "token",
    "authorization",
    "api_key",
    "apikey",
    "secret",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryKind {
    Request,
    Response,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: LogEntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempt: Option<u32>,
}

impl LogEntry {
    fn new(kind: LogEntryKind, endpoint: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            request_id: None,
            endpoint: endpoint.to_owned(),
            method: None,
            status: None,
            duration_ms: None,
            payload: None,
            response: None,
            error: None,
            headers: None,
            retry_attempt: None,
        }
    }
}

/// Extra detail recorded alongside an error entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorContext<'a> {
    pub request_id: Option<&'a str>,
    pub method: Option<&'a str>,
    pub payload: Option<&'a Value>,
    pub retry_attempt: Option<u32>,
}

/// Ring buffer of the most recent API log entries. Share it with
/// `Arc<ApiLog>`; the lock is held only for a push or a read.
#[derive(Debug)]
pub struct ApiLog {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl Default for ApiLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ApiLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A log keeping at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records an outgoing request and returns its generated request id.
    pub fn log_request(
        &self,
        endpoint: &str,
        method: &str,
        payload: Option<&Value>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> String {
        let request_id = format!("req_{}", Uuid::new_v4().simple());
        tracing::debug!(%request_id, method, endpoint, "API request");

        self.push(LogEntry {
            request_id: Some(request_id.clone()),
            method: Some(method.to_owned()),
            payload: payload.map(redact),
            headers: headers.map(redact_headers),
            ..LogEntry::new(LogEntryKind::Request, endpoint)
        });
        request_id
    }

    pub fn log_response(
        &self,
        endpoint: &str,
        status: u16,
        response: &Value,
        duration: Duration,
        request_id: Option<&str>,
    ) {
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        if status >= 400 {
            tracing::warn!(request_id, status, duration_ms, endpoint, "API response");
        } else {
            tracing::debug!(request_id, status, duration_ms, endpoint, "API response");
        }

        self.push(LogEntry {
            request_id: request_id.map(str::to_owned),
            status: Some(status),
            duration_ms: Some(duration_ms),
            response: Some(redact(response)),
            ..LogEntry::new(LogEntryKind::Response, endpoint)
        });
    }

    pub fn log_error(&self, endpoint: &str, error: &ApiError, context: ErrorContext<'_>) {
        tracing::warn!(
            request_id = context.request_id,
            method = context.method,
            retry_attempt = context.retry_attempt,
            endpoint,
            error = %error,
            "API error"
        );

        let status = error.status();
        self.push(LogEntry {
            request_id: context.request_id.map(str::to_owned),
            method: context.method.map(str::to_owned),
            status: (status != 0).then_some(status),
            payload: context.payload.map(redact),
            error: Some(json!({
                "kind": format!("{:?}", error.kind()),
                "status": status,
                "message": error.to_string(),
                "fieldErrors": error.field_errors(),
            })),
            retry_attempt: context.retry_attempt,
            ..LogEntry::new(LogEntryKind::Error, endpoint)
        });
    }

    /// Emits a retry notice. Retries are not stored in the buffer.
    pub fn log_retry_attempt(&self, endpoint: &str, attempt: u32, delay: Duration) {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        tracing::info!(endpoint, attempt, delay_ms, "API retry scheduled");
    }

    /// Oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn entries_for_endpoint(&self, endpoint: &str) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|e| e.endpoint == endpoint)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn error_entries(&self) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|e| e.kind == LogEntryKind::Error)
            .cloned()
            .collect()
    }

    /// Pretty-printed JSON array of all entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry cannot be serialized.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries())
    }

    pub fn clear(&self) {
        self.lock().clear();
        tracing::debug!("API log cleared");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, entry: LogEntry) {
        let mut entries = self.lock();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|fragment| key.contains(fragment))
}

/// Deep copy of `value` with every sensitive key's value replaced.
fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| {
                    let v = if is_sensitive_key(key) {
                        Value::String(REDACTED.to_owned())
                    } else {
                        redact(v)
                    };
                    (key.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn redact_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_sensitive_key(name) {
                REDACTED.to_owned()
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormalizedError;

    #[test]
    fn request_ids_are_unique_and_prefixed() {
        let log = ApiLog::new();
        let a = log.log_request("/listings", "GET", None, None);
        let b = log.log_request("/listings", "GET", None, None);
        assert!(a.starts_with("req_"));
        assert_ne!(a, b);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn buffer_keeps_only_the_most_recent_entries() {
        let log = ApiLog::with_capacity(3);
        for i in 0..5 {
            log.log_request(&format!("/listings/{i}"), "GET", None, None);
        }
        let endpoints: Vec<String> = log.entries().into_iter().map(|e| e.endpoint).collect();
        assert_eq!(endpoints, ["/listings/2", "/listings/3", "/listings/4"]);
    }

    #[test]
    fn default_capacity_is_fifty_and_zero_is_bumped_to_one() {
        assert_eq!(ApiLog::new().capacity(), 50);
        let log = ApiLog::with_capacity(0);
        log.log_request("/a", "GET", None, None);
        log.log_request("/b", "GET", None, None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn sensitive_payload_keys_are_redacted_recursively() {
        let log = ApiLog::new();
        let payload = json!({
            "produceName": "Yam",
            "password": "hunter2",
            "auth": { "accessToken": "abc", "API_KEY": "k" },
            "items": [{ "clientSecret": "s", "qty": 1 }]
        });
        log.log_request("/listings", "POST", Some(&payload), None);
        let stored = log.entries().remove(0).payload.unwrap();
        assert_eq!(stored["produceName"], "Yam");
        assert_eq!(stored["password"], REDACTED);
        assert_eq!(stored["auth"]["accessToken"], REDACTED);
        assert_eq!(stored["auth"]["API_KEY"], REDACTED);
        assert_eq!(stored["items"][0]["clientSecret"], REDACTED);
        assert_eq!(stored["items"][0]["qty"], 1);
    }

    #[test]
    fn authorization_header_is_redacted() {
        let log = ApiLog::new();
        let headers = BTreeMap::from([
            ("Authorization".to_owned(), "Bearer abc".to_owned()),
            ("Content-Type".to_owned(), "application/json".to_owned()),
        ]);
        log.log_request("/listings", "GET", None, Some(&headers));
        let stored = log.entries().remove(0).headers.unwrap();
        assert_eq!(stored["Authorization"], REDACTED);
        assert_eq!(stored["Content-Type"], "application/json");
    }

    #[test]
    fn filters_by_endpoint_and_kind() {
        let log = ApiLog::new();
        let id = log.log_request("/listings", "POST", None, None);
        log.log_response(
            "/listings",
            201,
            &json!({ "_id": "x" }),
            Duration::from_millis(40),
            Some(&id),
        );
        log.log_request("/listings/x", "GET", None, None);
        let err = ApiError::Status(NormalizedError {
            status: 404,
            message: "not found".to_owned(),
            field_errors: None,
        });
        log.log_error(
            "/listings/x",
            &err,
            ErrorContext {
                method: Some("GET"),
                ..ErrorContext::default()
            },
        );

        assert_eq!(log.entries_for_endpoint("/listings").len(), 2);
        let errors = log.error_entries();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status, Some(404));
        assert_eq!(errors[0].error.as_ref().unwrap()["kind"], "Client");

        let response = &log.entries()[1];
        assert_eq!(response.request_id.as_deref(), Some(id.as_str()));
        assert_eq!(response.duration_ms, Some(40));
    }

    #[test]
    fn export_is_a_json_array_and_clear_empties_the_buffer() {
        let log = ApiLog::new();
        log.log_request("/health", "GET", None, None);
        let exported: Value = serde_json::from_str(&log.export_json().unwrap()).unwrap();
        assert_eq!(exported[0]["type"], "request");
        assert_eq!(exported[0]["endpoint"], "/health");

        log.clear();
        assert!(log.is_empty());
    }
}
