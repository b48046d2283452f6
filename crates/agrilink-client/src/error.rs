use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validate::ValidationResult;

/// The canonical error shape every backend error response is normalized into.
///
/// `status == 0` means no HTTP status was available, which is treated as a
/// network-layer failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedError {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, Vec<String>>>,
}

impl std::fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.status == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "HTTP {}: {}", self.status, self.message)
        }
    }
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local pre-flight rejection; nothing was sent.
    Validation,
    /// A success-shaped payload with no listing in it.
    MalformedResponse,
    /// No HTTP status: connection, DNS or TLS failure.
    Network,
    /// 4xx other than 408 and 429.
    Client,
    RateLimit,
    Timeout,
    Server,
    /// Request body could not be encoded.
    Encode,
    /// Misconfigured client (bad base URL, TLS setup).
    Configuration,
    Cancelled,
    /// Any other status (1xx, 3xx, 600+).
    Unexpected,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request validation failed: {}", .0.errors.join("; "))]
    Validation(ValidationResult),

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Status(NormalizedError),

    #[error("JSON encoding error for {context}: {source}")]
    Encode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            ApiError::Transport(_) => ErrorKind::Network,
            ApiError::Status(err) => kind_for_status(err.status),
            ApiError::Encode { .. } => ErrorKind::Encode,
            ApiError::InvalidBaseUrl { .. } => ErrorKind::Configuration,
            ApiError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// HTTP status of the failure, `0` when there was none.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Status(err) => err.status,
            _ => 0,
        }
    }

    /// Field-indexed messages from local validation or from the server.
    #[must_use]
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            ApiError::Validation(result) => result.field_errors.as_ref(),
            ApiError::Status(err) => err.field_errors.as_ref(),
            _ => None,
        }
    }

    /// Text suitable for showing to the person who triggered the request.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation => "Please correct the highlighted fields and try again.".into(),
            ErrorKind::Client => match self {
                ApiError::Status(err) => err.message.clone(),
                _ => self.to_string(),
            },
            ErrorKind::Network => {
                "Could not reach the server. Check your connection and try again.".into()
            }
            ErrorKind::RateLimit => "Too many requests. Please wait a moment and try again.".into(),
            ErrorKind::Timeout => "The server took too long to respond. Please try again.".into(),
            ErrorKind::Server => {
                "Something went wrong on our side, not yours. Please try again later.".into()
            }
            ErrorKind::Cancelled => "The request was cancelled.".into(),
            ErrorKind::MalformedResponse
            | ErrorKind::Encode
            | ErrorKind::Configuration
            | ErrorKind::Unexpected => "An unexpected error occurred. Please try again.".into(),
        }
    }
}

fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        0 => ErrorKind::Network,
        408 => ErrorKind::Timeout,
        429 => ErrorKind::RateLimit,
        400..=499 => ErrorKind::Client,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Unexpected,
    }
}
