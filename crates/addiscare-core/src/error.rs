//! Error types for AddisCare notifications.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AddisCare's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A single field-level validation message returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Core error type for notification operations.
///
/// `Clone` so a single fetch outcome can be handed to every caller that was
/// coalesced onto it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// HTTP/network request failed before a response arrived (includes timeouts)
    #[error("Request error: {0}")]
    Request(String),

    /// Non-2xx response not covered by a more specific variant
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Session token missing, expired or rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not authorized)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with current server state (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request rejected by validation, with per-field messages
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Sync engine used after deactivation
    #[error("Notification sync is not active")]
    Inactive,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used to decide how a failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Timeouts, connection failures, 5xx. Retried by the next poll tick.
    Transient,
    /// 401. Escalated to the session layer.
    Authentication,
    /// 404/409 on a mutation. The desired end state already holds.
    Conflict,
    /// 400 with field errors. Shown verbatim, never retried.
    Validation,
    /// Everything else.
    Fatal,
}

impl Error {
    /// Build the error for a non-2xx HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Error::Validation {
                message,
                fields: Vec::new(),
            },
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            409 => Error::Conflict(message),
            _ => Error::Server { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Request(_) => ErrorKind::Transient,
            Error::Server { status, .. } if *status >= 500 || *status == 429 => {
                ErrorKind::Transient
            }
            Error::Unauthorized(_) => ErrorKind::Authentication,
            Error::NotFound(_) | Error::Conflict(_) => ErrorKind::Conflict,
            Error::Validation { .. } | Error::InvalidInput(_) => ErrorKind::Validation,
            _ => ErrorKind::Fatal,
        }
    }

    /// Check if this error is worth retrying on the next poll.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::Unauthorized(_) => Some(401),
            Error::Forbidden(_) => Some(403),
            Error::NotFound(_) => Some(404),
            Error::Conflict(_) => Some(409),
            Error::Validation { .. } => Some(400),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Error::Serialization(e.to_string());
        }
        match e.status() {
            Some(status) => Error::from_status(status.as_u16(), e.to_string()),
            None => Error::Request(e.to_string()),
        }
    }
}
