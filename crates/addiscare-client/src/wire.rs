//! Response and error body shapes used by the notification REST API.
//!
//! Several backend versions are in the wild, so list and count responses are
//! decoded through untagged enums that accept each known shape.

use serde::Deserialize;

use addiscare_core::{Error, FieldError, Notification};

/// `GET /notifications` body: a bare array or an object wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse {
    Bare(Vec<Notification>),
    Wrapped {
        #[serde(alias = "data")]
        notifications: Vec<Notification>,
    },
}

impl ListResponse {
    pub(crate) fn into_items(self) -> Vec<Notification> {
        match self {
            Self::Bare(items) | Self::Wrapped { notifications: items } => items,
        }
    }
}

/// `GET /notifications/unread-count` body.
#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    #[serde(alias = "unreadCount")]
    pub(crate) count: u64,
}

#[derive(Debug, Deserialize)]
struct FieldErrorBody {
    #[serde(alias = "path", alias = "param", default)]
    field: String,
    #[serde(alias = "msg", default)]
    message: String,
}

/// Error payload shapes: `{message}`, `{error}`, `{errors:[...]}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Vec<FieldErrorBody>,
}

/// Turn a non-2xx status and raw body into a core [`Error`].
///
/// Field errors are carried verbatim so the initiating form can show them.
pub(crate) fn error_from_response(status: u16, body: &str) -> Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let fields: Vec<FieldError> = parsed
        .errors
        .into_iter()
        .map(|e| FieldError::new(e.field, e.message))
        .collect();

    let message = parsed
        .message
        .or(parsed.error)
        .or_else(|| fields.first().map(|f| f.message.clone()))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.chars().take(200).collect()
            }
        });

    match Error::from_status(status, message) {
        Error::Validation { message, .. } => Error::Validation { message, fields },
        other => other,
    }
}
