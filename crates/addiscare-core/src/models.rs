//! Notification data model.
//!
//! Field names follow the backend's camelCase JSON. Identifiers are opaque
//! strings; the backend emits them as `_id` and the decoder accepts both
//! spellings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Severity/category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Alert,
    Success,
    Warning,
    /// Unknown values sent by newer servers also land here.
    #[default]
    #[serde(other)]
    Info,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Alert => write!(f, "alert"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Denormalized sender attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A message delivered to one user.
///
/// `read` is the read flag of the requesting user. Broadcasts are expanded to
/// one record per recipient server-side, so no flag is ever shared between
/// users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationType,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

impl Notification {
    /// Minimal notification, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<String>, title: impl Into<String>, read: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: String::new(),
            kind: NotificationType::Info,
            read,
            created_at: Utc::now(),
            link: None,
            sender: None,
            report_id: None,
        }
    }

    pub fn is_unread(&self) -> bool {
        !self.read
    }
}

/// Audience for a bulk send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reporter,
    Government,
    Admin,
    /// Every registered user.
    All,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reporter" => Ok(Self::Reporter),
            "government" => Ok(Self::Government),
            "admin" => Ok(Self::Admin),
            "all" => Ok(Self::All),
            other => Err(Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reporter => write!(f, "reporter"),
            Self::Government => write!(f, "government"),
            Self::Admin => write!(f, "admin"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Query for `GET /notifications`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Maximum items to return.
    pub limit: usize,
    /// Opaque pagination cursor from a previous page.
    pub cursor: Option<String>,
}

impl ListQuery {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }
}

/// Body of `POST /notifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub title: String,
    pub message: String,
    pub recipient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

/// Body of `POST /notifications/bulk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendRequest {
    pub title: String,
    pub message: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

/// Response of bulk send and mark-all-read: how many records were touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub count: u64,
}
