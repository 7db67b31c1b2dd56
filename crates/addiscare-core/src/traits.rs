//! Core traits for AddisCare notification abstractions.
//!
//! [`NotificationApi`] is the REST boundary. The HTTP client implements it;
//! the sync engine, mutation coordinator and composer only ever talk to the
//! backend through it, which also makes them testable with in-memory doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

/// Backend operations on the current user's notifications.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// `GET /notifications?limit=N`: newest first.
    async fn list(&self, query: &ListQuery) -> Result<Vec<Notification>>;

    /// `GET /notifications/unread-count`: authoritative, unbounded count.
    async fn unread_count(&self) -> Result<u64>;

    /// `PATCH /notifications/:id/read`
    async fn mark_read(&self, id: &str) -> Result<()>;

    /// `PATCH /notifications/mark-all-read`: returns how many were updated.
    async fn mark_all_read(&self) -> Result<u64>;

    /// `DELETE /notifications/:id`: permanent removal.
    async fn delete(&self, id: &str) -> Result<()>;

    /// `PUT /notifications/:id/hide`: per-user soft removal.
    async fn hide(&self, id: &str) -> Result<()>;

    /// `POST /notifications`: direct send to one recipient.
    async fn send(&self, req: &SendNotificationRequest) -> Result<Notification>;

    /// `POST /notifications/bulk`: fan-out to every user with a role.
    async fn send_bulk(&self, req: &BulkSendRequest) -> Result<BulkOutcome>;
}
