//! Admin composer for individual and broadcast notifications.
//!
//! Input is checked locally first so an obviously incomplete form never
//! reaches the backend. Server-side validation errors come back verbatim as
//! [`Error::Validation`] and are never retried.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use addiscare_core::{
    defaults, BulkOutcome, BulkSendRequest, Error, FieldError, Notification, NotificationApi,
    Result, SendNotificationRequest,
};

pub struct NotificationComposer {
    api: Arc<dyn NotificationApi>,
}

impl NotificationComposer {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        Self { api }
    }

    /// Send to one recipient.
    #[instrument(skip(self, req), fields(recipient_id = %req.recipient_id))]
    pub async fn send(&self, req: SendNotificationRequest) -> Result<Notification> {
        let req = validate_send(req)?;
        let created = self.api.send(&req).await.inspect_err(|e| {
            warn!(error = %e, "Send notification failed");
        })?;
        info!(notification_id = %created.id, "Notification sent");
        Ok(created)
    }

    /// Fan out to every user with `req.role`.
    #[instrument(skip(self, req), fields(role = %req.role))]
    pub async fn broadcast(&self, req: BulkSendRequest) -> Result<BulkOutcome> {
        let req = validate_broadcast(req)?;
        let outcome = self.api.send_bulk(&req).await.inspect_err(|e| {
            warn!(error = %e, "Broadcast failed");
        })?;
        info!(count = outcome.count, "Broadcast sent");
        Ok(outcome)
    }
}

fn check_content(title: &str, message: &str, fields: &mut Vec<FieldError>) {
    if title.is_empty() {
        fields.push(FieldError::new("title", "Title is required"));
    } else if title.chars().count() > defaults::TITLE_MAX_LEN {
        fields.push(FieldError::new(
            "title",
            format!("Title must be at most {} characters", defaults::TITLE_MAX_LEN),
        ));
    }
    if message.is_empty() {
        fields.push(FieldError::new("message", "Message is required"));
    }
}

fn finish<T>(value: T, fields: Vec<FieldError>) -> Result<T> {
    if fields.is_empty() {
        Ok(value)
    } else {
        Err(Error::Validation {
            message: "Notification is incomplete".to_string(),
            fields,
        })
    }
}

/// Trim and check an individual send.
pub fn validate_send(mut req: SendNotificationRequest) -> Result<SendNotificationRequest> {
    req.title = req.title.trim().to_string();
    req.message = req.message.trim().to_string();
    req.recipient_id = req.recipient_id.trim().to_string();
    req.report_id = req.report_id.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    let mut fields = Vec::new();
    check_content(&req.title, &req.message, &mut fields);
    if req.recipient_id.is_empty() {
        fields.push(FieldError::new("recipientId", "Recipient is required"));
    }
    finish(req, fields)
}

/// Trim and check a broadcast.
pub fn validate_broadcast(mut req: BulkSendRequest) -> Result<BulkSendRequest> {
    req.title = req.title.trim().to_string();
    req.message = req.message.trim().to_string();
    req.report_id = req.report_id.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    let mut fields = Vec::new();
    check_content(&req.title, &req.message, &mut fields);
    finish(req, fields)
}
