//! Notification event types, envelope, and event bus.
//!
//! The sync engine and mutation coordinator publish outcomes here so that
//! presentation code can show toasts and the outer application can react to
//! an expired session, without any of them reaching into the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ErrorKind;

/// User intent carried out by the mutation coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    MarkRead,
    MarkAllRead,
    Delete,
    Hide,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkRead => write!(f, "mark_read"),
            Self::MarkAllRead => write!(f, "mark_all_read"),
            Self::Delete => write!(f, "delete"),
            Self::Hide => write!(f, "hide"),
        }
    }
}

/// Versioned event envelope.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"sync.completed"`).
    pub event_type: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Domain-specific event data.
    pub payload: NotificationEvent,
}

impl EventEnvelope {
    pub fn new(event: NotificationEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

/// Notification subsystem events.
///
/// Serialized as JSON with a `type` tag field, e.g.
/// `{"type":"SyncCompleted","unread_count":3,"item_count":10}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    /// Polling started for an authenticated session.
    EngineActivated { poll_interval_ms: u64 },
    /// Polling stopped (logout or teardown).
    EngineDeactivated,
    /// A server snapshot was applied to the store.
    SyncCompleted { unread_count: u64, item_count: usize },
    /// A fetch failed; the previous snapshot is retained.
    SyncFailed { error: String, kind: ErrorKind },
    /// The backend rejected the session token (401).
    SessionExpired,
    /// The server accepted a mutation.
    MutationConfirmed {
        mutation: MutationKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        notification_id: Option<String>,
    },
    /// The server reported the target already gone or changed (404/409); the
    /// user's intent already holds so nothing is shown.
    MutationResolved {
        mutation: MutationKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        notification_id: Option<String>,
    },
    /// A mutation failed and the optimistic change was discarded.
    MutationRolledBack {
        mutation: MutationKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        notification_id: Option<String>,
        error: String,
    },
}

impl NotificationEvent {
    /// Returns the namespaced event type for the envelope.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EngineActivated { .. } => "engine.activated",
            Self::EngineDeactivated => "engine.deactivated",
            Self::SyncCompleted { .. } => "sync.completed",
            Self::SyncFailed { .. } => "sync.failed",
            Self::SessionExpired => "session.expired",
            Self::MutationConfirmed { .. } => "mutation.confirmed",
            Self::MutationResolved { .. } => "mutation.resolved",
            Self::MutationRolledBack { .. } => "mutation.rolled_back",
        }
    }

    /// Whether a presentation adapter should surface this event to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::MutationRolledBack { .. } | Self::SessionExpired
        )
    }
}

/// Broadcast-based event bus for notification events.
///
/// Slow receivers that fall behind receive a `Lagged` error and miss events;
/// the store snapshot, not the event stream, is the source of truth.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently if nobody listens.
    pub fn emit(&self, event: NotificationEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive enveloped events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
