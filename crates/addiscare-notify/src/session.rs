//! One notification session per authenticated user.
//!
//! The session owns the single store, engine, coordinator and event bus that
//! every surface of the application shares. Surfaces get thin adapters from
//! it rather than building their own state or polling.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use addiscare_core::{EventBus, NotificationApi, Result};

use crate::adapter::{HeaderBadge, NotificationsPage};
use crate::compose::NotificationComposer;
use crate::config::NotifyConfig;
use crate::coordinator::MutationCoordinator;
use crate::store::NotificationStore;
use crate::sync::{SyncEngine, SyncHandle};

struct SessionInner {
    api: Arc<dyn NotificationApi>,
    store: Arc<NotificationStore>,
    engine: SyncEngine,
    coordinator: MutationCoordinator,
    events: EventBus,
    /// Present until logout.
    handle: Mutex<Option<SyncHandle>>,
}

/// Shared handle to a running session. Cheap to clone; dropping the last
/// clone stops polling.
#[derive(Clone)]
pub struct NotificationSession {
    inner: Arc<SessionInner>,
}

impl NotificationSession {
    /// Wire up the session and start polling (immediate first fetch unless
    /// polling is disabled).
    pub fn start(api: Arc<dyn NotificationApi>, config: NotifyConfig) -> Result<Self> {
        let config = config.normalized();
        let events = EventBus::new(config.event_capacity);
        let store = Arc::new(NotificationStore::new(config.retention_cap));
        let engine = SyncEngine::new(api.clone(), store.clone(), events.clone(), config);
        let coordinator = MutationCoordinator::new(api.clone(), engine.clone(), events.clone());
        let handle = engine.activate()?;

        info!(
            retention_cap = store.retention_cap(),
            polling = engine.config().enabled,
            "Notification session started"
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                api,
                store,
                engine,
                coordinator,
                events,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.inner.store
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.inner.engine
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.inner.coordinator
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn is_active(&self) -> bool {
        self.inner.engine.is_active()
    }

    pub async fn refresh(&self) -> Result<()> {
        self.inner.coordinator.refresh().await
    }

    pub fn header_badge(&self) -> HeaderBadge {
        HeaderBadge::new(self.inner.coordinator.clone())
    }

    pub fn notifications_page(&self) -> NotificationsPage {
        NotificationsPage::new(self.inner.coordinator.clone())
    }

    /// Admin send/broadcast, sharing the session's backend.
    pub fn composer(&self) -> NotificationComposer {
        NotificationComposer::new(self.inner.api.clone())
    }

    /// Stop polling, wait for the poll task, then empty the store.
    ///
    /// Idempotent: later calls only clear the store again.
    pub async fn logout(&self) {
        let handle = self
            .inner
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.deactivate().await;
        }
        self.inner.store.clear();
        info!("Notification session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNotificationApi;
    use addiscare_core::{Error, Notification, NotificationEvent};
    use std::time::Duration;

    fn api() -> MockNotificationApi {
        MockNotificationApi::new().with_items(vec![
            Notification::new("1", "one", false),
            Notification::new("2", "two", true),
        ])
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_start_polls_and_logout_clears() {
        let api = api();
        let session = NotificationSession::start(
            Arc::new(api.clone()),
            NotifyConfig::default().with_poll_interval(5_000),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(session.store().snapshot().unread_count, 1);

        session.logout().await;
        assert!(!session.is_active());
        let snap = session.store().snapshot();
        assert!(snap.items.is_empty());
        assert_eq!(snap.unread_count, 0);

        let calls = api.total_calls();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.total_calls(), calls);

        // Second logout is harmless.
        session.logout().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_clones_share_one_store_and_one_poller() {
        let api = api();
        let session = NotificationSession::start(
            Arc::new(api.clone()),
            NotifyConfig::default().with_poll_interval(10_000),
        )
        .unwrap();
        let other = session.clone();

        tokio::time::sleep(Duration::from_secs(25)).await;
        // Ticks at 0, 10 and 20 seconds, however many clones exist.
        assert_eq!(api.call_count("list"), 3);
        assert!(Arc::ptr_eq(session.store(), other.store()));

        other.coordinator().mark_one_read("1").await.unwrap();
        assert_eq!(session.header_badge().label(), None);
        session.logout().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_dropping_last_clone_stops_polling() {
        let api = api();
        let session = NotificationSession::start(
            Arc::new(api.clone()),
            NotifyConfig::default().with_poll_interval(5_000),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(session);

        let calls = api.total_calls();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_session_expiry_is_published() {
        let api = api();
        api.fail("list", Error::Unauthorized("expired".into()));
        let session = NotificationSession::start(
            Arc::new(api.clone()),
            NotifyConfig::default().with_enabled(false),
        )
        .unwrap();
        let mut rx = session.events().subscribe();

        assert!(session.refresh().await.is_err());
        let expired = std::iter::from_fn(|| rx.try_recv().ok())
            .any(|e| e.payload == NotificationEvent::SessionExpired);
        assert!(expired);

        // The store keeps its state until logout is confirmed.
        assert!(session.store().snapshot().last_error.is_some());
        session.logout().await;
        assert!(session.store().snapshot().last_error.is_none());
    }
}
