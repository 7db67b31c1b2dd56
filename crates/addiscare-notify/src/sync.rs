//! Sync engine: the only component that fetches notification state.
//!
//! Each sync fetches the unread count and a bounded page concurrently and
//! hands both to [`NotificationStore::apply_server_snapshot`]. A failed sync
//! keeps the previous snapshot and records the error; the next poll tick is
//! the retry.
//!
//! At most one fetch is in flight per engine. [`SyncEngine::refresh`]
//! coalesces onto a fetch that is already running; [`SyncEngine::resync`]
//! waits for it and then starts a fresh one, so the result is guaranteed to
//! reflect server state from after the call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use addiscare_core::{
    Error, ErrorKind, EventBus, ListQuery, NotificationApi, NotificationEvent, Result,
};

use crate::config::NotifyConfig;
use crate::store::NotificationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncMode {
    /// Share an in-flight fetch if there is one.
    Coalesce,
    /// Always run a fetch that starts after the call.
    Fresh,
}

#[derive(Default)]
struct SyncProgress {
    /// Fetches started so far.
    started: u64,
    /// Sequence number of the last fetch that finished.
    completed: u64,
    last: Option<Result<()>>,
}

struct EngineInner {
    api: Arc<dyn NotificationApi>,
    store: Arc<NotificationStore>,
    events: EventBus,
    config: NotifyConfig,
    active: AtomicBool,
    /// Serializes fetches.
    gate: tokio::sync::Mutex<()>,
    progress: Mutex<SyncProgress>,
}

/// Clears the store's loading flag when a fetch ends without applying a
/// result: discarded after deactivation, or cancelled mid-flight.
struct LoadingGuard<'a>(&'a NotificationStore);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.end_loading();
    }
}

/// Fetch-then-reconcile engine bound to one store.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(
        api: Arc<dyn NotificationApi>,
        store: Arc<NotificationStore>,
        events: EventBus,
        config: NotifyConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                api,
                store,
                events,
                config,
                active: AtomicBool::new(false),
                gate: tokio::sync::Mutex::new(()),
                progress: Mutex::new(SyncProgress::default()),
            }),
        }
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.inner.store
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.inner.config
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Start syncing for an authenticated user.
    ///
    /// Polling begins with an immediate fetch. The returned handle owns the
    /// poll timer: [`SyncHandle::deactivate`] (or dropping it) stops polling.
    /// Activating an engine that is already active is a programming error.
    pub fn activate(&self) -> Result<SyncHandle> {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            return Err(Error::Internal(
                "Notification sync engine is already active".into(),
            ));
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = if self.inner.config.enabled {
            let engine = self.clone();
            Some(tokio::spawn(async move {
                engine.run(shutdown_rx).await;
            }))
        } else {
            info!("Notification polling disabled; manual refresh only");
            None
        };

        self.inner.events.emit(NotificationEvent::EngineActivated {
            poll_interval_ms: self.inner.config.poll_interval_ms,
        });

        Ok(SyncHandle {
            engine: self.clone(),
            shutdown_tx,
            task,
            released: false,
        })
    }

    /// Fetch now, sharing a fetch that is already in flight.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        self.sync(SyncMode::Coalesce).await
    }

    /// Fetch now, queued behind any in-flight fetch.
    ///
    /// Used after mutations: a poll that started before the server applied the
    /// change must not be taken as the post-mutation state.
    #[instrument(skip(self))]
    pub async fn resync(&self) -> Result<()> {
        self.sync(SyncMode::Fresh).await
    }

    fn progress(&self) -> MutexGuard<'_, SyncProgress> {
        self.inner
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn sync(&self, mode: SyncMode) -> Result<()> {
        if !self.is_active() {
            return Err(Error::Inactive);
        }

        let target = {
            let progress = self.progress();
            match mode {
                SyncMode::Coalesce if progress.started > progress.completed => progress.started,
                _ => progress.started + 1,
            }
        };

        let _gate = self.inner.gate.lock().await;

        {
            let mut progress = self.progress();
            if progress.completed >= target {
                debug!(seq = progress.completed, "Coalesced onto in-flight sync");
                return progress.last.clone().unwrap_or(Ok(()));
            }
            progress.started += 1;
        }

        let outcome = self.fetch_and_apply().await;

        let mut progress = self.progress();
        progress.completed = progress.started;
        progress.last = Some(outcome.clone());
        outcome
    }

    async fn fetch_and_apply(&self) -> Result<()> {
        if !self.is_active() {
            return Err(Error::Inactive);
        }

        let start = Instant::now();
        let store = &self.inner.store;
        store.begin_loading();
        let _loading = LoadingGuard(store);

        let query = ListQuery::with_limit(self.inner.config.page_limit);
        let fetched =
            futures::future::try_join(self.inner.api.unread_count(), self.inner.api.list(&query))
                .await;

        // Deactivated mid-flight: the session is going away, drop the result.
        if !self.is_active() {
            debug!("Discarding sync result after deactivation");
            return Err(Error::Inactive);
        }

        match fetched {
            Ok((unread_count, items)) => {
                let item_count = items.len().min(store.retention_cap());
                store.apply_server_snapshot(items, unread_count);
                debug!(
                    unread_count,
                    item_count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Notification sync completed"
                );
                self.inner.events.emit(NotificationEvent::SyncCompleted {
                    unread_count,
                    item_count,
                });
                Ok(())
            }
            Err(e) => {
                let kind = e.kind();
                warn!(
                    error = %e,
                    ?kind,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Notification sync failed, keeping last snapshot"
                );
                store.record_error(e.clone());
                self.inner.events.emit(NotificationEvent::SyncFailed {
                    error: e.to_string(),
                    kind,
                });
                if kind == ErrorKind::Authentication {
                    self.inner.events.emit(NotificationEvent::SessionExpired);
                }
                Err(e)
            }
        }
    }

    /// Poll loop. The first tick fires immediately.
    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.inner.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_ms = self.inner.config.poll_interval_ms,
            page_limit = self.inner.config.page_limit,
            "Notification polling started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                result = self.refresh() => match result {
                    Ok(()) => {}
                    Err(Error::Inactive) => break,
                    Err(e) => debug!(error = %e, "Poll failed, retrying on next tick"),
                },
            }
        }

        info!("Notification polling stopped");
    }
}

/// Owns the polling task of an active engine.
///
/// Dropping the handle without calling [`deactivate`](Self::deactivate)
/// still stops polling (the task is aborted).
pub struct SyncHandle {
    engine: SyncEngine,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
    released: bool,
}

impl SyncHandle {
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Stop polling and wait for the poll task to exit.
    pub async fn deactivate(mut self) {
        self.release();
        let _ = self.shutdown_tx.try_send(());
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!(error = ?e, "Notification poll task panicked");
                }
            }
        }
        info!("Notification sync deactivated");
    }

    /// Runs once per handle, on every exit path.
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.engine.inner.active.store(false, Ordering::SeqCst);
        self.engine
            .inner
            .events
            .emit(NotificationEvent::EngineDeactivated);
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.release();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
