//! Mutation coordinator: user intents become an optimistic store patch plus
//! the matching server request.
//!
//! Every mutation follows the same path:
//!
//! 1. apply the optimistic [`Patch`] so every surface updates at once;
//! 2. issue the request;
//! 3. on success, queue a [`SyncEngine::resync`] for fast consistency;
//! 4. on a 404/409, treat the intent as already satisfied and resync quietly;
//! 5. on any other failure, resync to restore server truth, reverting the
//!    patch locally if the resync fails too, and report the error.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use addiscare_core::{
    Error, ErrorKind, EventBus, MutationKind, NotificationApi, NotificationEvent, Result,
};

use crate::adapter::DeleteConfirmation;
use crate::mutation::PendingMutation;
use crate::store::{NotificationStore, Patch};
use crate::sync::SyncEngine;

/// How a mutation ended, from the user's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The server accepted the change.
    Confirmed,
    /// The target was already gone or changed server-side (404/409). The
    /// desired end state holds, so no error is shown.
    AlreadyResolved,
    /// Nothing to do; no request was sent.
    Skipped,
    /// The server refused. Local state has been restored.
    RolledBack { error: Error },
}

impl MutationOutcome {
    /// Error the user should see, if any.
    pub fn user_error(&self) -> Option<&Error> {
        match self {
            Self::RolledBack { error } => Some(error),
            _ => None,
        }
    }

    /// Whether a request went out.
    pub fn was_sent(&self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

struct CoordinatorInner {
    api: Arc<dyn NotificationApi>,
    engine: SyncEngine,
    events: EventBus,
    mark_all_in_flight: AtomicBool,
    in_flight: Arc<AtomicUsize>,
}

/// The only writer of optimistic state. Cheap to clone.
#[derive(Clone)]
pub struct MutationCoordinator {
    inner: Arc<CoordinatorInner>,
}

/// Clears the mark-all guard on every exit path.
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn NotificationApi>, engine: SyncEngine, events: EventBus) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                api,
                engine,
                events,
                mark_all_in_flight: AtomicBool::new(false),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        self.inner.engine.store()
    }

    /// Mutations whose server response is still outstanding.
    pub fn pending_count(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Mark one notification read. Items already read locally are skipped.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn mark_one_read(&self, id: &str) -> Result<MutationOutcome> {
        self.ensure_active()?;
        if self.store().snapshot().get(id).is_some_and(|n| n.read) {
            debug!("Already read, skipping request");
            return Ok(MutationOutcome::Skipped);
        }
        self.execute(
            MutationKind::MarkRead,
            Some(id.to_string()),
            Patch::MarkRead(id.to_string()),
            self.inner.api.mark_read(id),
        )
        .await
    }

    /// Mark everything read.
    ///
    /// Guarded: with nothing unread, or another mark-all still in flight, no
    /// request is sent.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self) -> Result<MutationOutcome> {
        self.ensure_active()?;
        let unread_count = self.store().snapshot().unread_count;
        if unread_count == 0 {
            debug!("Nothing unread, skipping mark-all");
            return Ok(MutationOutcome::Skipped);
        }
        if self.inner.mark_all_in_flight.swap(true, Ordering::SeqCst) {
            debug!("Mark-all already in flight, skipping");
            return Ok(MutationOutcome::Skipped);
        }
        let _guard = FlagGuard(&self.inner.mark_all_in_flight);

        let api = &self.inner.api;
        self.execute(MutationKind::MarkAllRead, None, Patch::MarkAllRead, async move {
            let marked = api.mark_all_read().await?;
            debug!(marked, "Server marked notifications read");
            Ok::<_, Error>(())
        })
        .await
    }

    /// Opening the notification panel marks everything read.
    pub async fn panel_opened(&self) -> Result<MutationOutcome> {
        self.mark_all_read().await
    }

    /// Permanently delete a notification. Requires a confirmation obtained
    /// from the user.
    #[instrument(skip(self, confirmation), fields(notification_id = %confirmation.notification_id()))]
    pub async fn remove(&self, confirmation: DeleteConfirmation) -> Result<MutationOutcome> {
        self.ensure_active()?;
        let id = confirmation.into_notification_id();
        let request = self.inner.api.delete(&id);
        self.execute(
            MutationKind::Delete,
            Some(id.clone()),
            Patch::Remove(id.clone()),
            request,
        )
        .await
    }

    /// Hide a notification for the current user only.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn hide(&self, id: &str) -> Result<MutationOutcome> {
        self.ensure_active()?;
        self.execute(
            MutationKind::Hide,
            Some(id.to_string()),
            Patch::Remove(id.to_string()),
            self.inner.api.hide(id),
        )
        .await
    }

    /// Manual refresh, coalesced with any poll in flight.
    pub async fn refresh(&self) -> Result<()> {
        self.inner.engine.refresh().await
    }

    fn ensure_active(&self) -> Result<()> {
        if self.inner.engine.is_active() {
            Ok(())
        } else {
            Err(Error::Inactive)
        }
    }

    async fn execute<F>(
        &self,
        kind: MutationKind,
        notification_id: Option<String>,
        patch: Patch,
        request: F,
    ) -> Result<MutationOutcome>
    where
        F: Future<Output = Result<()>>,
    {
        let store = self.store();
        let mut mutation =
            PendingMutation::begin(store, kind, notification_id, patch, self.inner.in_flight.clone());

        match request.await {
            Ok(()) => {
                mutation.confirm()?;
                info!(
                    mutation = %kind,
                    notification_id = ?mutation.notification_id(),
                    duration_ms = mutation.elapsed_ms(),
                    "Mutation confirmed"
                );
                self.inner.events.emit(NotificationEvent::MutationConfirmed {
                    mutation: kind,
                    notification_id: mutation.notification_id().map(str::to_string),
                });
                self.reconcile().await;
                Ok(MutationOutcome::Confirmed)
            }
            Err(e) if e.kind() == ErrorKind::Conflict => {
                mutation.confirm()?;
                debug!(
                    mutation = %kind,
                    notification_id = ?mutation.notification_id(),
                    error = %e,
                    "Mutation target already resolved server-side"
                );
                self.inner.events.emit(NotificationEvent::MutationResolved {
                    mutation: kind,
                    notification_id: mutation.notification_id().map(str::to_string),
                });
                self.reconcile().await;
                Ok(MutationOutcome::AlreadyResolved)
            }
            Err(e) => {
                let resync = self.inner.engine.resync().await;
                let reverted = mutation.roll_back(store)?;
                warn!(
                    mutation = %kind,
                    notification_id = ?mutation.notification_id(),
                    error = %e,
                    resynced = resync.is_ok(),
                    reverted,
                    duration_ms = mutation.elapsed_ms(),
                    "Mutation failed, optimistic change rolled back"
                );
                self.inner.events.emit(NotificationEvent::MutationRolledBack {
                    mutation: kind,
                    notification_id: mutation.notification_id().map(str::to_string),
                    error: e.to_string(),
                });
                // A failed resync already reported its own 401.
                let resync_expired =
                    matches!(&resync, Err(r) if r.kind() == ErrorKind::Authentication);
                if e.kind() == ErrorKind::Authentication && !resync_expired {
                    self.inner.events.emit(NotificationEvent::SessionExpired);
                }
                Ok(MutationOutcome::RolledBack { error: e })
            }
        }
    }

    /// Post-mutation resync. Failure is left to the next poll tick.
    async fn reconcile(&self) {
        if let Err(e) = self.inner.engine.resync().await {
            debug!(error = %e, "Post-mutation resync failed, next poll will reconcile");
        }
    }
}
