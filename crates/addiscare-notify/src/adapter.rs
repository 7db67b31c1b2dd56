//! Presentation adapters: thin views over the shared store.
//!
//! Adapters read through [`NotificationStore::snapshot`] / `subscribe` and
//! write only through the [`MutationCoordinator`]. None of them talks to the
//! backend directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use addiscare_core::{defaults, Notification, Result};
use tracing::debug;

use crate::coordinator::{MutationCoordinator, MutationOutcome};
use crate::store::{NotificationSnapshot, NotificationStore, Subscription, SyncFailure};

/// What a notification surface should render.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Nothing fetched yet.
    Loading,
    /// The last fetch failed; `snapshot` holds the stale data to show under
    /// an error banner.
    Error {
        snapshot: Arc<NotificationSnapshot>,
        error: SyncFailure,
    },
    Ready { snapshot: Arc<NotificationSnapshot> },
}

impl ViewState {
    pub fn from_snapshot(snapshot: Arc<NotificationSnapshot>) -> Self {
        match snapshot.last_error.clone() {
            Some(error) => Self::Error { snapshot, error },
            None if !snapshot.has_synced() => Self::Loading,
            None => Self::Ready { snapshot },
        }
    }

    /// Snapshot to render, if any.
    pub fn snapshot(&self) -> Option<&Arc<NotificationSnapshot>> {
        match self {
            Self::Loading => None,
            Self::Error { snapshot, .. } | Self::Ready { snapshot } => Some(snapshot),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Asks the user to confirm a permanent delete.
pub trait ConfirmDelete {
    /// `notification` is the item as currently displayed, when known.
    fn confirm_delete(&self, notification_id: &str, notification: Option<&Notification>) -> bool;
}

impl<F> ConfirmDelete for F
where
    F: Fn(&str, Option<&Notification>) -> bool,
{
    fn confirm_delete(&self, notification_id: &str, notification: Option<&Notification>) -> bool {
        self(notification_id, notification)
    }
}

/// Proof that the user agreed to delete one notification.
///
/// Only [`DeleteConfirmation::obtain`] creates one, so
/// [`MutationCoordinator::remove`] cannot be reached without asking first.
#[derive(Debug)]
pub struct DeleteConfirmation {
    notification_id: String,
}

impl DeleteConfirmation {
    /// Ask `confirm`; `None` when the user declines.
    pub fn obtain(
        notification_id: impl Into<String>,
        notification: Option<&Notification>,
        confirm: &dyn ConfirmDelete,
    ) -> Option<Self> {
        let notification_id = notification_id.into();
        if confirm.confirm_delete(&notification_id, notification) {
            Some(Self { notification_id })
        } else {
            debug!(notification_id = %notification_id, "Delete declined");
            None
        }
    }

    pub fn notification_id(&self) -> &str {
        &self.notification_id
    }

    pub(crate) fn into_notification_id(self) -> String {
        self.notification_id
    }
}

/// Badge text for an unread count: hidden at zero, capped at "99+".
pub fn badge_label(unread_count: u64) -> Option<String> {
    match unread_count {
        0 => None,
        n if n > defaults::BADGE_MAX => Some(format!("{}+", defaults::BADGE_MAX)),
        n => Some(n.to_string()),
    }
}

/// Header bell: unread badge plus a dropdown with the newest items.
#[derive(Clone)]
pub struct HeaderBadge {
    coordinator: MutationCoordinator,
    open: Arc<AtomicBool>,
}

impl HeaderBadge {
    pub fn new(coordinator: MutationCoordinator) -> Self {
        Self {
            coordinator,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    fn store(&self) -> &Arc<NotificationStore> {
        self.coordinator.store()
    }

    pub fn view(&self) -> ViewState {
        ViewState::from_snapshot(self.store().snapshot())
    }

    pub fn label(&self) -> Option<String> {
        badge_label(self.store().snapshot().unread_count)
    }

    /// Newest items shown in the dropdown.
    pub fn preview(&self) -> Vec<Notification> {
        self.store()
            .snapshot()
            .items
            .iter()
            .take(defaults::DROPDOWN_PREVIEW)
            .cloned()
            .collect()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Open the dropdown. Seeing the notifications marks them all read.
    pub async fn open_panel(&self) -> Result<MutationOutcome> {
        self.open.store(true, Ordering::SeqCst);
        self.coordinator.panel_opened().await
    }

    pub fn close_panel(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Call `render` with the new badge label whenever it changes.
    pub fn on_change<F>(&self, render: F) -> Subscription
    where
        F: Fn(Option<String>) + Send + Sync + 'static,
    {
        let last = std::sync::Mutex::new(self.label());
        self.store().subscribe(move |snap| {
            let label = badge_label(snap.unread_count);
            let mut last = last.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if *last != label {
                *last = label.clone();
                render(label);
            }
        })
    }
}

/// List filter on the notifications page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Unread,
    Read,
}

impl Filter {
    pub fn matches(&self, notification: &Notification) -> bool {
        match self {
            Self::All => true,
            Self::Unread => !notification.read,
            Self::Read => notification.read,
        }
    }
}

/// Full notification list with per-item actions and an error banner.
pub struct NotificationsPage {
    coordinator: MutationCoordinator,
    filter: Filter,
    /// Failures up to this sequence number were dismissed by the user.
    dismissed_seq: Option<u64>,
}

impl NotificationsPage {
    pub fn new(coordinator: MutationCoordinator) -> Self {
        Self {
            coordinator,
            filter: Filter::All,
            dismissed_seq: None,
        }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// View state, with a dismissed error shown as ready.
    pub fn view(&self) -> ViewState {
        match ViewState::from_snapshot(self.coordinator.store().snapshot()) {
            ViewState::Error { snapshot, error }
                if self.dismissed_seq.is_some_and(|seq| error.seq <= seq) =>
            {
                if snapshot.has_synced() {
                    ViewState::Ready { snapshot }
                } else {
                    ViewState::Loading
                }
            }
            view => view,
        }
    }

    /// Items passing the current filter, newest first.
    pub fn items(&self) -> Vec<Notification> {
        self.coordinator
            .store()
            .snapshot()
            .items
            .iter()
            .filter(|n| self.filter.matches(n))
            .cloned()
            .collect()
    }

    /// Banner text while an undismissed fetch error is showing.
    pub fn error_banner(&self) -> Option<String> {
        match self.view() {
            ViewState::Error { error, .. } => Some(error.error.to_string()),
            _ => None,
        }
    }

    /// Hide the banner until a newer failure occurs.
    pub fn dismiss_error(&mut self) {
        if let Some(failure) = &self.coordinator.store().snapshot().last_error {
            self.dismissed_seq = Some(failure.seq);
        }
    }

    /// Banner retry action.
    pub async fn retry(&self) -> Result<()> {
        self.coordinator.refresh().await
    }

    pub async fn mark_read(&self, id: &str) -> Result<MutationOutcome> {
        self.coordinator.mark_one_read(id).await
    }

    pub async fn mark_all_read(&self) -> Result<MutationOutcome> {
        self.coordinator.mark_all_read().await
    }

    /// Delete after confirmation. Declining sends nothing.
    pub async fn delete(&self, id: &str, confirm: &dyn ConfirmDelete) -> Result<MutationOutcome> {
        let snapshot = self.coordinator.store().snapshot();
        match DeleteConfirmation::obtain(id, snapshot.get(id), confirm) {
            Some(confirmation) => self.coordinator.remove(confirmation).await,
            None => Ok(MutationOutcome::Skipped),
        }
    }

    pub async fn hide(&self, id: &str) -> Result<MutationOutcome> {
        self.coordinator.hide(id).await
    }
}
