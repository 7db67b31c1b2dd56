//! Lifecycle of a single optimistic mutation: `pending → confirmed | rolled_back`.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use addiscare_core::{Error, MutationKind, Result};

use crate::store::{NotificationStore, Patch, PatchToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Optimistic patch applied, server request outstanding.
    Pending,
    /// Server accepted (or the target was already in the desired state).
    Confirmed,
    /// Server refused; optimistic state discarded.
    RolledBack,
}

impl MutationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// An optimistic mutation awaiting its server response.
///
/// Holds the undo token of its patch until settled. Counted in the
/// coordinator's in-flight total until dropped.
#[must_use = "a pending mutation must be confirmed or rolled back"]
pub struct PendingMutation {
    kind: MutationKind,
    notification_id: Option<String>,
    token: Option<PatchToken>,
    state: MutationState,
    started: Instant,
    in_flight: Arc<AtomicUsize>,
}

impl PendingMutation {
    /// Apply `patch` to the store and open the mutation.
    pub fn begin(
        store: &NotificationStore,
        kind: MutationKind,
        notification_id: Option<String>,
        patch: Patch,
        in_flight: Arc<AtomicUsize>,
    ) -> Self {
        let token = store.apply_optimistic_patch(patch);
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            kind,
            notification_id,
            token: Some(token),
            state: MutationState::Pending,
            started: Instant::now(),
            in_flight,
        }
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn notification_id(&self) -> Option<&str> {
        self.notification_id.as_deref()
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Whether the optimistic patch changed anything locally.
    pub fn changed_locally(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_noop())
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Server accepted: keep the optimistic state and discard the undo token.
    pub fn confirm(&mut self) -> Result<()> {
        self.transition(MutationState::Confirmed)?;
        self.token = None;
        Ok(())
    }

    /// Server refused: undo the optimistic patch.
    ///
    /// Returns whether the store was changed. When a server snapshot already
    /// replaced the optimistic state there is nothing left to undo.
    pub fn roll_back(&mut self, store: &NotificationStore) -> Result<bool> {
        self.transition(MutationState::RolledBack)?;
        Ok(self.token.take().is_some_and(|token| store.revert(token)))
    }

    fn transition(&mut self, to: MutationState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::Internal(format!(
                "{} mutation already {}, cannot become {}",
                self.kind, self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }
}

impl Drop for PendingMutation {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
