//! Notification store: the single in-memory source of truth for every
//! notification surface of one authenticated session.
//!
//! Writes come from two places only:
//!
//! - the sync engine, which replaces the whole snapshot with server data
//!   ([`NotificationStore::apply_server_snapshot`]) or records a failed fetch;
//! - the mutation coordinator, which applies an optimistic
//!   [`Patch`] immediately before issuing the matching server request.
//!
//! `unread_count` is fetched independently from the server and covers
//! notifications beyond the retained page, so it is never recomputed from
//! `items`. Optimistic patches adjust it locally and the next server snapshot
//! overrides whatever they did.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, trace};

use addiscare_core::{Error, Notification};

/// A failed fetch, kept on the snapshot until the next successful sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub error: Error,
    pub at: DateTime<Utc>,
    /// Distinguishes successive failures (store version when recorded).
    pub seq: u64,
}

/// Immutable view of the store handed to readers and listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSnapshot {
    /// Newest first, at most the retention cap.
    pub items: Vec<Notification>,
    /// Server-authoritative unread count, optimistically adjusted between syncs.
    pub unread_count: u64,
    /// A fetch is in flight.
    pub is_loading: bool,
    /// Error of the last fetch if it failed; `items` are then stale.
    pub last_error: Option<SyncFailure>,
    /// Time of the last successful server snapshot.
    pub synced_at: Option<DateTime<Utc>>,
    /// Incremented on every change.
    pub version: u64,
}

impl NotificationSnapshot {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            unread_count: 0,
            is_loading: false,
            last_error: None,
            synced_at: None,
            version: 0,
        }
    }

    /// True once at least one server snapshot has been applied.
    pub fn has_synced(&self) -> bool {
        self.synced_at.is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    /// Unread items among the retained page.
    pub fn unread_items(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter().filter(|n| n.is_unread())
    }
}

/// The optimistic changes a mutation may apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    MarkRead(String),
    MarkAllRead,
    Remove(String),
}

#[derive(Debug)]
enum Undo {
    /// Items flipped to read, and how far the unread count was lowered.
    Read { ids: Vec<String>, unread_delta: u64 },
    Removed {
        index: usize,
        item: Notification,
        unread_delta: u64,
    },
    Nothing,
}

/// Receipt for an optimistic patch, used to revert it if the server refuses.
#[derive(Debug)]
#[must_use = "a patch token is needed to revert the optimistic change"]
pub struct PatchToken {
    epoch: u64,
    undo: Undo,
}

impl PatchToken {
    /// Whether the patch changed anything locally.
    pub fn is_noop(&self) -> bool {
        matches!(self.undo, Undo::Nothing)
    }
}

type Listener = Arc<dyn Fn(&NotificationSnapshot) + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    fn entries(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) {
        self.entries().retain(|(entry_id, _)| *entry_id != id);
    }
}

/// Handle returned by [`NotificationStore::subscribe`]. The listener is
/// removed when this is dropped or [`Subscription::unsubscribe`] is called.
#[must_use = "dropping a subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

struct StoreState {
    snapshot: NotificationSnapshot,
    /// Bumped whenever server data replaces local state; patch tokens from an
    /// older epoch can no longer be reverted.
    epoch: u64,
}

/// Client-side notification cache for one session.
pub struct NotificationStore {
    state: Mutex<StoreState>,
    watch_tx: watch::Sender<Arc<NotificationSnapshot>>,
    listeners: Arc<ListenerRegistry>,
    /// Version last handed to listeners. Held while listeners run.
    delivered: Mutex<u64>,
    retention_cap: usize,
}

impl NotificationStore {
    /// Create an empty store retaining at most `retention_cap` items.
    pub fn new(retention_cap: usize) -> Self {
        let snapshot = NotificationSnapshot::empty();
        let (watch_tx, _) = watch::channel(Arc::new(snapshot.clone()));
        Self {
            state: Mutex::new(StoreState { snapshot, epoch: 0 }),
            watch_tx,
            listeners: Arc::new(ListenerRegistry::default()),
            delivered: Mutex::new(0),
            retention_cap: retention_cap.max(1),
        }
    }

    pub fn retention_cap(&self) -> usize {
        self.retention_cap
    }

    /// Current snapshot. Synchronous, no side effects.
    pub fn snapshot(&self) -> Arc<NotificationSnapshot> {
        self.watch_tx.borrow().clone()
    }

    /// Register a listener invoked after every change.
    ///
    /// Listeners run synchronously once the new state is in place; keep them
    /// cheap. Deliveries never overlap and never go backwards: when writers
    /// race, the writer already delivering hands the newest snapshot to every
    /// listener and intermediate versions may be skipped. No ordering between
    /// listeners is promised.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&NotificationSnapshot) + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.entries().push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Async alternative to [`subscribe`](Self::subscribe).
    pub fn watch(&self) -> watch::Receiver<Arc<NotificationSnapshot>> {
        self.watch_tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.entries().len()
    }

    /// Replace items and unread count wholesale with server data.
    ///
    /// Any optimistic state is discarded, including an optimistically lowered
    /// unread count, and any recorded fetch error is cleared.
    pub fn apply_server_snapshot(&self, mut items: Vec<Notification>, unread_count: u64) {
        items.truncate(self.retention_cap);
        self.write(|state| {
            state.epoch += 1;
            let snap = &mut state.snapshot;
            snap.items = items;
            snap.unread_count = unread_count;
            snap.is_loading = false;
            snap.last_error = None;
            snap.synced_at = Some(Utc::now());
            debug!(
                unread_count,
                item_count = snap.items.len(),
                "Applied server snapshot"
            );
        });
    }

    /// Apply an optimistic change and return the token that reverts it.
    pub fn apply_optimistic_patch(&self, patch: Patch) -> PatchToken {
        let mut token = None;
        self.write_if(|state| {
            let epoch = state.epoch;
            let snap = &mut state.snapshot;
            let undo = match &patch {
                Patch::MarkRead(id) => match snap.items.iter_mut().find(|n| &n.id == id) {
                    Some(item) if item.is_unread() => {
                        item.read = true;
                        snap.unread_count = snap.unread_count.saturating_sub(1);
                        Undo::Read {
                            ids: vec![id.clone()],
                            unread_delta: 1,
                        }
                    }
                    _ => Undo::Nothing,
                },
                Patch::MarkAllRead => {
                    let ids: Vec<String> = snap
                        .items
                        .iter_mut()
                        .filter(|n| n.is_unread())
                        .map(|n| {
                            n.read = true;
                            n.id.clone()
                        })
                        .collect();
                    let unread_delta = snap.unread_count;
                    snap.unread_count = 0;
                    if ids.is_empty() && unread_delta == 0 {
                        Undo::Nothing
                    } else {
                        Undo::Read { ids, unread_delta }
                    }
                }
                Patch::Remove(id) => match snap.items.iter().position(|n| &n.id == id) {
                    Some(index) => {
                        let item = snap.items.remove(index);
                        let unread_delta = if item.is_unread() && snap.unread_count > 0 {
                            snap.unread_count -= 1;
                            1
                        } else {
                            0
                        };
                        Undo::Removed {
                            index,
                            item,
                            unread_delta,
                        }
                    }
                    None => Undo::Nothing,
                },
            };
            let changed = !matches!(undo, Undo::Nothing);
            debug!(
                ?patch,
                changed,
                unread_count = snap.unread_count,
                "Applied optimistic patch"
            );
            token = Some(PatchToken { epoch, undo });
            changed
        });
        token.unwrap_or(PatchToken {
            epoch: 0,
            undo: Undo::Nothing,
        })
    }

    /// Revert an optimistic patch.
    ///
    /// Only possible while no server snapshot has landed since the patch; the
    /// restored values are then the ones the server itself last reported.
    /// Returns whether anything was reverted.
    pub fn revert(&self, token: PatchToken) -> bool {
        if token.is_noop() {
            return false;
        }
        let mut reverted = false;
        self.write_if(|state| {
            if state.epoch != token.epoch {
                debug!("Patch superseded by server snapshot, nothing to revert");
                return false;
            }
            let cap = self.retention_cap;
            let snap = &mut state.snapshot;
            match token.undo {
                Undo::Read { ids, unread_delta } => {
                    for item in snap.items.iter_mut().filter(|n| ids.contains(&n.id)) {
                        item.read = false;
                    }
                    snap.unread_count = snap.unread_count.saturating_add(unread_delta);
                }
                Undo::Removed {
                    index,
                    item,
                    unread_delta,
                } => {
                    let index = index.min(snap.items.len());
                    snap.items.insert(index, item);
                    snap.items.truncate(cap);
                    snap.unread_count = snap.unread_count.saturating_add(unread_delta);
                }
                Undo::Nothing => return false,
            }
            reverted = true;
            true
        });
        reverted
    }

    /// Mark a fetch as started.
    pub fn begin_loading(&self) {
        self.write_if(|state| {
            if state.snapshot.is_loading {
                return false;
            }
            state.snapshot.is_loading = true;
            true
        });
    }

    /// Mark a fetch as over without new data (discarded or cancelled).
    pub fn end_loading(&self) {
        self.write_if(|state| {
            if !state.snapshot.is_loading {
                return false;
            }
            state.snapshot.is_loading = false;
            true
        });
    }

    /// Record a failed fetch, keeping the last good items.
    pub fn record_error(&self, error: Error) {
        self.write(|state| {
            let snap = &mut state.snapshot;
            snap.is_loading = false;
            snap.last_error = Some(SyncFailure {
                error,
                at: Utc::now(),
                seq: snap.version + 1,
            });
        });
    }

    /// Empty the store after a confirmed logout.
    pub fn clear(&self) {
        self.write(|state| {
            state.epoch += 1;
            let version = state.snapshot.version;
            state.snapshot = NotificationSnapshot::empty();
            state.snapshot.version = version;
        });
    }

    fn write(&self, f: impl FnOnce(&mut StoreState)) {
        self.write_if(|state| {
            f(state);
            true
        });
    }

    /// Run a mutation; when it reports a change, publish and notify.
    fn write_if(&self, f: impl FnOnce(&mut StoreState) -> bool) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !f(&mut state) {
                return;
            }
            state.snapshot.version += 1;
            self.watch_tx.send_replace(Arc::new(state.snapshot.clone()));
        }
        self.deliver();
    }

    /// Hand the newest snapshot to listeners until none is left undelivered.
    ///
    /// Whoever holds `delivered` owns delivery. A writer that finds it taken
    /// (another thread, or a listener writing back into the store) returns at
    /// once; the owner re-checks the version before releasing for good.
    fn deliver(&self) {
        loop {
            let mut delivered = match self.delivered.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            let latest = self.snapshot();
            if latest.version <= *delivered {
                return;
            }
            *delivered = latest.version;

            let listeners: Vec<Listener> = self
                .listeners
                .entries()
                .iter()
                .map(|(_, l)| l.clone())
                .collect();
            trace!(
                listener_count = listeners.len(),
                version = latest.version,
                "Notifying store listeners"
            );
            for listener in listeners {
                listener(&latest);
            }
        }
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new(addiscare_core::defaults::RETENTION_CAP)
    }
}
