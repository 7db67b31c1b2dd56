//! In-memory notification backend for deterministic testing.
//!
//! Behaves like the REST backend for one user: unread count covers every
//! stored item, list returns the newest `limit`, mutations change the stored
//! records. Individual operations can be told to fail, and an artificial
//! latency can be added so tests can overlap calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let api = MockNotificationApi::new()
//!     .with_items(vec![Notification::new("1", "Hello", false)]);
//! api.fail("mark_read", Error::Request("offline".into()));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use addiscare_core::{
    BulkOutcome, BulkSendRequest, Error, ListQuery, Notification, NotificationApi, Result,
    SendNotificationRequest,
};

#[derive(Default)]
struct MockState {
    items: Vec<Notification>,
    failures: HashMap<&'static str, Error>,
    calls: Vec<String>,
    next_id: u64,
}

/// Mock backend shared between the code under test and the assertions.
#[derive(Clone, Default)]
pub struct MockNotificationApi {
    state: Arc<Mutex<MockState>>,
    latency: Duration,
}

impl MockNotificationApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the stored notifications (newest first).
    pub fn with_items(self, items: Vec<Notification>) -> Self {
        self.state().items = items;
        self
    }

    /// Delay every call by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every call to `op` fail with `error` until [`recover`](Self::recover).
    pub fn fail(&self, op: &'static str, error: Error) {
        self.state().failures.insert(op, error);
    }

    pub fn recover(&self, op: &'static str) {
        self.state().failures.remove(op);
    }

    /// Names of the operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.len()
    }

    pub fn items(&self) -> Vec<Notification> {
        self.state().items.clone()
    }

    /// Add a notification server-side, as if someone just sent it.
    pub fn push(&self, item: Notification) {
        self.state().items.insert(0, item);
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, op: &'static str) -> Result<()> {
        self.state().calls.push(op.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.state().failures.get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn find_mut<'a>(state: &'a mut MockState, id: &str) -> Result<&'a mut Notification> {
        state
            .items
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(format!("Notification {} not found", id)))
    }
}

#[async_trait]
impl NotificationApi for MockNotificationApi {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Notification>> {
        self.enter("list").await?;
        Ok(self.state().items.iter().take(query.limit).cloned().collect())
    }

    async fn unread_count(&self) -> Result<u64> {
        self.enter("unread_count").await?;
        Ok(self.state().items.iter().filter(|n| n.is_unread()).count() as u64)
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        self.enter("mark_read").await?;
        let mut state = self.state();
        Self::find_mut(&mut state, id)?.read = true;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<u64> {
        self.enter("mark_all_read").await?;
        let mut state = self.state();
        let mut count = 0;
        for item in state.items.iter_mut().filter(|n| n.is_unread()) {
            item.read = true;
            count += 1;
        }
        Ok(count)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.enter("delete").await?;
        let mut state = self.state();
        Self::find_mut(&mut state, id)?;
        state.items.retain(|n| n.id != id);
        Ok(())
    }

    async fn hide(&self, id: &str) -> Result<()> {
        self.enter("hide").await?;
        let mut state = self.state();
        Self::find_mut(&mut state, id)?;
        state.items.retain(|n| n.id != id);
        Ok(())
    }

    async fn send(&self, req: &SendNotificationRequest) -> Result<Notification> {
        self.enter("send").await?;
        let mut state = self.state();
        state.next_id += 1;
        let mut created = Notification::new(format!("sent-{}", state.next_id), &req.title, false);
        created.message = req.message.clone();
        created.report_id = req.report_id.clone();
        Ok(created)
    }

    async fn send_bulk(&self, _req: &BulkSendRequest) -> Result<BulkOutcome> {
        self.enter("send_bulk").await?;
        Ok(BulkOutcome {
            success: true,
            count: 3,
        })
    }
}
