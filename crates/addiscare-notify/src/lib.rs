//! # addiscare-notify
//!
//! Client-side notification state for one authenticated AddisCare session.
//!
//! This crate provides:
//! - A single notification store shared by every UI surface
//! - A polling sync engine that reconciles the store with the backend
//! - A mutation coordinator for optimistic mark-read, mark-all-read, delete and hide
//! - Thin presentation adapters (header badge, notifications page)
//! - An admin composer for individual and broadcast sends
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use addiscare_client::NotificationClient;
//! use addiscare_notify::{NotificationSession, NotifyConfig};
//!
//! let api = Arc::new(NotificationClient::from_env()?);
//! let session = NotificationSession::start(api, NotifyConfig::from_env())?;
//!
//! let badge = session.header_badge();
//! let _sub = badge.on_change(|label| println!("badge: {:?}", label));
//!
//! // Opening the dropdown marks everything read.
//! badge.open_panel().await?;
//!
//! // Stop polling and clear state.
//! session.logout().await;
//! ```

pub mod adapter;
pub mod compose;
pub mod config;
pub mod coordinator;
pub mod mutation;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
mod mock;

// Re-export core types
pub use addiscare_core::*;

pub use adapter::{
    badge_label, ConfirmDelete, DeleteConfirmation, Filter, HeaderBadge, NotificationsPage,
    ViewState,
};
pub use compose::NotificationComposer;
pub use config::NotifyConfig;
pub use coordinator::{MutationCoordinator, MutationOutcome};
pub use mutation::{MutationState, PendingMutation};
pub use session::NotificationSession;
pub use store::{NotificationSnapshot, NotificationStore, Patch, PatchToken, Subscription, SyncFailure};
pub use sync::{SyncEngine, SyncHandle};
