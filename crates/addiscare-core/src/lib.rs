//! # addiscare-core
//!
//! Core types, traits, and abstractions for AddisCare notifications.
//!
//! This crate provides the notification data model, the error taxonomy shared
//! by every notification component, the [`NotificationApi`] trait that is the
//! only seam to the REST backend, and the event bus used to surface sync and
//! mutation outcomes. It performs no I/O of its own.

pub mod defaults;
pub mod error;
pub mod events;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, FieldError, Result};
pub use events::{EventBus, EventEnvelope, MutationKind, NotificationEvent};
pub use models::*;
pub use traits::*;
