//! # addiscare-client
//!
//! REST client for the AddisCare notification API.
//!
//! [`NotificationClient`] implements [`addiscare_core::NotificationApi`] over
//! `reqwest`, attaching the session's bearer token and mapping HTTP statuses
//! onto the shared error taxonomy (401 → `Unauthorized`, 404/409 → conflict,
//! 400 → `Validation` with field errors, 5xx/timeouts → transient).
//!
//! # Example
//!
//! ```rust,no_run
//! use addiscare_client::{ClientConfig, NotificationClient};
//! use addiscare_core::{ListQuery, NotificationApi};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = NotificationClient::new(ClientConfig::from_env()).unwrap();
//!     let unread = client.unread_count().await.unwrap();
//!     let recent = client.list(&ListQuery::with_limit(10)).await.unwrap();
//!     println!("{} unread, {} recent", unread, recent.len());
//! }
//! ```

pub mod client;
pub mod config;
mod wire;

pub use client::NotificationClient;
pub use config::ClientConfig;
