//! Centralized default constants for AddisCare notifications.
//!
//! **This module is the single source of truth** for shared default values.
//! Config structs in the client and notify crates reference these constants
//! instead of defining their own magic numbers.

// =============================================================================
// SYNC
// =============================================================================

/// Poll interval for the notification sync engine (30 s).
pub const POLL_INTERVAL_MS: u64 = 30_000;

/// Lower bound for the poll interval; anything faster hammers the backend.
pub const POLL_INTERVAL_MIN_MS: u64 = 1_000;

/// Maximum notifications retained in the client store, newest first.
pub const RETENTION_CAP: usize = 50;

/// Page size requested from `GET /notifications`.
pub const PAGE_LIMIT: usize = RETENTION_CAP;

// =============================================================================
// EVENTS
// =============================================================================

/// Buffer size for the notification event bus.
pub const EVENT_BUS_CAPACITY: usize = 64;

// =============================================================================
// HTTP
// =============================================================================

/// Default REST base URL (backend mounts its routes under `/api`).
pub const API_BASE_URL: &str = "http://localhost:5000/api";

/// Request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// PRESENTATION
// =============================================================================

/// Badge counts above this render as `"99+"`.
pub const BADGE_MAX: u64 = 99;

/// Items shown in the header dropdown.
pub const DROPDOWN_PREVIEW: usize = 5;

// =============================================================================
// COMPOSER
// =============================================================================

/// Maximum notification title length accepted by the composer.
pub const TITLE_MAX_LEN: usize = 200;
