//! Configuration for the notification session.

use std::time::Duration;

use addiscare_core::defaults;

/// Tuning for store retention and the polling engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum notifications kept in the store.
    pub retention_cap: usize,
    /// Page size requested per poll.
    pub page_limit: usize,
    /// Event bus buffer size.
    pub event_capacity: usize,
    /// Whether to poll at all. Disabled sessions still serve manual refreshes.
    pub enabled: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            retention_cap: defaults::RETENTION_CAP,
            page_limit: defaults::PAGE_LIMIT,
            event_capacity: defaults::EVENT_BUS_CAPACITY,
            enabled: true,
        }
    }
}

impl NotifyConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTIFY_ENABLED` | `true` | Enable/disable background polling |
    /// | `NOTIFY_POLL_INTERVAL_MS` | `30000` | Polling interval |
    /// | `NOTIFY_RETENTION_CAP` | `50` | Notifications kept in memory |
    /// | `NOTIFY_PAGE_LIMIT` | `50` | Page size per poll (≤ retention cap) |
    pub fn from_env() -> Self {
        let enabled = std::env::var("NOTIFY_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("NOTIFY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::POLL_INTERVAL_MS);

        let retention_cap = std::env::var("NOTIFY_RETENTION_CAP")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::RETENTION_CAP);

        let page_limit = std::env::var("NOTIFY_PAGE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(retention_cap);

        Self {
            poll_interval_ms,
            retention_cap,
            page_limit,
            event_capacity: defaults::EVENT_BUS_CAPACITY,
            enabled,
        }
        .normalized()
    }

    /// Clamp values into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.poll_interval_ms = self.poll_interval_ms.max(defaults::POLL_INTERVAL_MIN_MS);
        self.retention_cap = self.retention_cap.max(1);
        self.page_limit = self.page_limit.clamp(1, self.retention_cap);
        self.event_capacity = self.event_capacity.max(1);
        self
    }

    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the retention cap; the page limit follows it.
    pub fn with_retention_cap(mut self, cap: usize) -> Self {
        self.retention_cap = cap;
        self.page_limit = cap;
        self
    }

    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "NOTIFY_ENABLED",
        "NOTIFY_POLL_INTERVAL_MS",
        "NOTIFY_RETENTION_CAP",
        "NOTIFY_PAGE_LIMIT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_notify_config_default() {
        let config = NotifyConfig::default();
        assert_eq!(config.poll_interval_ms, 30_000);
        assert_eq!(config.retention_cap, 50);
        assert_eq!(config.page_limit, 50);
        assert!(config.enabled);
    }

    #[test]
    fn test_notify_config_builder() {
        let config = NotifyConfig::default()
            .with_poll_interval(20_000)
            .with_retention_cap(20)
            .with_enabled(false);
        assert_eq!(config.poll_interval(), Duration::from_secs(20));
        assert_eq!(config.retention_cap, 20);
        assert_eq!(config.page_limit, 20);
        assert!(!config.enabled);
    }

    #[test]
    fn test_normalized_clamps() {
        let config = NotifyConfig::default()
            .with_poll_interval(10)
            .with_retention_cap(0)
            .with_page_limit(500)
            .normalized();
        assert_eq!(config.poll_interval_ms, 1_000);
        assert_eq!(config.retention_cap, 1);
        assert_eq!(config.page_limit, 1);
    }

    #[test]
    fn test_page_limit_never_exceeds_cap() {
        let config = NotifyConfig::default()
            .with_retention_cap(30)
            .with_page_limit(100)
            .normalized();
        assert_eq!(config.page_limit, 30);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        assert_eq!(NotifyConfig::from_env(), NotifyConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_disabled_and_page_follows_cap() {
        clear_env();
        std::env::set_var("NOTIFY_ENABLED", "0");
        std::env::set_var("NOTIFY_POLL_INTERVAL_MS", "15000");
        std::env::set_var("NOTIFY_RETENTION_CAP", "20");

        let config = NotifyConfig::from_env();
        clear_env();

        assert!(!config.enabled);
        assert_eq!(config.poll_interval_ms, 15_000);
        assert_eq!(config.retention_cap, 20);
        assert_eq!(config.page_limit, 20);
    }

    #[test]
    #[serial]
    fn test_from_env_clamps_and_ignores_garbage() {
        clear_env();
        std::env::set_var("NOTIFY_ENABLED", "false");
        std::env::set_var("NOTIFY_POLL_INTERVAL_MS", "5");
        std::env::set_var("NOTIFY_RETENTION_CAP", "many");
        std::env::set_var("NOTIFY_PAGE_LIMIT", "500");

        let config = NotifyConfig::from_env();
        clear_env();

        assert!(!config.enabled);
        assert_eq!(config.poll_interval_ms, 1_000);
        assert_eq!(config.retention_cap, 50);
        assert_eq!(config.page_limit, 50);
    }
}
