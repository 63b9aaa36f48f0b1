//! Request cache configuration.

use std::time::Duration;

pub const DEFAULT_IDLE_EVICTION_SECS: u64 = 60;
pub const DEFAULT_JANITOR_INTERVAL_SECS: u64 = 30;

/// Request cache tuning, sourced from the `[cache]` settings section.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry with no subscribers survives before collection.
    pub idle_eviction: Duration,
    /// Cadence of the background janitor; `None` disables it.
    pub janitor_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_eviction: Duration::from_secs(DEFAULT_IDLE_EVICTION_SECS),
            janitor_interval: Some(Duration::from_secs(DEFAULT_JANITOR_INTERVAL_SECS)),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            idle_eviction: settings.idle_eviction,
            janitor_interval: settings.janitor_interval,
        }
    }
}
