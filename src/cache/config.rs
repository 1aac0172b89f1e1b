//! Cache presets.

use std::time::Duration;

/// Capacity and expiry for one named cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_capacity: u64,
    pub ttl: Option<Duration>,
    pub tti: Option<Duration>,
}

impl CacheConfig {
    /// Conversation-like data: evicted when the user goes quiet.
    pub fn session_data() -> Self {
        Self {
            max_capacity: 20_000,
            ttl: Some(Duration::from_secs(1800)), // 30 minutes max
            tti: Some(Duration::from_secs(300)),  // 5 minutes idle
        }
    }

    /// Rarely changing identity data.
    pub fn cold_data() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(3600)),
            tti: None,
        }
    }

    /// Short-lived results of remote checks.
    pub fn short_lived(ttl: Duration) -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(ttl),
            tti: None,
        }
    }
}
