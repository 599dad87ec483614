//! Configuration options for probing

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Default delay between reconnect attempts
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(500);

/// Default bound on a single connect attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Retry and reconnect policy for tag operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Extra authentication attempts for a key that was rejected
    pub retry_authentication: u32,

    /// Wait for a lost tag to come back instead of aborting
    pub auto_reconnect: bool,

    /// Delay between reconnect attempts
    #[serde(rename = "reconnect_interval_ms", deserialize_with = "millis")]
    pub reconnect_interval: Duration,

    /// Bound on a single connect attempt
    #[serde(rename = "connect_timeout_ms", deserialize_with = "millis")]
    pub connect_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            retry_authentication: 0,
            auto_reconnect: false,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of extra authentication attempts
    pub const fn with_retry_authentication(mut self, retries: u32) -> Self {
        self.retry_authentication = retries;
        self
    }

    /// Set whether to wait for a lost tag
    pub const fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = auto_reconnect;
        self
    }

    /// Set the delay between reconnect attempts
    pub const fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the bound on a single connect attempt
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Total authentication attempts per key and role
    pub const fn auth_attempts(&self) -> u32 {
        self.retry_authentication.saturating_add(1)
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
