//! Bounded reconnection policy

use std::time::Duration;

/// Consecutive reconnect failures tolerated before a session fails
pub const DEFAULT_FAILURE_LIMIT: u32 = 5;

/// Fixed pause between reconnect attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// Fixed-delay reconnection with a hard ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Ceiling on consecutive reconnect failures
    pub failure_limit: u32,
    /// Delay after each failed reconnect
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            failure_limit: DEFAULT_FAILURE_LIMIT,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure ceiling
    pub fn with_failure_limit(mut self, limit: u32) -> Self {
        self.failure_limit = limit.max(1);
        self
    }

    /// Set the backoff delay
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether another attempt is allowed after `failures` consecutive failures
    pub fn should_retry(&self, failures: u32) -> bool {
        failures < self.failure_limit
    }
}
