//! Commit cadence and the consecutive-failure ceiling

use snapper_types::{SnapperError, SnapperResult};
use std::time::{Duration, Instant};
use tracing::warn;

/// Decides when to commit and when persistence failures become fatal
#[derive(Debug, Clone)]
pub struct CommitTracker {
    interval: Duration,
    failure_limit: u32,
    consecutive_failures: u32,
    total_failures: u64,
    last_commit: Instant,
}

impl CommitTracker {
    /// Commit at most every `interval` (snapshots always), fail after
    /// more than `failure_limit` consecutive failures
    pub fn new(interval: Duration, failure_limit: u32) -> Self {
        Self {
            interval,
            failure_limit,
            consecutive_failures: 0,
            total_failures: 0,
            last_commit: Instant::now(),
        }
    }

    /// Whether the record just accepted should be committed now
    pub fn should_commit(&self, is_snapshot: bool, now: Instant) -> bool {
        is_snapshot || now.saturating_duration_since(self.last_commit) >= self.interval
    }

    /// A commit succeeded
    pub fn record_success(&mut self, now: Instant) {
        self.consecutive_failures = 0;
        self.last_commit = now;
    }

    /// An accept or commit failed; errors once the ceiling is exceeded
    pub fn record_failure(&mut self, message: &str) -> SnapperResult<()> {
        self.consecutive_failures += 1;
        self.total_failures += 1;

        if self.consecutive_failures > self.failure_limit {
            return Err(SnapperError::PersistenceWrite {
                consecutive: self.consecutive_failures,
                limit: self.failure_limit,
                message: message.to_string(),
            });
        }

        warn!(
            "Persistence failure, {} in a row (limit {}): {}",
            self.consecutive_failures, self.failure_limit, message
        );
        Ok(())
    }

    /// Failures since the last successful commit
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Failures over the session's lifetime
    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Time of the last successful commit
    pub fn last_commit(&self) -> Instant {
        self.last_commit
    }
}
