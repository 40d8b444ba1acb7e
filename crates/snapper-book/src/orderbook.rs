//! Per-pair book state machine
//!
//! # State Machine
//!
//! ```text
//! AwaitingSnapshot → Synced ↔ Desynchronized
//!                      ↑            │
//!                      └─ snapshot ─┘
//! ```
//!
//! Diffs are only applied in `Synced`. A checksum mismatch clears the book
//! and moves it to `Desynchronized`, where diffs are dropped until the next
//! snapshot arrives.

use crate::checksum::{compute_checksum, parse_checksum, ChecksumResult};
use crate::storage::{DepthLevel, TreeBook};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use snapper_types::{
    BookDiff, BookSnapshot, CanonicalPair, PriceLevel, RecordId, Side, SnapperError, FULL_DEPTH,
};
use thiserror::Error;

/// Book synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No snapshot applied yet
    #[default]
    AwaitingSnapshot,
    /// Snapshot applied, diffs flow normally
    Synced,
    /// Checksum failed, book cleared until the next snapshot
    Desynchronized,
}

/// Result of applying an event to a book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Snapshot replaced the book
    Snapshot,
    /// Diff was applied
    Updated,
    /// Diff arrived without a snapshot and was dropped
    Dropped,
}

/// Errors raised while applying a diff
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// Reconstructed book disagrees with the venue checksum
    #[error("Checksum mismatch for {pair}: expected {expected}, computed {computed}")]
    ChecksumMismatch {
        pair: CanonicalPair,
        expected: u32,
        computed: u32,
    },

    /// Checksum text is not an unsigned 32-bit integer
    #[error("Unreadable checksum for {pair}: {text}")]
    InvalidChecksum { pair: CanonicalPair, text: String },
}

impl From<BookError> for SnapperError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::ChecksumMismatch {
                pair,
                expected,
                computed,
            } => SnapperError::desync(pair.to_string(), expected, computed),
            BookError::InvalidChecksum { .. } => SnapperError::MalformedMessage(err.to_string()),
        }
    }
}

/// Canonical book for one (venue, pair)
#[derive(Debug, Clone)]
pub struct OrderBookState {
    pair: CanonicalPair,
    storage: TreeBook,
    state: SyncState,
    /// Levels kept per side; `None` keeps everything
    max_depth: Option<usize>,
    last_snapshot_id: Option<RecordId>,
    last_external_time: Option<DateTime<Utc>>,
    last_checksum: Option<u32>,
}

impl OrderBookState {
    /// Create an empty book awaiting its first snapshot
    pub fn new(pair: CanonicalPair) -> Self {
        Self {
            pair,
            storage: TreeBook::new(),
            state: SyncState::AwaitingSnapshot,
            max_depth: None,
            last_snapshot_id: None,
            last_external_time: None,
            last_checksum: None,
        }
    }

    /// Create a book that keeps at most `depth` levels per side
    pub fn with_depth(pair: CanonicalPair, depth: usize) -> Self {
        Self {
            max_depth: Some(depth),
            ..Self::new(pair)
        }
    }

    /// Get the pair
    pub fn pair(&self) -> &CanonicalPair {
        &self.pair
    }

    /// Get the current state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Returns true once a snapshot is applied and no desync has happened since
    pub fn has_snapshot(&self) -> bool {
        self.state == SyncState::Synced
    }

    /// Maximum depth per side, if any
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Depth value stored on snapshot records (`-1` for the full book)
    pub fn level_depth(&self) -> i32 {
        self.max_depth
            .and_then(|d| i32::try_from(d).ok())
            .unwrap_or(FULL_DEPTH)
    }

    /// Identifier of the snapshot the current levels descend from
    pub fn last_snapshot_id(&self) -> Option<RecordId> {
        self.last_snapshot_id
    }

    /// Venue time of the last applied event
    pub fn last_external_time(&self) -> Option<DateTime<Utc>> {
        self.last_external_time
    }

    /// Last checksum that validated
    pub fn last_checksum(&self) -> Option<u32> {
        self.last_checksum
    }

    // ========================================================================
    // Apply
    // ========================================================================

    /// Replace both sides with the snapshot's levels
    pub fn apply_snapshot(
        &mut self,
        snapshot: &BookSnapshot,
        snapshot_id: Option<RecordId>,
    ) -> ApplyOutcome {
        self.storage.clear();

        for level in &snapshot.bids {
            self.storage.apply(Side::Bid, level);
        }
        for level in &snapshot.asks {
            self.storage.apply(Side::Ask, level);
        }
        self.truncate();

        self.state = SyncState::Synced;
        self.last_snapshot_id = snapshot_id;
        self.last_checksum = None;
        if snapshot.external_time.is_some() {
            self.last_external_time = snapshot.external_time;
        }

        ApplyOutcome::Snapshot
    }

    /// Apply level overrides, then validate the checksum if one was sent
    pub fn apply_diff(&mut self, diff: &BookDiff) -> Result<ApplyOutcome, BookError> {
        if !self.has_snapshot() {
            return Ok(ApplyOutcome::Dropped);
        }

        // Reject unreadable checksums before touching any level
        let expected = match diff.checksum.as_deref() {
            Some(text) => Some(parse_checksum(text).ok_or_else(|| BookError::InvalidChecksum {
                pair: self.pair.clone(),
                text: text.to_string(),
            })?),
            None => None,
        };

        for level in &diff.bid_overrides {
            self.storage.apply(Side::Bid, level);
        }
        for level in &diff.ask_overrides {
            self.storage.apply(Side::Ask, level);
        }
        self.truncate();

        if diff.external_time.is_some() {
            self.last_external_time = diff.external_time;
        }

        if let Some(expected) = expected {
            self.validate_checksum(expected)?;
        }

        Ok(ApplyOutcome::Updated)
    }

    fn truncate(&mut self) {
        if let Some(depth) = self.max_depth {
            self.storage.truncate(depth);
        }
    }

    /// Compute the checksum of the current levels
    pub fn checksum(&self) -> u32 {
        compute_checksum(self.storage.bids(), self.storage.asks())
    }

    fn validate_checksum(&mut self, expected: u32) -> Result<(), BookError> {
        let result = ChecksumResult::new(self.checksum(), expected);

        if !result.is_valid() {
            self.desync();
            return Err(BookError::ChecksumMismatch {
                pair: self.pair.clone(),
                expected: result.expected,
                computed: result.computed,
            });
        }

        self.last_checksum = Some(expected);
        Ok(())
    }

    /// Drop all levels and wait for a fresh snapshot
    ///
    /// The stale snapshot reference goes with the levels, so records taken
    /// while desynchronized do not point at it.
    pub fn desync(&mut self) {
        self.storage.clear();
        self.last_checksum = None;
        self.last_snapshot_id = None;
        self.state = SyncState::Desynchronized;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Get the best bid
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.storage.best_bid()
    }

    /// Get the best ask
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.storage.best_ask()
    }

    /// Get the spread (ask - bid)
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Get the mid price ((ask + bid) / 2)
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some((ask.price + bid.price) / Decimal::TWO),
            _ => None,
        }
    }

    /// Cumulative depth of the top N levels on one side
    pub fn depth(&self, side: Side, n: usize) -> Vec<DepthLevel> {
        self.storage.depth(side, n)
    }

    /// Iterator over bids (best first)
    pub fn bids(&self) -> impl Iterator<Item = &PriceLevel> {
        self.storage.bids()
    }

    /// Iterator over asks (best first)
    pub fn asks(&self) -> impl Iterator<Item = &PriceLevel> {
        self.storage.asks()
    }

    /// Get top N bids
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.storage.top_bids(n)
    }

    /// Get top N asks
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.storage.top_asks(n)
    }

    /// Number of bid levels
    pub fn bid_count(&self) -> usize {
        self.storage.bid_count()
    }

    /// Number of ask levels
    pub fn ask_count(&self) -> usize {
        self.storage.ask_count()
    }

    /// Total resting bid size
    pub fn total_bid_size(&self) -> Decimal {
        self.storage.total_bid_size()
    }

    /// Total resting ask size
    pub fn total_ask_size(&self) -> Decimal {
        self.storage.total_ask_size()
    }

    /// Check if both sides are empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
