//! Per-venue collection of pair books

use crate::orderbook::{ApplyOutcome, BookError, OrderBookState};
use snapper_types::{BookDiff, BookSnapshot, CanonicalPair, RecordId, FULL_DEPTH};
use std::collections::HashMap;

/// All books owned by one venue session
///
/// A pair's book is created on its first snapshot. Diffs for a pair that
/// never had a snapshot are dropped and leave the pair absent.
#[derive(Debug, Clone, Default)]
pub struct BookSet {
    max_depth: Option<usize>,
    books: HashMap<CanonicalPair, OrderBookState>,
}

impl BookSet {
    /// Create a set of untruncated books
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set whose books keep at most `depth` levels per side
    pub fn with_depth(depth: usize) -> Self {
        Self {
            max_depth: Some(depth),
            books: HashMap::new(),
        }
    }

    /// Depth value stored on snapshot records
    pub fn level_depth(&self) -> i32 {
        self.max_depth
            .and_then(|d| i32::try_from(d).ok())
            .unwrap_or(FULL_DEPTH)
    }

    /// Apply a snapshot, creating the pair's book if needed
    pub fn apply_snapshot(
        &mut self,
        snapshot: &BookSnapshot,
        snapshot_id: Option<RecordId>,
    ) -> ApplyOutcome {
        let max_depth = self.max_depth;
        let book = self
            .books
            .entry(snapshot.pair.clone())
            .or_insert_with(|| match max_depth {
                Some(depth) => OrderBookState::with_depth(snapshot.pair.clone(), depth),
                None => OrderBookState::new(snapshot.pair.clone()),
            });
        book.apply_snapshot(snapshot, snapshot_id)
    }

    /// Apply a diff to an existing book
    pub fn apply_diff(&mut self, diff: &BookDiff) -> Result<ApplyOutcome, BookError> {
        match self.books.get_mut(&diff.pair) {
            Some(book) => book.apply_diff(diff),
            None => Ok(ApplyOutcome::Dropped),
        }
    }

    /// Get the book for a pair
    pub fn book(&self, pair: &CanonicalPair) -> Option<&OrderBookState> {
        self.books.get(pair)
    }

    /// Snapshot id the pair's current levels descend from
    pub fn snapshot_id(&self, pair: &CanonicalPair) -> Option<RecordId> {
        self.books.get(pair).and_then(|b| b.last_snapshot_id())
    }

    /// Iterate over all books
    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalPair, &OrderBookState)> {
        self.books.iter()
    }

    /// Number of books created so far
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Check if no book was created yet
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Number of books currently synced
    pub fn synced_count(&self) -> usize {
        self.books.values().filter(|b| b.has_snapshot()).count()
    }
}
