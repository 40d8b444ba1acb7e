//! BTreeMap-based book storage
//!
//! Provides O(log N) upsert/remove and ranked iteration.
//! Uses `Reverse<Decimal>` for bids to maintain descending order.

use rust_decimal::Decimal;
use snapper_types::{PriceLevel, Side};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// One level of a depth query with its running total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthLevel {
    pub price: Decimal,
    pub size: Decimal,
    /// Sum of sizes from the top of the side down to this level
    pub cumulative: Decimal,
}

/// Two-sided price level storage
///
/// - Bids: keyed by `Reverse<Decimal>` (highest first)
/// - Asks: keyed by `Decimal` (lowest first)
///
/// Levels keep the decimal text they arrived with, so a stored
/// `5541.30000` prints back unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeBook {
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
}

impl TreeBook {
    /// Create a new empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one override to a side
    ///
    /// A zero size removes the level; removing an absent level is a no-op.
    /// Any other size replaces the level outright.
    pub fn apply(&mut self, side: Side, level: &PriceLevel) {
        match side {
            Side::Bid => {
                if level.is_delete() {
                    self.bids.remove(&Reverse(level.price));
                } else {
                    self.bids.insert(Reverse(level.price), level.clone());
                }
            }
            Side::Ask => {
                if level.is_delete() {
                    self.asks.remove(&level.price);
                } else {
                    self.asks.insert(level.price, level.clone());
                }
            }
        }
    }

    /// Get the best bid (highest price)
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.values().next()
    }

    /// Get the best ask (lowest price)
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.values().next()
    }

    /// Iterator over bids (highest to lowest price)
    pub fn bids(&self) -> impl Iterator<Item = &PriceLevel> {
        self.bids.values()
    }

    /// Iterator over asks (lowest to highest price)
    pub fn asks(&self) -> impl Iterator<Item = &PriceLevel> {
        self.asks.values()
    }

    /// Get top N bids
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.bids.values().take(n).cloned().collect()
    }

    /// Get top N asks
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.asks.values().take(n).cloned().collect()
    }

    /// Cumulative depth over the top N levels of one side
    pub fn depth(&self, side: Side, n: usize) -> Vec<DepthLevel> {
        let levels: Box<dyn Iterator<Item = &PriceLevel>> = match side {
            Side::Bid => Box::new(self.bids.values()),
            Side::Ask => Box::new(self.asks.values()),
        };

        let mut cumulative = Decimal::ZERO;
        levels
            .take(n)
            .map(|level| {
                cumulative += level.size;
                DepthLevel {
                    price: level.price,
                    size: level.size,
                    cumulative,
                }
            })
            .collect()
    }

    /// Total resting size on the bid side
    pub fn total_bid_size(&self) -> Decimal {
        self.bids.values().map(|l| l.size).sum()
    }

    /// Total resting size on the ask side
    pub fn total_ask_size(&self) -> Decimal {
        self.asks.values().map(|l| l.size).sum()
    }

    /// Number of bid levels
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask levels
    pub fn ask_count(&self) -> usize {
        self.asks.len()
    }

    /// Check if the book is empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Clear all levels
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Truncate to maximum depth (removes levels beyond the limit)
    pub fn truncate(&mut self, max_depth: usize) {
        if self.bids.len() > max_depth {
            let keys_to_remove: Vec<_> = self.bids.keys().skip(max_depth).cloned().collect();
            for key in keys_to_remove {
                self.bids.remove(&key);
            }
        }

        if self.asks.len() > max_depth {
            let keys_to_remove: Vec<_> = self.asks.keys().skip(max_depth).cloned().collect();
            for key in keys_to_remove {
                self.asks.remove(&key);
            }
        }
    }
}
