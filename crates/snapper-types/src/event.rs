//! Canonical events produced by venue classifiers

use crate::{CanonicalPair, PriceLevel};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of classifying exactly one decoded wire message
///
/// Callers switch exhaustively on the variant; no other shape exists.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedEvent {
    /// Heartbeats, acks and status messages; no book effect
    Control(ControlKind),
    /// Full replacement view of a pair's book
    Snapshot(BookSnapshot),
    /// Incremental level overrides for a pair
    Diff(BookDiff),
    /// Per-order level changes (not applied to the book)
    LevelChanges(LevelChanges),
    /// Structurally valid but unrecognized message
    Unknown {
        /// The decoded payload, kept for diagnostics
        raw_payload: serde_json::Value,
    },
    /// Structurally invalid message
    Malformed {
        /// Why the message was rejected
        reason: String,
    },
}

impl ClassifiedEvent {
    /// Build a malformed event
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Kind of control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    /// Subscription accepted or status of a subscription
    SubscriptionAck,
    /// Keepalive
    Heartbeat,
    /// Venue-wide system status
    SystemStatus,
    /// Venue reported an error
    VenueError(String),
}

/// Book snapshot payload
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    /// Canonical pair
    pub pair: CanonicalPair,
    /// Venue-native symbol the message referred to
    pub native_symbol: String,
    /// Venue timestamp, if the message carried one
    pub external_time: Option<DateTime<Utc>>,
    /// Bid levels in venue order
    pub bids: Vec<PriceLevel>,
    /// Ask levels in venue order
    pub asks: Vec<PriceLevel>,
}

/// Book diff payload
#[derive(Debug, Clone, PartialEq)]
pub struct BookDiff {
    /// Canonical pair
    pub pair: CanonicalPair,
    /// Venue-native symbol the message referred to
    pub native_symbol: String,
    /// Venue timestamp, if the message carried one
    pub external_time: Option<DateTime<Utc>>,
    /// Venue integrity checksum (decimal text)
    pub checksum: Option<String>,
    /// Bid overrides; zero size deletes the level
    pub bid_overrides: Vec<PriceLevel>,
    /// Ask overrides; zero size deletes the level
    pub ask_overrides: Vec<PriceLevel>,
}

/// Per-order change payload
#[derive(Debug, Clone, PartialEq)]
pub struct LevelChanges {
    /// Canonical pair
    pub pair: CanonicalPair,
    /// Venue-native symbol the message referred to
    pub native_symbol: String,
    /// Venue timestamp, if the message carried one
    pub external_time: Option<DateTime<Utc>>,
    /// Changes on the bid side
    pub bid_changes: Vec<LevelChange>,
    /// Changes on the ask side
    pub ask_changes: Vec<LevelChange>,
}

/// One quantity change at a price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    /// Price of the affected level
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Quantity to add or remove
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Direction of the change
    #[serde(rename = "action_type")]
    pub action: ChangeAction,
}

/// Direction of a level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Quantity is added to the level
    Add,
    /// Quantity is removed from the level
    Remove,
}
