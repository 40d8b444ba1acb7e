//! Persisted record shapes
//!
//! Level payloads are stored as JSON text with decimal strings, never floats,
//! so downstream consumers read exactly what the venue published.

use crate::{BookDiff, BookSnapshot, LevelChanges, Venue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned by a sink when it accepts a record
pub type RecordId = u64;

/// `level_depth` value meaning "the full book"
pub const FULL_DEPTH: i32 = -1;

/// A record handed to the persistence sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum EventRecord {
    Snapshot(SnapshotRecord),
    Override(OverrideRecord),
    LevelDiff(LevelDiffRecord),
}

impl EventRecord {
    /// Returns true for snapshot records, which are committed immediately
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }

    /// Provider string of the record
    pub fn provider(&self) -> &str {
        match self {
            Self::Snapshot(r) => &r.provider,
            Self::Override(r) => &r.provider,
            Self::LevelDiff(r) => &r.provider,
        }
    }
}

/// Full book snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub received_at: DateTime<Utc>,
    pub external_time: Option<DateTime<Utc>>,
    pub base: String,
    pub counter: String,
    pub provider: String,
    /// Subscribed depth, or [`FULL_DEPTH`]
    pub level_depth: i32,
    pub bids_json: String,
    pub asks_json: String,
}

impl SnapshotRecord {
    /// Build a record from a classified snapshot
    pub fn new(
        venue: Venue,
        snapshot: &BookSnapshot,
        level_depth: i32,
        received_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            received_at,
            external_time: snapshot.external_time,
            base: snapshot.pair.base.clone(),
            counter: snapshot.pair.counter.clone(),
            provider: venue.as_str().to_string(),
            level_depth,
            bids_json: serde_json::to_string(&snapshot.bids)?,
            asks_json: serde_json::to_string(&snapshot.asks)?,
        })
    }
}

/// Level overrides applied on top of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    /// Snapshot the overrides apply to; absent if none was seen yet
    pub snapshot_id_ref: Option<RecordId>,
    pub external_time: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub base: String,
    pub counter: String,
    pub provider: String,
    pub bid_overrides_json: String,
    pub ask_overrides_json: String,
}

impl OverrideRecord {
    /// Build a record from a classified diff
    pub fn new(
        venue: Venue,
        diff: &BookDiff,
        snapshot_id_ref: Option<RecordId>,
        received_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            snapshot_id_ref,
            external_time: diff.external_time,
            received_at,
            base: diff.pair.base.clone(),
            counter: diff.pair.counter.clone(),
            provider: venue.as_str().to_string(),
            bid_overrides_json: serde_json::to_string(&diff.bid_overrides)?,
            ask_overrides_json: serde_json::to_string(&diff.ask_overrides)?,
        })
    }
}

/// Per-order level changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDiffRecord {
    pub snapshot_id_ref: Option<RecordId>,
    pub external_time: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub base: String,
    pub counter: String,
    pub provider: String,
    pub bid_changes_json: String,
    pub ask_changes_json: String,
}

impl LevelDiffRecord {
    /// Build a record from classified level changes
    pub fn new(
        venue: Venue,
        changes: &LevelChanges,
        snapshot_id_ref: Option<RecordId>,
        received_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            snapshot_id_ref,
            external_time: changes.external_time,
            received_at,
            base: changes.pair.base.clone(),
            counter: changes.pair.counter.clone(),
            provider: venue.as_str().to_string(),
            bid_changes_json: serde_json::to_string(&changes.bid_changes)?,
            ask_changes_json: serde_json::to_string(&changes.ask_changes)?,
        })
    }
}
