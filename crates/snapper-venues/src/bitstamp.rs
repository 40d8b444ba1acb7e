//! Bitstamp channel classification
//!
//! Messages are `{"event", "channel", "data"}` objects. Book data arrives on
//! `order_book_<sym>` (full snapshots) and `diff_order_book_<sym>` (diffs);
//! per-order events arrive on `live_orders_<sym>`.

use crate::codec::PairCodec;
use crate::time::parse_unix_micros;
use crate::VenueAdapter;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use snapper_types::{
    BookDiff, BookSnapshot, CanonicalPair, ChangeAction, ClassifiedEvent, ControlKind, LevelChange,
    LevelChanges, PriceLevel, Venue,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SUBSCRIPTION_SUCCEEDED: &str = "bts:subscription_succeeded";
const DIFF_PREFIX: &str = "diff_order_book_";
const SNAPSHOT_PREFIX: &str = "order_book_";
const LIVE_ORDERS_PREFIX: &str = "live_orders_";

#[derive(Debug, Deserialize)]
struct BookData {
    #[serde(default)]
    microtimestamp: Value,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

#[derive(Debug, Deserialize)]
struct LiveOrder {
    #[serde(default)]
    microtimestamp: Value,
    order_type: i64,
    price_str: String,
    amount_str: String,
}

/// Classifier for Bitstamp messages
#[derive(Debug, Clone)]
pub struct BitstampAdapter {
    codec: Arc<PairCodec>,
}

impl BitstampAdapter {
    /// Create an adapter sharing the given codec
    pub fn new(codec: Arc<PairCodec>) -> Self {
        Self { codec }
    }

    fn classify_value(&self, value: Value) -> ClassifiedEvent {
        let event = value.get("event").and_then(Value::as_str).unwrap_or_default().to_string();
        let channel = value.get("channel").and_then(Value::as_str).unwrap_or_default().to_string();

        match event.as_str() {
            SUBSCRIPTION_SUCCEEDED => {
                info!("Bitstamp subscription succeeded for {}", channel);
                ClassifiedEvent::Control(ControlKind::SubscriptionAck)
            }
            "bts:error" => {
                let message = value
                    .pointer("/data/message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                warn!("Bitstamp error on {}: {}", channel, message);
                ClassifiedEvent::Control(ControlKind::VenueError(message))
            }
            // Longer prefix first: every diff channel also contains "order_book_"
            "data" if channel.starts_with(DIFF_PREFIX) => self.book(&channel, 3, value, false),
            "data" if channel.starts_with(SNAPSHOT_PREFIX) => self.book(&channel, 2, value, true),
            "order_created" | "order_changed" | "order_deleted"
                if channel.starts_with(LIVE_ORDERS_PREFIX) =>
            {
                self.live_order(&channel, value)
            }
            _ => {
                warn!("Unhandled Bitstamp message event {}", event);
                ClassifiedEvent::Unknown { raw_payload: value }
            }
        }
    }

    fn pair_from_channel(
        &self,
        channel: &str,
        token: usize,
    ) -> Result<(CanonicalPair, String), String> {
        let symbol = channel
            .split('_')
            .nth(token)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("bitstamp channel has no pair token: {channel}"))?;
        let pair = self
            .codec
            .decode(symbol, Venue::Bitstamp)
            .map_err(|e| e.to_string())?;
        Ok((pair, symbol.to_string()))
    }

    fn book(
        &self,
        channel: &str,
        token: usize,
        mut value: Value,
        is_snapshot: bool,
    ) -> ClassifiedEvent {
        let (pair, native_symbol) = match self.pair_from_channel(channel, token) {
            Ok(found) => found,
            Err(reason) => return ClassifiedEvent::malformed(reason),
        };

        let data: BookData = match serde_json::from_value(value["data"].take()) {
            Ok(data) => data,
            Err(e) => return ClassifiedEvent::malformed(format!("bitstamp book data: {e}")),
        };
        let external_time = match micros_time(&data.microtimestamp) {
            Ok(t) => t,
            Err(reason) => return ClassifiedEvent::malformed(reason),
        };

        if is_snapshot {
            debug!("Received Bitstamp snapshot for {}", channel);
            ClassifiedEvent::Snapshot(BookSnapshot {
                pair,
                native_symbol,
                external_time,
                bids: data.bids,
                asks: data.asks,
            })
        } else {
            debug!("Received Bitstamp diff for {}", channel);
            ClassifiedEvent::Diff(BookDiff {
                pair,
                native_symbol,
                external_time,
                checksum: None,
                bid_overrides: data.bids,
                ask_overrides: data.asks,
            })
        }
    }

    fn live_order(&self, channel: &str, mut value: Value) -> ClassifiedEvent {
        let (pair, native_symbol) = match self.pair_from_channel(channel, 2) {
            Ok(found) => found,
            Err(reason) => return ClassifiedEvent::malformed(reason),
        };

        let order: LiveOrder = match serde_json::from_value(value["data"].take()) {
            Ok(order) => order,
            Err(e) => return ClassifiedEvent::malformed(format!("bitstamp live order: {e}")),
        };
        let external_time = match micros_time(&order.microtimestamp) {
            Ok(t) => t,
            Err(reason) => return ClassifiedEvent::malformed(reason),
        };
        let level = match PriceLevel::parse(&order.price_str, &order.amount_str) {
            Ok(level) => level,
            Err(e) => return ClassifiedEvent::malformed(format!("bitstamp live order: {e}")),
        };

        // The create/change/delete kind is not mapped to a direction yet
        let change = LevelChange {
            price: level.price,
            amount: level.size,
            action: ChangeAction::Add,
        };

        let (bid_changes, ask_changes) = match order.order_type {
            0 => (vec![change], Vec::new()),
            1 => (Vec::new(), vec![change]),
            other => {
                return ClassifiedEvent::malformed(format!(
                    "bitstamp order_type must be 0 or 1, got {other}"
                ))
            }
        };

        debug!("Received Bitstamp live order for {}", channel);
        ClassifiedEvent::LevelChanges(LevelChanges {
            pair,
            native_symbol,
            external_time,
            bid_changes,
            ask_changes,
        })
    }
}

impl VenueAdapter for BitstampAdapter {
    fn venue(&self) -> Venue {
        Venue::Bitstamp
    }

    fn classify(&self, text: &str) -> ClassifiedEvent {
        match serde_json::from_str::<Value>(text) {
            Ok(value) if value.is_object() => self.classify_value(value),
            Ok(value) => ClassifiedEvent::Unknown { raw_payload: value },
            Err(e) => ClassifiedEvent::malformed(format!("invalid JSON: {e}")),
        }
    }
}

/// `microtimestamp` arrives as a string, occasionally as a number
fn micros_time(value: &Value) -> Result<Option<DateTime<Utc>>, String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Null => return Ok(None),
        other => return Err(format!("bitstamp microtimestamp is not numeric: {other}")),
    };
    parse_unix_micros(&text)
        .map(Some)
        .ok_or_else(|| format!("bitstamp microtimestamp is not integer micros: {text}"))
}
