//! Coinbase Exchange `level2_batch` classification
//!
//! Flat JSON objects tagged by `type`:
//!
//! - `error`, `subscriptions` → control
//! - `snapshot` → full book, levels as `[price, size]`
//! - `l2update` → `changes` as `[side, price, size]` triples

use crate::codec::PairCodec;
use crate::time::parse_iso8601;
use crate::VenueAdapter;
use serde::Deserialize;
use serde_json::Value;
use snapper_types::{
    BookDiff, BookSnapshot, ClassifiedEvent, ControlKind, PriceLevel, Venue,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Deserialize)]
struct SnapshotMessage {
    product_id: String,
    time: Option<String>,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

#[derive(Debug, Deserialize)]
struct L2UpdateMessage {
    product_id: String,
    time: Option<String>,
    changes: Vec<Value>,
}

/// Classifier for Coinbase messages
#[derive(Debug, Clone)]
pub struct CoinbaseAdapter {
    codec: Arc<PairCodec>,
}

impl CoinbaseAdapter {
    /// Create an adapter sharing the given codec
    pub fn new(codec: Arc<PairCodec>) -> Self {
        Self { codec }
    }

    fn classify_value(&self, value: Value) -> ClassifiedEvent {
        let Some(msg_type) = value.get("type").and_then(Value::as_str) else {
            warn!("Coinbase message without type: {}", value);
            return ClassifiedEvent::Unknown { raw_payload: value };
        };
        let msg_type = msg_type.to_string();

        match msg_type.as_str() {
            "error" => {
                let message = text_field(&value, "message");
                let reason = text_field(&value, "reason");
                error!("Coinbase error: {} - {}", message, reason);
                ClassifiedEvent::Control(ControlKind::VenueError(format!("{message} - {reason}")))
            }
            "subscriptions" => {
                let empty = value
                    .get("channels")
                    .and_then(Value::as_array)
                    .map_or(true, |c| c.is_empty());
                if empty {
                    error!("Coinbase subscription ack with empty channels: {}", value);
                } else {
                    info!("Coinbase subscriptions: {}", value["channels"]);
                }
                ClassifiedEvent::Control(ControlKind::SubscriptionAck)
            }
            "heartbeat" => ClassifiedEvent::Control(ControlKind::Heartbeat),
            "snapshot" => self.snapshot(value),
            "l2update" => self.update(value),
            other => {
                warn!("Unhandled Coinbase message type {}", other);
                ClassifiedEvent::Unknown { raw_payload: value }
            }
        }
    }

    fn snapshot(&self, value: Value) -> ClassifiedEvent {
        let msg: SnapshotMessage = match serde_json::from_value(value) {
            Ok(msg) => msg,
            Err(e) => return ClassifiedEvent::malformed(format!("coinbase snapshot: {e}")),
        };

        let pair = match self.codec.decode(&msg.product_id, Venue::Coinbase) {
            Ok(pair) => pair,
            Err(e) => return ClassifiedEvent::malformed(e.to_string()),
        };
        let external_time = match parse_time(msg.time.as_deref()) {
            Ok(t) => t,
            Err(reason) => return ClassifiedEvent::malformed(reason),
        };

        info!("Received Coinbase snapshot for {}", msg.product_id);
        ClassifiedEvent::Snapshot(BookSnapshot {
            pair,
            native_symbol: msg.product_id,
            external_time,
            bids: msg.bids,
            asks: msg.asks,
        })
    }

    fn update(&self, value: Value) -> ClassifiedEvent {
        let msg: L2UpdateMessage = match serde_json::from_value(value) {
            Ok(msg) => msg,
            Err(e) => return ClassifiedEvent::malformed(format!("coinbase l2update: {e}")),
        };

        let pair = match self.codec.decode(&msg.product_id, Venue::Coinbase) {
            Ok(pair) => pair,
            Err(e) => return ClassifiedEvent::malformed(e.to_string()),
        };
        let external_time = match parse_time(msg.time.as_deref()) {
            Ok(t) => t,
            Err(reason) => return ClassifiedEvent::malformed(reason),
        };

        let mut bid_overrides = Vec::new();
        let mut ask_overrides = Vec::new();

        for change in &msg.changes {
            let triple = change.as_array().and_then(|items| match items.as_slice() {
                [side, price, size] => Some((side.as_str()?, price.as_str()?, size.as_str()?)),
                _ => None,
            });
            let Some((side, price, size)) = triple else {
                return ClassifiedEvent::malformed(format!(
                    "coinbase change is not a [side, price, size] triple: {change}"
                ));
            };

            let level = match PriceLevel::parse(price, size) {
                Ok(level) => level,
                Err(e) => return ClassifiedEvent::malformed(format!("coinbase change: {e}")),
            };

            match side {
                "buy" => bid_overrides.push(level),
                "sell" => ask_overrides.push(level),
                other => {
                    return ClassifiedEvent::malformed(format!(
                        "coinbase change side must be buy or sell, got {other}"
                    ))
                }
            }
        }

        debug!("Received Coinbase l2update for {}", msg.product_id);
        ClassifiedEvent::Diff(BookDiff {
            pair,
            native_symbol: msg.product_id,
            external_time,
            checksum: None,
            bid_overrides,
            ask_overrides,
        })
    }
}

impl VenueAdapter for CoinbaseAdapter {
    fn venue(&self) -> Venue {
        Venue::Coinbase
    }

    fn classify(&self, text: &str) -> ClassifiedEvent {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.classify_value(value),
            Err(e) => ClassifiedEvent::malformed(format!("invalid JSON: {e}")),
        }
    }
}

fn text_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn parse_time(
    text: Option<&str>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, String> {
    match text {
        None => Ok(None),
        Some(text) => parse_iso8601(text)
            .map(Some)
            .ok_or_else(|| format!("coinbase time is not ISO-8601: {text}")),
    }
}
