//! Kraken classic book channel classification
//!
//! Control messages are JSON objects tagged by `event`. Book data arrives as
//! arrays: `[channel_id, {..}, ({..},)? channel_name, pair]`. A fragment
//! carrying a `c` checksum marks an incremental update; without one the
//! fragment holds the full `as`/`bs` snapshot.

use crate::codec::PairCodec;
use crate::time::{parse_unix_seconds, seconds_to_datetime};
use crate::VenueAdapter;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use snapper_types::{BookDiff, BookSnapshot, ClassifiedEvent, ControlKind, PriceLevel, Venue};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const MAX_FRAGMENTS: usize = 2;

/// Levels of one side plus the latest per-level timestamp seen
type ParsedSide = (Vec<PriceLevel>, Option<Decimal>);

/// Classifier for Kraken messages
#[derive(Debug, Clone)]
pub struct KrakenAdapter {
    codec: Arc<PairCodec>,
}

impl KrakenAdapter {
    /// Create an adapter sharing the given codec
    pub fn new(codec: Arc<PairCodec>) -> Self {
        Self { codec }
    }

    fn classify_object(&self, value: Value) -> ClassifiedEvent {
        let event = value.get("event").and_then(Value::as_str).unwrap_or_default().to_string();

        match event.as_str() {
            "systemStatus" => {
                info!("Kraken system status: {}", value);
                ClassifiedEvent::Control(ControlKind::SystemStatus)
            }
            "subscriptionStatus" => {
                if value.get("status").and_then(Value::as_str) == Some("error") {
                    let message = value
                        .get("errorMessage")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    error!("Kraken subscription error: {}", message);
                    return ClassifiedEvent::Control(ControlKind::VenueError(message));
                }
                info!("Kraken subscription status: {}", value);
                ClassifiedEvent::Control(ControlKind::SubscriptionAck)
            }
            "heartbeat" => ClassifiedEvent::Control(ControlKind::Heartbeat),
            _ => {
                warn!("Unhandled Kraken message event {:?}", event);
                ClassifiedEvent::Unknown { raw_payload: value }
            }
        }
    }

    fn classify_array(&self, items: Vec<Value>) -> ClassifiedEvent {
        let fragments: Vec<&Map<String, Value>> =
            items.iter().filter_map(Value::as_object).collect();
        if fragments.len() > MAX_FRAGMENTS {
            return ClassifiedEvent::malformed(format!(
                "kraken book message has {} object fragments",
                fragments.len()
            ));
        }

        let checksums: Vec<&str> = fragments
            .iter()
            .filter_map(|f| f.get("c").and_then(Value::as_str))
            .filter(|c| !c.is_empty())
            .collect();
        if checksums.len() > 1 {
            return ClassifiedEvent::malformed(format!(
                "kraken book message has {} checksums",
                checksums.len()
            ));
        }

        let (channel, native_symbol) = match items.as_slice() {
            [.., Value::String(channel), Value::String(pair)] => (channel.as_str(), pair.as_str()),
            _ => {
                return ClassifiedEvent::malformed(
                    "kraken array message does not end with channel name and pair",
                )
            }
        };

        if !channel.starts_with("book") {
            debug!("Unhandled Kraken channel {}", channel);
            return ClassifiedEvent::Unknown {
                raw_payload: Value::Array(items.clone()),
            };
        }

        let pair = match self.codec.decode(native_symbol, Venue::Kraken) {
            Ok(pair) => pair,
            Err(e) => return ClassifiedEvent::malformed(e.to_string()),
        };

        match checksums.first() {
            Some(checksum) => {
                // Later fragments overwrite earlier keys
                let mut merged = Map::new();
                for fragment in &fragments {
                    merged.extend(fragment.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                if fragments.len() == MAX_FRAGMENTS {
                    debug!("Kraken update split across two fragments for {}", native_symbol);
                }

                let (asks, asks_time) = match parse_side(merged.get("a")) {
                    Ok(side) => side,
                    Err(reason) => return ClassifiedEvent::malformed(reason),
                };
                let (bids, bids_time) = match parse_side(merged.get("b")) {
                    Ok(side) => side,
                    Err(reason) => return ClassifiedEvent::malformed(reason),
                };

                debug!("Received Kraken update for {} {}", channel, native_symbol);
                ClassifiedEvent::Diff(BookDiff {
                    pair,
                    native_symbol: native_symbol.to_string(),
                    external_time: latest(asks_time, bids_time),
                    checksum: Some(checksum.to_string()),
                    bid_overrides: bids,
                    ask_overrides: asks,
                })
            }
            None => {
                let Some(fragment) = fragments.first() else {
                    return ClassifiedEvent::malformed("kraken book snapshot has no payload");
                };
                if !fragment.contains_key("as") && !fragment.contains_key("bs") {
                    return ClassifiedEvent::malformed(
                        "kraken book snapshot has neither \"as\" nor \"bs\"",
                    );
                }

                let (asks, asks_time) = match parse_side(fragment.get("as")) {
                    Ok(side) => side,
                    Err(reason) => return ClassifiedEvent::malformed(reason),
                };
                let (bids, bids_time) = match parse_side(fragment.get("bs")) {
                    Ok(side) => side,
                    Err(reason) => return ClassifiedEvent::malformed(reason),
                };

                info!("Received Kraken snapshot for {} {}", channel, native_symbol);
                ClassifiedEvent::Snapshot(BookSnapshot {
                    pair,
                    native_symbol: native_symbol.to_string(),
                    external_time: latest(asks_time, bids_time),
                    bids,
                    asks,
                })
            }
        }
    }
}

impl VenueAdapter for KrakenAdapter {
    fn venue(&self) -> Venue {
        Venue::Kraken
    }

    fn classify(&self, text: &str) -> ClassifiedEvent {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => self.classify_array(items),
            Ok(value) if value.is_object() => self.classify_object(value),
            Ok(value) => ClassifiedEvent::Unknown { raw_payload: value },
            Err(e) => ClassifiedEvent::malformed(format!("invalid JSON: {e}")),
        }
    }
}

/// Parse `[price, size, timestamp, ("r")?]` entries
fn parse_side(levels: Option<&Value>) -> Result<ParsedSide, String> {
    let Some(levels) = levels else {
        return Ok((Vec::new(), None));
    };
    let entries = levels
        .as_array()
        .ok_or_else(|| format!("kraken level list is not an array: {levels}"))?;

    let mut parsed = Vec::with_capacity(entries.len());
    let mut newest: Option<Decimal> = None;

    for entry in entries {
        let fields = entry.as_array().map(Vec::as_slice).unwrap_or_default();
        let (price, size, ts) = match fields {
            [Value::String(p), Value::String(s), Value::String(t), ..] => (p, s, t),
            _ => return Err(format!("kraken level is not [price, size, timestamp]: {entry}")),
        };

        let level = PriceLevel::parse(price, size).map_err(|e| format!("kraken level: {e}"))?;
        let ts = parse_unix_seconds(ts).ok_or_else(|| format!("kraken level timestamp: {ts}"))?;

        newest = Some(newest.map_or(ts, |n| n.max(ts)));
        parsed.push(level);
    }

    Ok((parsed, newest))
}

fn latest(a: Option<Decimal>, b: Option<Decimal>) -> Option<DateTime<Utc>> {
    let newest = match (a, b) {
        (Some(a), Some(b)) => a.max(b),
        (Some(t), None) | (None, Some(t)) => t,
        (None, None) => return None,
    };
    seconds_to_datetime(newest)
}
