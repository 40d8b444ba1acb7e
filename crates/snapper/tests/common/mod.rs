//! Common fixtures for session integration tests
//!
//! Frames follow the shapes each venue publishes on its public feed.

#![allow(dead_code)]

use snapper::{MemorySink, PersistenceSink, Session, SessionConfig};
use snapper_book::compute_checksum;
use snapper_types::{CanonicalPair, PriceLevel, Venue};
use snapper_venues::PairCodec;
use snapper_ws::{MockTransport, ReconnectPolicy};
use std::sync::Arc;
use std::time::Duration;

pub const COINBASE_SUBSCRIPTIONS: &str =
    r#"{"type":"subscriptions","channels":[{"name":"level2_batch","product_ids":["BTC-USD"]}]}"#;

pub const COINBASE_SNAPSHOT: &str = r#"{
    "type": "snapshot",
    "product_id": "BTC-USD",
    "time": "2023-07-22T04:26:40.000000Z",
    "bids": [["100.0", "2.5"]],
    "asks": [["101.0", "1.0"]]
}"#;

pub const COINBASE_REMOVE_BID: &str = r#"{
    "type": "l2update",
    "product_id": "BTC-USD",
    "time": "2023-07-22T04:26:41.000000Z",
    "changes": [["buy", "100.0", "0"]]
}"#;

pub const KRAKEN_SYSTEM_STATUS: &str = r#"{
    "connectionID": 8628615390848610222,
    "event": "systemStatus",
    "status": "online",
    "version": "1.9.0"
}"#;

pub const KRAKEN_SNAPSHOT: &str = r#"[0, {
    "as": [["101.0", "1.0", "1690000000.1"]],
    "bs": [["100.0", "2.5", "1690000000.2"]]
}, "book-10", "XBT/USD"]"#;

pub const BITSTAMP_SNAPSHOT: &str = r#"{
    "event": "data",
    "channel": "order_book_btcusd",
    "data": {"timestamp": "1690000000", "microtimestamp": "1690000000123456",
             "bids": [["100.0", "2.5"]], "asks": [["101.0", "1.0"]]}
}"#;

pub const BITSTAMP_LIVE_ORDER: &str = r#"{
    "event": "order_created",
    "channel": "live_orders_btcusd",
    "data": {"id": 1, "order_type": 0, "microtimestamp": "1690000000000000",
             "amount_str": "0.5", "price_str": "99.5"}
}"#;

/// Kraken update setting the 100.0 bid to `size`, with the checksum the
/// resulting book should have (or `bad_checksum` if given)
pub fn kraken_bid_update(size: &str, bad_checksum: Option<u32>) -> String {
    let bids = [PriceLevel::parse("100.0", size).unwrap()];
    let asks = [PriceLevel::parse("101.0", "1.0").unwrap()];
    let checksum = bad_checksum.unwrap_or_else(|| compute_checksum(&bids, &asks));
    format!(
        r#"[0, {{"b": [["100.0", "{size}", "1690000001.5"]], "c": "{checksum}"}},
            "book-10", "XBT/USD"]"#
    )
}

pub fn btc_usd() -> CanonicalPair {
    CanonicalPair::new("BTC", "USD")
}

pub fn session_config(venue: Venue) -> SessionConfig {
    SessionConfig::new(venue, vec![btc_usd()])
        .with_reconnect_policy(ReconnectPolicy::new().with_backoff(Duration::ZERO))
}

pub fn scripted(frames: &[&str]) -> MockTransport {
    let mut transport = MockTransport::new("wss://mock.test");
    transport.push_responses(frames.iter().copied());
    transport
}

pub fn session_with<S: PersistenceSink>(
    config: SessionConfig,
    transport: MockTransport,
    sink: S,
) -> Session<MockTransport, S> {
    let mut codec = PairCodec::new();
    for pair in &config.pairs {
        codec.register_bitstamp_pair(pair);
    }
    Session::new(config, Arc::new(codec), transport, sink)
}

pub fn memory_session(venue: Venue, frames: &[&str]) -> Session<MockTransport, MemorySink> {
    session_with(session_config(venue), scripted(frames), MemorySink::new())
}
