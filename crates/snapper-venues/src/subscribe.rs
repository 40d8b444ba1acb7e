//! Subscription payloads
//!
//! Each venue session subscribes once per connection. The payloads are built
//! up front and replayed verbatim after every reconnect; a desynchronized
//! pair is recovered by unsubscribing and resubscribing that one symbol.

use crate::codec::PairCodec;
use serde_json::{json, Value};
use snapper_types::{CanonicalPair, Venue};

/// Coinbase channel carrying batched level-2 updates
pub const DEFAULT_COINBASE_CHANNEL: &str = "level2_batch";

/// Bitstamp channels subscribed per symbol
pub const DEFAULT_BITSTAMP_CHANNELS: [&str; 2] = ["order_book", "diff_order_book"];

/// Kraken book depth
pub const DEFAULT_KRAKEN_DEPTH: u32 = 10;

/// Venue-specific subscription knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Coinbase channel name
    pub coinbase_channel: String,
    /// Bitstamp channel kinds, combined with the symbol as `<kind>_<symbol>`
    pub bitstamp_channels: Vec<String>,
    /// Kraken book depth
    pub kraken_depth: u32,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            coinbase_channel: DEFAULT_COINBASE_CHANNEL.to_string(),
            bitstamp_channels: DEFAULT_BITSTAMP_CHANNELS.iter().map(|c| c.to_string()).collect(),
            kraken_depth: DEFAULT_KRAKEN_DEPTH,
        }
    }
}

/// The subscriptions of one venue session
#[derive(Debug, Clone)]
pub struct SubscriptionPlan {
    venue: Venue,
    symbols: Vec<String>,
    options: SubscriptionOptions,
}

impl SubscriptionPlan {
    /// Plan subscriptions for `pairs`, encoded to the venue's native symbols
    pub fn new(venue: Venue, pairs: &[CanonicalPair], codec: &PairCodec) -> Self {
        Self {
            venue,
            symbols: pairs.iter().map(|p| codec.encode(p, venue)).collect(),
            options: SubscriptionOptions::default(),
        }
    }

    /// Replace the default options
    pub fn with_options(mut self, options: SubscriptionOptions) -> Self {
        self.options = options;
        self
    }

    /// Venue the plan targets
    pub fn venue(&self) -> Venue {
        self.venue
    }

    /// Native symbols, in configuration order
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Options in effect
    pub fn options(&self) -> &SubscriptionOptions {
        &self.options
    }

    /// Payloads to send after every (re)connect
    pub fn subscribe_messages(&self) -> Vec<String> {
        self.requests(&self.symbols, "subscribe")
    }

    /// Unsubscribe then subscribe payloads for a single symbol
    pub fn resubscribe_messages(&self, native_symbol: &str) -> Vec<String> {
        let symbols = [native_symbol.to_string()];
        let mut messages = self.requests(&symbols, "unsubscribe");
        messages.extend(self.requests(&symbols, "subscribe"));
        messages
    }

    fn requests(&self, symbols: &[String], action: &str) -> Vec<String> {
        let payloads: Vec<Value> = match self.venue {
            Venue::Coinbase => vec![json!({
                "type": action,
                "product_ids": symbols,
                "channels": [self.options.coinbase_channel],
            })],
            Venue::Bitstamp => symbols
                .iter()
                .flat_map(|symbol| {
                    self.options.bitstamp_channels.iter().map(move |kind| {
                        json!({
                            "event": format!("bts:{action}"),
                            "data": { "channel": format!("{kind}_{symbol}") },
                        })
                    })
                })
                .collect(),
            Venue::Kraken => vec![json!({
                "event": action,
                "pair": symbols,
                "subscription": { "name": "book", "depth": self.options.kraken_depth },
            })],
        };

        payloads.iter().map(Value::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs() -> Vec<CanonicalPair> {
        vec![CanonicalPair::new("BTC", "USD"), CanonicalPair::new("ETH", "EUR")]
    }

    fn parsed(messages: &[String]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| serde_json::from_str(m).unwrap())
            .collect()
    }

    #[test]
    fn test_coinbase_single_message() {
        let plan = SubscriptionPlan::new(Venue::Coinbase, &pairs(), &PairCodec::new());
        let messages = parsed(&plan.subscribe_messages());
        assert_eq!(
            messages,
            vec![json!({
                "type": "subscribe",
                "product_ids": ["BTC-USD", "ETH-EUR"],
                "channels": ["level2_batch"],
            })]
        );
    }

    #[test]
    fn test_bitstamp_message_per_symbol_and_channel() {
        let plan = SubscriptionPlan::new(Venue::Bitstamp, &pairs(), &PairCodec::new());
        let messages = parsed(&plan.subscribe_messages());
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[0],
            json!({"event": "bts:subscribe", "data": {"channel": "order_book_btcusd"}})
        );
        assert_eq!(messages[3]["data"]["channel"], "diff_order_book_etheur");
    }

    #[test]
    fn test_kraken_uses_aliases_and_depth() {
        let options = SubscriptionOptions {
            kraken_depth: 25,
            ..Default::default()
        };
        let plan = SubscriptionPlan::new(Venue::Kraken, &pairs(), &PairCodec::new())
            .with_options(options);
        let messages = parsed(&plan.subscribe_messages());
        assert_eq!(
            messages,
            vec![json!({
                "event": "subscribe",
                "pair": ["XBT/USD", "ETH/EUR"],
                "subscription": {"name": "book", "depth": 25},
            })]
        );
    }

    #[test]
    fn test_resubscribe_single_symbol() {
        let plan = SubscriptionPlan::new(Venue::Kraken, &pairs(), &PairCodec::new());
        let messages = parsed(&plan.resubscribe_messages("XBT/USD"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["event"], "unsubscribe");
        assert_eq!(messages[1]["event"], "subscribe");
        assert_eq!(messages[1]["pair"], json!(["XBT/USD"]));

        let plan = SubscriptionPlan::new(Venue::Bitstamp, &pairs(), &PairCodec::new());
        let messages = parsed(&plan.resubscribe_messages("btcusd"));
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["event"], "bts:unsubscribe");
        assert_eq!(messages[3]["event"], "bts:subscribe");
    }
}
