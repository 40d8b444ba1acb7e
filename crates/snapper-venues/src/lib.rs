//! Venue protocol adapters
//!
//! Everything that differs between venues lives here: native pair spelling,
//! subscription payloads and the classification of raw text frames into
//! [`ClassifiedEvent`]s. Adapters are pure; they never touch the network.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use snapper_types::{ClassifiedEvent, Venue};
//! use snapper_venues::{adapter_for, PairCodec};
//!
//! let adapter = adapter_for(Venue::Kraken, Arc::new(PairCodec::new()));
//! let event = adapter.classify(
//!     r#"[0, {"as": [["100.0","2.5","1690000000.1"]], "bs": []}, "book-10", "XBT/USD"]"#,
//! );
//!
//! match event {
//!     ClassifiedEvent::Snapshot(snapshot) => assert_eq!(snapshot.pair.to_string(), "BTC-USD"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod bitstamp;
pub mod codec;
pub mod coinbase;
pub mod kraken;
pub mod subscribe;
pub mod time;

use snapper_types::{ClassifiedEvent, Venue};
use std::sync::Arc;

// Re-export main types
pub use bitstamp::BitstampAdapter;
pub use codec::{AliasTable, PairCodec, SymbolTable};
pub use coinbase::CoinbaseAdapter;
pub use kraken::KrakenAdapter;
pub use subscribe::{SubscriptionOptions, SubscriptionPlan};

/// Turns one raw text frame into exactly one classified event
///
/// Classification never fails: protocol violations come back as
/// [`ClassifiedEvent::Malformed`], unrecognized shapes as
/// [`ClassifiedEvent::Unknown`].
pub trait VenueAdapter: Send + Sync {
    /// Venue this adapter speaks
    fn venue(&self) -> Venue;

    /// Classify a single message
    fn classify(&self, text: &str) -> ClassifiedEvent;
}

/// Build the adapter for a venue
pub fn adapter_for(venue: Venue, codec: Arc<PairCodec>) -> Box<dyn VenueAdapter> {
    match venue {
        Venue::Coinbase => Box::new(CoinbaseAdapter::new(codec)),
        Venue::Bitstamp => Box::new(BitstampAdapter::new(codec)),
        Venue::Kraken => Box::new(KrakenAdapter::new(codec)),
    }
}

/// One-shot classification with a caller-held codec
pub fn classify(venue: Venue, text: &str, codec: &Arc<PairCodec>) -> ClassifiedEvent {
    adapter_for(venue, Arc::clone(codec)).classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapper_types::ControlKind;

    #[test]
    fn test_adapter_for_each_venue() {
        let codec = Arc::new(PairCodec::new());
        for venue in Venue::ALL {
            assert_eq!(adapter_for(venue, Arc::clone(&codec)).venue(), venue);
        }
    }

    #[test]
    fn test_same_text_differs_by_venue() {
        let codec = Arc::new(PairCodec::new());
        let text = r#"{"event":"heartbeat"}"#;
        assert_eq!(
            classify(Venue::Kraken, text, &codec),
            ClassifiedEvent::Control(ControlKind::Heartbeat)
        );
        assert!(matches!(
            classify(Venue::Coinbase, text, &codec),
            ClassifiedEvent::Unknown { .. }
        ));
    }
}
