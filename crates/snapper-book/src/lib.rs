//! Order book reconstruction engine
//!
//! Pure state: no networking, no async runtime. Venue sessions feed
//! classified snapshots and diffs into a [`BookSet`] and query the
//! resulting [`OrderBookState`] per pair.
//!
//! # Example
//!
//! ```
//! use snapper_book::{ApplyOutcome, BookSet};
//! use snapper_types::{BookSnapshot, CanonicalPair, PriceLevel};
//!
//! let pair = CanonicalPair::new("BTC", "USD");
//! let mut books = BookSet::new();
//! let snapshot = BookSnapshot {
//!     pair: pair.clone(),
//!     native_symbol: "BTC-USD".into(),
//!     external_time: None,
//!     bids: vec![PriceLevel::parse("100.0", "2.5").unwrap()],
//!     asks: vec![PriceLevel::parse("101.0", "1.0").unwrap()],
//! };
//!
//! assert_eq!(books.apply_snapshot(&snapshot, Some(1)), ApplyOutcome::Snapshot);
//! assert_eq!(books.book(&pair).unwrap().best_bid().unwrap().price.to_string(), "100.0");
//! ```

pub mod books;
pub mod checksum;
pub mod orderbook;
pub mod participant;
pub mod storage;

// Re-export main types
pub use books::BookSet;
pub use checksum::{compute_checksum, parse_checksum, ChecksumResult, CHECKSUM_DEPTH};
pub use orderbook::{ApplyOutcome, BookError, OrderBookState, SyncState};
pub use participant::ParticipantBook;
pub use storage::{DepthLevel, TreeBook};
