//! Non-executable participant order book
//!
//! Tracks individual limit orders per participant. Orders rest until they
//! are cancelled; nothing is ever matched, so the book may be crossed.
//!
//! # Example
//!
//! ```
//! use snapper_book::participant::{OrderType, ParticipantBook};
//! use snapper_types::Side;
//! use rust_decimal_macros::dec;
//!
//! let mut book = ParticipantBook::new();
//! let id = book.submit_limit(Side::Bid, dec!(1.5), dec!(100), 7).unwrap();
//! book.submit_limit(Side::Bid, dec!(2), dec!(100), 8).unwrap();
//!
//! assert_eq!(book.market_depth(1).bids, vec![(dec!(100), dec!(3.5))]);
//! assert!(book.submit(OrderType::Market, Side::Ask, dec!(1), dec!(0), 7).is_err());
//!
//! book.cancel(id).unwrap();
//! assert_eq!(book.total_bid_size(), dec!(2));
//! ```

pub mod book;
pub mod order;

pub use book::ParticipantBook;
pub use order::{
    MarketDepth, OrderId, OrderLocation, OrderType, ParticipantBookError, ParticipantId,
    ParticipantOrder,
};
