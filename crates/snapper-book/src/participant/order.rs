//! Order types for the participant book

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use snapper_types::Side;
use thiserror::Error;

/// Order identifier, assigned sequentially by the book starting at 1
pub type OrderId = u64;

/// Participant identifier
pub type ParticipantId = u64;

/// Order type accepted by [`ParticipantBook::submit`](super::ParticipantBook::submit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Rests at its limit price
    Limit,
    /// Would need matching; always rejected
    Market,
}

/// Where an order rests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLocation {
    pub price: Decimal,
    pub side: Side,
}

/// One resting order as seen by its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantOrder {
    pub order_id: OrderId,
    pub price: Decimal,
    pub side: Side,
    pub size: Decimal,
}

/// Aggregated `(price, size)` levels of both sides, best first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketDepth {
    pub asks: Vec<(Decimal, Decimal)>,
    pub bids: Vec<(Decimal, Decimal)>,
}

/// Participant book errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParticipantBookError {
    #[error("non-executable book only accepts limit orders")]
    MarketOrderRejected,

    #[error("order size must be positive, got {0}")]
    NonPositiveSize(Decimal),

    #[error("unknown order id {0}")]
    UnknownOrder(OrderId),
}
