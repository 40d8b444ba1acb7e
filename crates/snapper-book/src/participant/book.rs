//! Participant book storage
//!
//! Relations are held in independent maps keyed by integer id, so no level
//! or order ever points back at another structure:
//!
//! - `owners`: order id → participant
//! - `locations`: order id → (price, side)
//! - `bids` / `asks`: price → order id → size

use super::order::{
    MarketDepth, OrderId, OrderLocation, OrderType, ParticipantBookError, ParticipantId,
    ParticipantOrder,
};
use rust_decimal::Decimal;
use snapper_types::Side;
use std::cmp::Reverse;
use std::collections::BTreeMap;

type Level = BTreeMap<OrderId, Decimal>;

/// Limit book that accepts and cancels orders but never matches them
///
/// Crossed books are allowed.
#[derive(Debug, Clone, Default)]
pub struct ParticipantBook {
    owners: BTreeMap<OrderId, ParticipantId>,
    locations: BTreeMap<OrderId, OrderLocation>,
    bids: BTreeMap<Reverse<Decimal>, Level>,
    asks: BTreeMap<Decimal, Level>,
    last_order_id: OrderId,
    total_bid_size: Decimal,
    total_ask_size: Decimal,
}

impl ParticipantBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Order Operations
    // ========================================================================

    /// Submit an order; only [`OrderType::Limit`] is accepted
    pub fn submit(
        &mut self,
        order_type: OrderType,
        side: Side,
        size: Decimal,
        price: Decimal,
        participant: ParticipantId,
    ) -> Result<OrderId, ParticipantBookError> {
        match order_type {
            OrderType::Limit => self.submit_limit(side, size, price, participant),
            OrderType::Market => Err(ParticipantBookError::MarketOrderRejected),
        }
    }

    /// Rest a limit order and return its id
    pub fn submit_limit(
        &mut self,
        side: Side,
        size: Decimal,
        price: Decimal,
        participant: ParticipantId,
    ) -> Result<OrderId, ParticipantBookError> {
        if size <= Decimal::ZERO {
            return Err(ParticipantBookError::NonPositiveSize(size));
        }

        self.last_order_id += 1;
        let order_id = self.last_order_id;

        self.owners.insert(order_id, participant);
        self.locations.insert(order_id, OrderLocation { price, side });

        match side {
            Side::Bid => {
                self.total_bid_size += size;
                self.bids
                    .entry(Reverse(price))
                    .or_default()
                    .insert(order_id, size);
            }
            Side::Ask => {
                self.total_ask_size += size;
                self.asks.entry(price).or_default().insert(order_id, size);
            }
        }

        Ok(order_id)
    }

    /// Cancel a resting order
    pub fn cancel(&mut self, order_id: OrderId) -> Result<ParticipantOrder, ParticipantBookError> {
        let location = self
            .locations
            .remove(&order_id)
            .ok_or(ParticipantBookError::UnknownOrder(order_id))?;
        self.owners.remove(&order_id);

        let size = match location.side {
            Side::Bid => {
                let size = remove_from_level(&mut self.bids, &Reverse(location.price), order_id);
                self.total_bid_size -= size;
                size
            }
            Side::Ask => {
                let size = remove_from_level(&mut self.asks, &location.price, order_id);
                self.total_ask_size -= size;
                size
            }
        };

        Ok(ParticipantOrder {
            order_id,
            price: location.price,
            side: location.side,
            size,
        })
    }

    /// All resting orders of a participant, by ascending order id
    pub fn participant_orders(&self, participant: ParticipantId) -> Vec<ParticipantOrder> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == participant)
            .filter_map(|(order_id, _)| self.order(*order_id))
            .collect()
    }

    /// Look up a resting order
    pub fn order(&self, order_id: OrderId) -> Option<ParticipantOrder> {
        let location = self.locations.get(&order_id)?;
        let size = match location.side {
            Side::Bid => self.bids.get(&Reverse(location.price))?.get(&order_id),
            Side::Ask => self.asks.get(&location.price)?.get(&order_id),
        }?;

        Some(ParticipantOrder {
            order_id,
            price: location.price,
            side: location.side,
            size: *size,
        })
    }

    /// Owner of a resting order
    pub fn owner(&self, order_id: OrderId) -> Option<ParticipantId> {
        self.owners.get(&order_id).copied()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Best (highest) bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Size resting at the best bid
    pub fn best_bid_size(&self) -> Option<Decimal> {
        self.bids.values().next().map(level_size)
    }

    /// Size resting at the best ask
    pub fn best_ask_size(&self) -> Option<Decimal> {
        self.asks.values().next().map(level_size)
    }

    /// Best ask minus best bid; negative when crossed
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Total resting bid size
    pub fn total_bid_size(&self) -> Decimal {
        self.total_bid_size
    }

    /// Total resting ask size
    pub fn total_ask_size(&self) -> Decimal {
        self.total_ask_size
    }

    /// Total size of every resting order
    pub fn total_volume_pending(&self) -> Decimal {
        self.total_bid_size + self.total_ask_size
    }

    /// Aggregated size per price level, at most `depth` levels per side
    pub fn market_depth(&self, depth: usize) -> MarketDepth {
        MarketDepth {
            asks: self
                .asks
                .iter()
                .take(depth)
                .map(|(price, level)| (*price, level_size(level)))
                .collect(),
            bids: self
                .bids
                .iter()
                .take(depth)
                .map(|(price, level)| (price.0, level_size(level)))
                .collect(),
        }
    }

    /// Number of resting orders
    pub fn order_count(&self) -> usize {
        self.locations.len()
    }

    /// Last id handed out
    pub fn last_order_id(&self) -> OrderId {
        self.last_order_id
    }

    /// Check if no order rests
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

fn level_size(level: &Level) -> Decimal {
    level.values().copied().sum()
}

/// Remove one order from a price level, dropping the level once empty
fn remove_from_level<K: Ord>(side: &mut BTreeMap<K, Level>, key: &K, order_id: OrderId) -> Decimal {
    let Some(level) = side.get_mut(key) else {
        return Decimal::ZERO;
    };
    let size = level.remove(&order_id).unwrap_or_default();
    if level.is_empty() {
        side.remove(key);
    }
    size
}
