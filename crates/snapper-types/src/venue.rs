//! Venue and side enums

use crate::error::SnapperError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Streaming venues supported by the snapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    /// Coinbase Exchange level2 feed
    Coinbase,
    /// Bitstamp order book channels
    Bitstamp,
    /// Kraken v1 book channel
    Kraken,
}

impl Venue {
    /// All supported venues
    pub const ALL: [Venue; 3] = [Venue::Coinbase, Venue::Bitstamp, Venue::Kraken];

    /// Provider name as stored in persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coinbase => "coinbase",
            Self::Bitstamp => "bitstamp",
            Self::Kraken => "kraken",
        }
    }

    /// Public WebSocket endpoint
    pub fn ws_url(&self) -> &'static str {
        match self {
            Self::Coinbase => "wss://ws-feed.exchange.coinbase.com",
            Self::Bitstamp => "wss://ws.bitstamp.net",
            Self::Kraken => "wss://ws.kraken.com/",
        }
    }
}

impl FromStr for Venue {
    type Err = SnapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coinbase" => Ok(Self::Coinbase),
            "bitstamp" => Ok(Self::Bitstamp),
            "kraken" => Ok(Self::Kraken),
            _ => Err(SnapperError::UnsupportedVenue(s.to_string())),
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Resting buy interest
    Bid,
    /// Resting sell interest
    Ask,
}
