//! Canonical trading pairs (BASE-COUNTER format)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Internal pair identifier, independent of any venue's spelling
///
/// Always upper-case, rendered as `BASE-COUNTER`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalPair {
    /// Base asset (e.g., "BTC")
    pub base: String,
    /// Counter asset (e.g., "USD")
    pub counter: String,
}

impl CanonicalPair {
    /// Create a pair, upper-casing both assets
    pub fn new(base: impl AsRef<str>, counter: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().to_ascii_uppercase(),
            counter: counter.as_ref().to_ascii_uppercase(),
        }
    }

    /// Base asset
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Counter asset
    pub fn counter(&self) -> &str {
        &self.counter
    }
}

impl FromStr for CanonicalPair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.contains('-') {
            return Err(PairParseError::MissingDash(s.to_string()));
        }

        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 2 {
            return Err(PairParseError::InvalidFormat(s.to_string()));
        }

        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(PairParseError::EmptyPart(s.to_string()));
        }

        Ok(Self::new(parts[0], parts[1]))
    }
}

impl fmt::Display for CanonicalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.counter)
    }
}

/// Error parsing an internal pair identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairParseError {
    #[error("pair must contain '-': {0}")]
    MissingDash(String),

    #[error("invalid pair format: {0}")]
    InvalidFormat(String),

    #[error("pair has empty base or counter: {0}")]
    EmptyPart(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_parse() {
        let pair: CanonicalPair = "btc-usd".parse().unwrap();
        assert_eq!(pair.base(), "BTC");
        assert_eq!(pair.counter(), "USD");
        assert_eq!(pair.to_string(), "BTC-USD");
    }

    #[test]
    fn test_pair_parse_error() {
        assert!(matches!(
            "BTCUSD".parse::<CanonicalPair>(),
            Err(PairParseError::MissingDash(_))
        ));
        assert!(matches!(
            "BTC-USD-X".parse::<CanonicalPair>(),
            Err(PairParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "-USD".parse::<CanonicalPair>(),
            Err(PairParseError::EmptyPart(_))
        ));
    }
}
