//! Price level types with exact decimal precision

use rust_decimal::Decimal;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A single `(price, size)` level
///
/// Price and size are exact base-10 decimals. Parsing keeps the scale of the
/// wire text, so `"5541.30000"` prints back as `"5541.30000"`.
///
/// Serialized as a two-element JSON array of strings: `["price","size"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceLevel {
    /// Price of this level
    pub price: Decimal,
    /// Resting size at this price; zero means "delete this level"
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Parse a level from venue decimal text
    pub fn parse(price: &str, size: &str) -> Result<Self, LevelParseError> {
        Ok(Self {
            price: parse_decimal(price)?,
            size: parse_decimal(size)?,
        })
    }

    /// Check if this level is a deletion sentinel
    pub fn is_delete(&self) -> bool {
        self.size.is_zero()
    }
}

/// Parse decimal text without going through binary floating point
pub fn parse_decimal(text: &str) -> Result<Decimal, LevelParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LevelParseError::Empty);
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| LevelParseError::NotDecimal(text.to_string()))
}

/// Error parsing level text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelParseError {
    #[error("empty decimal field")]
    Empty,

    #[error("not a decimal: {0}")]
    NotDecimal(String),
}

impl Serialize for PriceLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.price.to_string())?;
        tuple.serialize_element(&self.size.to_string())?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for PriceLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(PriceLevelVisitor)
    }
}

struct PriceLevelVisitor;

impl<'de> Visitor<'de> for PriceLevelVisitor {
    type Value = PriceLevel;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a [price, size] array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PriceLevel, A::Error> {
        let price: StringOrNumber = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let size: StringOrNumber = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;

        // Venues append extra fields (timestamps, flags) we do not keep here
        while seq.next_element::<de::IgnoredAny>()?.is_some() {}

        PriceLevel::parse(&price.into_text(), &size.into_text()).map_err(de::Error::custom)
    }
}

/// JSON numbers are taken by their literal text, never as f64
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_text(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_preserves_text() {
        let level = PriceLevel::parse("5541.30000", "2.50000000").unwrap();
        assert_eq!(level.price.to_string(), "5541.30000");
        assert_eq!(level.size.to_string(), "2.50000000");
    }

    #[test]
    fn test_zero_sentinel() {
        assert!(PriceLevel::parse("100.0", "0").unwrap().is_delete());
        assert!(PriceLevel::parse("100.0", "0.00000000").unwrap().is_delete());
        assert!(!PriceLevel::parse("100.0", "0.1").unwrap().is_delete());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(PriceLevel::parse("", "1"), Err(LevelParseError::Empty));
        assert!(matches!(
            PriceLevel::parse("abc", "1"),
            Err(LevelParseError::NotDecimal(_))
        ));
    }

    #[test]
    fn test_serialize_as_string_pair() {
        let level = PriceLevel::new(dec!(100.0), dec!(2.5));
        let json = serde_json::to_string(&level).unwrap();
        assert_eq!(json, r#"["100.0","2.5"]"#);
    }

    #[test]
    fn test_deserialize_ignores_extra_fields() {
        let level: PriceLevel =
            serde_json::from_str(r#"["100.0","2.5","1690000000.1","r"]"#).unwrap();
        assert_eq!(level.price, dec!(100.0));
        assert_eq!(level.size, dec!(2.5));
    }

    #[test]
    fn test_deserialize_number_literal() {
        let level: PriceLevel = serde_json::from_str(r#"[88813.5, 0.00460208]"#).unwrap();
        assert_eq!(level.price.to_string(), "88813.5");
        assert_eq!(level.size.to_string(), "0.00460208");
    }
}
