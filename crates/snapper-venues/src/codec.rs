//! Pair codec: internal `BASE-COUNTER` pairs ↔ venue-native symbols
//!
//! | Venue | Native form | Decode |
//! |---|---|---|
//! | Coinbase | `BTC-USD` | split on `-` |
//! | Bitstamp | `btcusd` | symbol table lookup, pass-through if unseen |
//! | Kraken | `XBT/USD` | split on `/`, asset aliases |
//!
//! All tables are filled before the codec is shared and are read-only after.

use serde::Deserialize;
use snapper_types::{CanonicalPair, SnapperError, Venue};
use std::collections::HashMap;
use std::path::Path;

/// One-directional asset rename table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable(HashMap<String, String>);

impl AliasTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from `(from, to)` pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(from, to)| (from.to_ascii_uppercase(), to.to_ascii_uppercase()))
                .collect(),
        )
    }

    /// Upper-case the asset and rename it if listed
    pub fn apply(&self, asset: &str) -> String {
        let asset = asset.to_ascii_uppercase();
        self.0.get(&asset).cloned().unwrap_or(asset)
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Bitstamp trading pair entry (`trading-pairs-info` format)
#[derive(Debug, Clone, Deserialize)]
struct TradingPairInfo {
    url_symbol: String,
    name: String,
}

/// Bitstamp `url_symbol` → `BASE/COUNTER` name lookup
#[derive(Debug, Clone, Default)]
pub struct SymbolTable(HashMap<String, String>);

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of `{"url_symbol": .., "name": ..}` objects
    pub fn from_json_str(json: &str) -> Result<Self, SnapperError> {
        let entries: Vec<TradingPairInfo> = serde_json::from_str(json).map_err(|e| {
            SnapperError::Configuration(format!("invalid trading pairs table: {e}"))
        })?;

        Ok(Self(
            entries
                .into_iter()
                .map(|e| (e.url_symbol.to_ascii_lowercase(), e.name))
                .collect(),
        ))
    }

    /// Load the table from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SnapperError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SnapperError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Add one symbol
    pub fn insert(&mut self, url_symbol: impl Into<String>, name: impl Into<String>) {
        self.0
            .insert(url_symbol.into().to_ascii_lowercase(), name.into());
    }

    /// Look up a symbol's name
    pub fn get(&self, url_symbol: &str) -> Option<&str> {
        self.0
            .get(&url_symbol.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Number of known symbols
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Bidirectional pair ↔ native symbol mapping for every venue
#[derive(Debug, Clone)]
pub struct PairCodec {
    encoders: HashMap<Venue, AliasTable>,
    decoders: HashMap<Venue, AliasTable>,
    bitstamp_symbols: SymbolTable,
}

impl Default for PairCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PairCodec {
    /// Create a codec with the built-in alias tables
    pub fn new() -> Self {
        let mut encoders = HashMap::new();
        let mut decoders = HashMap::new();

        encoders.insert(
            Venue::Kraken,
            AliasTable::from_pairs([("BTC", "XBT"), ("DOGE", "XDG")]),
        );
        decoders.insert(
            Venue::Kraken,
            AliasTable::from_pairs([("XBT", "BTC"), ("XDG", "DOGE")]),
        );

        Self {
            encoders,
            decoders,
            bitstamp_symbols: SymbolTable::new(),
        }
    }

    /// Use a loaded Bitstamp symbol table
    pub fn with_bitstamp_symbols(mut self, table: SymbolTable) -> Self {
        self.bitstamp_symbols = table;
        self
    }

    /// Replace a venue's encode table
    pub fn with_encoder(mut self, venue: Venue, table: AliasTable) -> Self {
        self.encoders.insert(venue, table);
        self
    }

    /// Replace a venue's decode table
    pub fn with_decoder(mut self, venue: Venue, table: AliasTable) -> Self {
        self.decoders.insert(venue, table);
        self
    }

    /// Make a pair decodable on Bitstamp regardless of the loaded table
    pub fn register_bitstamp_pair(&mut self, pair: &CanonicalPair) {
        let base = self.encode_asset(Venue::Bitstamp, &pair.base);
        let counter = self.encode_asset(Venue::Bitstamp, &pair.counter);
        let url_symbol = format!("{base}{counter}").to_ascii_lowercase();
        self.bitstamp_symbols
            .insert(url_symbol, format!("{base}/{counter}"));
    }

    fn encode_asset(&self, venue: Venue, asset: &str) -> String {
        match self.encoders.get(&venue) {
            Some(table) => table.apply(asset),
            None => asset.to_ascii_uppercase(),
        }
    }

    fn decode_asset(&self, venue: Venue, asset: &str) -> String {
        match self.decoders.get(&venue) {
            Some(table) => table.apply(asset),
            None => asset.to_ascii_uppercase(),
        }
    }

    /// Internal pair → venue symbol
    pub fn encode(&self, pair: &CanonicalPair, venue: Venue) -> String {
        let base = self.encode_asset(venue, &pair.base);
        let counter = self.encode_asset(venue, &pair.counter);

        match venue {
            Venue::Coinbase => format!("{base}-{counter}"),
            Venue::Bitstamp => format!("{base}{counter}").to_ascii_lowercase(),
            Venue::Kraken => format!("{base}/{counter}"),
        }
    }

    /// Venue symbol → internal pair
    pub fn decode(&self, symbol: &str, venue: Venue) -> Result<CanonicalPair, SnapperError> {
        let (base, counter) = match venue {
            Venue::Coinbase => split_once_exact(symbol, '-')?,
            Venue::Kraken => split_once_exact(symbol, '/')?,
            Venue::Bitstamp => {
                let name = match self.bitstamp_symbols.get(symbol) {
                    Some(name) => name.to_ascii_uppercase(),
                    None => symbol.to_ascii_uppercase(),
                };
                return self.decode_bitstamp_name(symbol, &name);
            }
        };

        Ok(CanonicalPair::new(
            self.decode_asset(venue, base),
            self.decode_asset(venue, counter),
        ))
    }

    fn decode_bitstamp_name(
        &self,
        symbol: &str,
        name: &str,
    ) -> Result<CanonicalPair, SnapperError> {
        let (base, counter) = if name.contains('/') {
            split_once_exact(name, '/')?
        } else {
            // Unseen symbols: the last three characters are the counter
            if name.len() < 4 || !name.is_ascii() {
                return Err(SnapperError::InvalidPair(symbol.to_string()));
            }
            name.split_at(name.len() - 3)
        };

        Ok(CanonicalPair::new(
            self.decode_asset(Venue::Bitstamp, base),
            self.decode_asset(Venue::Bitstamp, counter),
        ))
    }

    /// Encode by textual venue and pair names
    pub fn encode_named(&self, pair: &str, venue: &str) -> Result<String, SnapperError> {
        let venue: Venue = venue.parse()?;
        let pair: CanonicalPair = pair
            .parse()
            .map_err(|e: snapper_types::PairParseError| SnapperError::InvalidPair(e.to_string()))?;
        Ok(self.encode(&pair, venue))
    }

    /// Decode by textual venue name
    pub fn decode_named(&self, symbol: &str, venue: &str) -> Result<CanonicalPair, SnapperError> {
        let venue: Venue = venue.parse()?;
        self.decode(symbol, venue)
    }
}

fn split_once_exact(symbol: &str, separator: char) -> Result<(&str, &str), SnapperError> {
    let mut parts = symbol.split(separator);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(base), Some(counter), None) if !base.is_empty() && !counter.is_empty() => {
            Ok((base, counter))
        }
        _ => Err(SnapperError::InvalidPair(symbol.to_string())),
    }
}
