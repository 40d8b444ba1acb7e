//! CRC32 checksum for Kraken book integrity
//!
//! # Algorithm
//!
//! 1. Use the top 10 levels of each side only
//! 2. Process asks first (low→high), then bids (high→low)
//! 3. For each level: take the price text then the size text exactly as
//!    published, remove the decimal point, strip leading zeros
//! 4. Apply standard CRC32 (ISO-HDLC, polynomial 0xEDB88320) to the
//!    concatenation
//!
//! Kraken v1 sends prices and sizes as strings, so the published scale is
//! kept by [`Decimal`] and no precision table is needed.

use crc32fast::Hasher;
use rust_decimal::Decimal;
use snapper_types::PriceLevel;

/// Number of levels per side covered by the checksum
pub const CHECKSUM_DEPTH: usize = 10;

/// Compute the CRC32 checksum of a book
///
/// `bids` must be best-first (descending), `asks` best-first (ascending).
pub fn compute_checksum<'a, B, A>(bids: B, asks: A) -> u32
where
    B: IntoIterator<Item = &'a PriceLevel>,
    A: IntoIterator<Item = &'a PriceLevel>,
{
    let mut hasher = Hasher::new();

    for level in asks.into_iter().take(CHECKSUM_DEPTH) {
        hasher.update(format_for_checksum(&level.price).as_bytes());
        hasher.update(format_for_checksum(&level.size).as_bytes());
    }

    for level in bids.into_iter().take(CHECKSUM_DEPTH) {
        hasher.update(format_for_checksum(&level.price).as_bytes());
        hasher.update(format_for_checksum(&level.size).as_bytes());
    }

    hasher.finalize()
}

/// Parse the venue's unsigned decimal checksum text
pub fn parse_checksum(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// Format a decimal for the checksum: drop the point, strip leading zeros
///
/// - 45285.2 → "452852"
/// - 0.00100000 → "100000"
fn format_for_checksum(value: &Decimal) -> String {
    let without_decimal = value.to_string().replace('.', "");
    let trimmed = without_decimal.trim_start_matches('0');

    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Checksum result with computed and expected values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumResult {
    /// The computed checksum
    pub computed: u32,
    /// The expected checksum from the venue
    pub expected: u32,
}

impl ChecksumResult {
    /// Create a new checksum result
    pub fn new(computed: u32, expected: u32) -> Self {
        Self { computed, expected }
    }

    /// Check if the checksum matches
    pub fn is_valid(&self) -> bool {
        self.computed == self.expected
    }
}
