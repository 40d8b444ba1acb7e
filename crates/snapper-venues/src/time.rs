//! Venue timestamp conversions, all without binary floating point

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use snapper_types::parse_decimal;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Parse an ISO-8601 / RFC 3339 timestamp
pub fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Parse integer microseconds since the Unix epoch
pub fn parse_unix_micros(text: &str) -> Option<DateTime<Utc>> {
    let micros: i64 = text.trim().parse().ok()?;
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

/// Parse `"<seconds>.<fraction>"` since the Unix epoch
pub fn parse_unix_seconds(text: &str) -> Option<Decimal> {
    parse_decimal(text).ok()
}

/// Convert decimal seconds since the Unix epoch to an instant
pub fn seconds_to_datetime(seconds: Decimal) -> Option<DateTime<Utc>> {
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * Decimal::from(NANOS_PER_SEC))
        .trunc()
        .to_u32()?;
    Utc.timestamp_opt(whole.to_i64()?, nanos).single()
}
