//! Shared canonical types for the multi-venue order book snapper
//!
//! Every venue's wire protocol is normalized into the types defined here.
//! The crate has no networking and no async runtime dependency.
//!
//! # Key Types
//!
//! - [`Venue`], [`Side`] - Venue identifiers and book sides
//! - [`CanonicalPair`] - Internal `BASE-COUNTER` pair identifier
//! - [`PriceLevel`] - Exact-decimal price/size level
//! - [`ClassifiedEvent`] - Closed variant produced by venue classifiers
//! - [`EventRecord`] - Persisted record shapes
//! - [`SnapperError`] - Error taxonomy

pub mod error;
pub mod event;
pub mod level;
pub mod pair;
pub mod record;
pub mod venue;

// Re-export commonly used types
pub use error::*;
pub use event::*;
pub use level::*;
pub use pair::*;
pub use record::*;
pub use venue::*;

// Re-export for users that only need the decimal type
pub use rust_decimal::Decimal;
