//! Error taxonomy shared by every snapper layer

use thiserror::Error;

/// Main error type for snapper operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapperError {
    // === Connection Errors ===
    /// Transport failed to connect, send or receive
    #[error("Transient network error on {venue}: {message}")]
    TransientNetwork { venue: String, message: String },

    /// Reconnection kept failing until the ceiling was hit
    #[error("Reconnect exhausted on {venue}: {attempts}/{limit} consecutive failures")]
    ReconnectExhausted {
        venue: String,
        attempts: u32,
        limit: u32,
    },

    // === Protocol Errors ===
    /// Message could not be classified
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Reconstructed book disagrees with the venue checksum
    #[error("Book desync for {pair}: expected checksum {expected}, computed {computed}")]
    Desync {
        pair: String,
        expected: u32,
        computed: u32,
    },

    // === Persistence Errors ===
    /// Sink kept rejecting writes until the ceiling was exceeded
    #[error("Persistence write failed {consecutive} times in a row (limit {limit}): {message}")]
    PersistenceWrite {
        consecutive: u32,
        limit: u32,
        message: String,
    },

    // === Input Errors ===
    /// Venue name is not one of the supported providers
    #[error("Unsupported venue: {0}")]
    UnsupportedVenue(String),

    /// Symbol or pair text has no valid base/counter split
    #[error("Invalid pair: {0}")]
    InvalidPair(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// How the owning layer should react to an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Reconnect and resubscribe
    Reconnect,
    /// Drop the book for the pair and ask the venue for a fresh snapshot
    Resnapshot,
    /// Log and move on to the next message
    Skip,
    /// Stop the session
    Fatal,
}

impl SnapperError {
    /// Returns true if this error terminates the owning session
    pub fn is_fatal(&self) -> bool {
        matches!(self.recovery_strategy(), RecoveryStrategy::Fatal)
    }

    /// Get the recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            Self::TransientNetwork { .. } => RecoveryStrategy::Reconnect,
            Self::MalformedMessage(_) => RecoveryStrategy::Skip,
            Self::Desync { .. } => RecoveryStrategy::Resnapshot,
            Self::InvalidPair(_) => RecoveryStrategy::Skip,
            Self::ReconnectExhausted { .. }
            | Self::PersistenceWrite { .. }
            | Self::UnsupportedVenue(_)
            | Self::Configuration(_) => RecoveryStrategy::Fatal,
        }
    }

    /// Create a transient network error
    pub fn network(venue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            venue: venue.into(),
            message: message.into(),
        }
    }

    /// Create a desync error
    pub fn desync(pair: impl Into<String>, expected: u32, computed: u32) -> Self {
        Self::Desync {
            pair: pair.into(),
            expected,
            computed,
        }
    }
}

/// Result type alias for snapper operations
pub type SnapperResult<T> = Result<T, SnapperError>;
