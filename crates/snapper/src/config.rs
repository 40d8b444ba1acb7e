//! Configuration
//!
//! A TOML file lists one `[[session]]` per venue plus shared tunables. Every
//! tunable has a default, so the smallest useful file is:
//!
//! ```toml
//! [[session]]
//! venue = "kraken"
//! pairs = ["BTC-USD"]
//! ```
//!
//! The file is validated into one [`SessionConfig`] per venue. Sessions can
//! also be built in code:
//!
//! ```
//! use snapper::config::SessionConfig;
//! use snapper_types::{CanonicalPair, Venue};
//! use std::time::Duration;
//!
//! let config = SessionConfig::new(Venue::Coinbase, vec![CanonicalPair::new("BTC", "USD")])
//!     .with_commit_interval(Duration::from_secs(5))
//!     .with_commit_failure_limit(10);
//! assert!(config.validate().is_ok());
//! ```

use serde::Deserialize;
use snapper_types::{CanonicalPair, SnapperError, Venue, FULL_DEPTH};
use snapper_venues::subscribe::{
    DEFAULT_BITSTAMP_CHANNELS, DEFAULT_COINBASE_CHANNEL, DEFAULT_KRAKEN_DEPTH,
};
use snapper_venues::{PairCodec, SubscriptionOptions, SymbolTable};
use snapper_ws::reconnect::{DEFAULT_BACKOFF, DEFAULT_FAILURE_LIMIT};
use snapper_ws::{ReconnectPolicy, DEFAULT_CONNECT_TIMEOUT};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Levels per side in a Bitstamp `order_book` snapshot
pub const BITSTAMP_SNAPSHOT_DEPTH: i32 = 100;

/// Book depths the Kraken book channel accepts
pub const KRAKEN_DEPTHS: [u32; 5] = [10, 25, 100, 500, 1000];

/// Consecutive commit failures tolerated before a session aborts
pub const DEFAULT_COMMIT_FAILURE_LIMIT: u32 = 3;

/// Progress is logged every this many messages
pub const DEFAULT_LOG_EVERY_MESSAGES: u64 = 10_000;

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    /// File is not valid TOML or has the wrong shape
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// No `[[session]]` entries
    #[error("at least one session must be configured")]
    NoSessions,

    /// Venue name is not supported
    #[error("unsupported venue: {0}")]
    UnsupportedVenue(String),

    /// Two sessions for the same venue
    #[error("venue {0} is configured more than once")]
    DuplicateVenue(Venue),

    /// Session without pairs
    #[error("session for {0} has no pairs")]
    NoPairs(Venue),

    /// Pair is not `BASE-COUNTER`
    #[error("invalid pair {pair}: {reason}")]
    InvalidPair { pair: String, reason: String },

    /// Numeric setting out of range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// Bitstamp symbol table could not be loaded
    #[error("failed to load symbol table: {0}")]
    SymbolTable(String),
}

impl From<ConfigError> for SnapperError {
    fn from(e: ConfigError) -> Self {
        SnapperError::Configuration(e.to_string())
    }
}

/// One `[[session]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionEntry {
    /// Provider name: `coinbase`, `bitstamp` or `kraken`
    pub venue: String,
    /// Internal pairs, `BASE-COUNTER`
    pub pairs: Vec<String>,
}

/// Contents of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapperConfig {
    /// Directory receiving one `<venue>.jsonl` file per session
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// JSON file mapping Bitstamp url symbols to pair names
    #[serde(default)]
    pub bitstamp_symbols: Option<PathBuf>,

    #[serde(default = "default_reconnect_failure_limit")]
    pub reconnect_failure_limit: u32,

    #[serde(default = "default_reconnect_backoff_secs")]
    pub reconnect_backoff_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// 0 commits every record
    #[serde(default)]
    pub commit_interval_secs: u64,

    #[serde(default = "default_commit_failure_limit")]
    pub commit_failure_limit: u32,

    #[serde(default = "default_log_every_messages")]
    pub log_every_messages: u64,

    #[serde(default = "default_kraken_depth")]
    pub kraken_depth: u32,

    #[serde(default = "default_coinbase_channel")]
    pub coinbase_channel: String,

    #[serde(default = "default_bitstamp_channels")]
    pub bitstamp_channels: Vec<String>,

    #[serde(default, rename = "session")]
    pub sessions: Vec<SessionEntry>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_reconnect_failure_limit() -> u32 {
    DEFAULT_FAILURE_LIMIT
}

fn default_reconnect_backoff_secs() -> u64 {
    DEFAULT_BACKOFF.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_commit_failure_limit() -> u32 {
    DEFAULT_COMMIT_FAILURE_LIMIT
}

fn default_log_every_messages() -> u64 {
    DEFAULT_LOG_EVERY_MESSAGES
}

fn default_kraken_depth() -> u32 {
    DEFAULT_KRAKEN_DEPTH
}

fn default_coinbase_channel() -> String {
    DEFAULT_COINBASE_CHANNEL.to_string()
}

fn default_bitstamp_channels() -> Vec<String> {
    DEFAULT_BITSTAMP_CHANNELS.iter().map(|c| c.to_string()).collect()
}

impl SnapperConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate every session and expand it with the shared tunables
    pub fn session_configs(&self) -> Result<Vec<SessionConfig>, ConfigError> {
        if self.sessions.is_empty() {
            return Err(ConfigError::NoSessions);
        }

        let mut seen = HashSet::new();
        let mut configs = Vec::with_capacity(self.sessions.len());

        for entry in &self.sessions {
            let venue: Venue = entry
                .venue
                .parse()
                .map_err(|_| ConfigError::UnsupportedVenue(entry.venue.clone()))?;
            if !seen.insert(venue) {
                return Err(ConfigError::DuplicateVenue(venue));
            }

            let pairs = entry
                .pairs
                .iter()
                .map(|p| {
                    p.parse::<CanonicalPair>().map_err(|e| ConfigError::InvalidPair {
                        pair: p.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let config = SessionConfig::new(venue, pairs)
                .with_reconnect_policy(
                    ReconnectPolicy::new()
                        .with_failure_limit(self.reconnect_failure_limit)
                        .with_backoff(Duration::from_secs(self.reconnect_backoff_secs)),
                )
                .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
                .with_commit_interval(Duration::from_secs(self.commit_interval_secs))
                .with_commit_failure_limit(self.commit_failure_limit)
                .with_log_every(self.log_every_messages)
                .with_subscription(SubscriptionOptions {
                    coinbase_channel: self.coinbase_channel.clone(),
                    bitstamp_channels: self.bitstamp_channels.clone(),
                    kraken_depth: self.kraken_depth,
                });

            config.validate()?;
            configs.push(config);
        }

        Ok(configs)
    }

    /// Build the shared pair codec, loading the Bitstamp table if configured
    pub fn codec(&self, sessions: &[SessionConfig]) -> Result<PairCodec, ConfigError> {
        let mut codec = PairCodec::new();

        if let Some(path) = &self.bitstamp_symbols {
            let table = SymbolTable::from_json_file(path)
                .map_err(|e| ConfigError::SymbolTable(e.to_string()))?;
            codec = codec.with_bitstamp_symbols(table);
        }

        for session in sessions.iter().filter(|s| s.venue == Venue::Bitstamp) {
            for pair in &session.pairs {
                codec.register_bitstamp_pair(pair);
            }
        }

        Ok(codec)
    }
}

/// Settings of one venue session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Venue to connect to
    pub venue: Venue,
    /// Pairs to subscribe
    pub pairs: Vec<CanonicalPair>,
    /// Reconnect ceiling and backoff
    pub reconnect: ReconnectPolicy,
    /// Handshake timeout
    pub connect_timeout: Duration,
    /// Minimum time between commits of non-snapshot records
    pub commit_interval: Duration,
    /// Consecutive commit failures tolerated
    pub commit_failure_limit: u32,
    /// Log counters every this many messages
    pub log_every_messages: u64,
    /// Venue subscription knobs
    pub subscription: SubscriptionOptions,
}

impl SessionConfig {
    /// Create a session config with default tunables
    pub fn new(venue: Venue, pairs: Vec<CanonicalPair>) -> Self {
        Self {
            venue,
            pairs,
            reconnect: ReconnectPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            commit_interval: Duration::ZERO,
            commit_failure_limit: DEFAULT_COMMIT_FAILURE_LIMIT,
            log_every_messages: DEFAULT_LOG_EVERY_MESSAGES,
            subscription: SubscriptionOptions::default(),
        }
    }

    /// Set the reconnect policy
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the commit interval
    pub fn with_commit_interval(mut self, interval: Duration) -> Self {
        self.commit_interval = interval;
        self
    }

    /// Set the commit failure ceiling
    pub fn with_commit_failure_limit(mut self, limit: u32) -> Self {
        self.commit_failure_limit = limit;
        self
    }

    /// Set the progress log cadence
    pub fn with_log_every(mut self, messages: u64) -> Self {
        self.log_every_messages = messages;
        self
    }

    /// Set the subscription options
    pub fn with_subscription(mut self, options: SubscriptionOptions) -> Self {
        self.subscription = options;
        self
    }

    /// Levels kept per side; `None` keeps the full book
    pub fn max_depth(&self) -> Option<usize> {
        match self.venue {
            Venue::Kraken => Some(self.subscription.kraken_depth as usize),
            Venue::Coinbase | Venue::Bitstamp => None,
        }
    }

    /// Depth stored on snapshot records
    pub fn level_depth(&self) -> i32 {
        match self.venue {
            Venue::Bitstamp => BITSTAMP_SNAPSHOT_DEPTH,
            Venue::Coinbase | Venue::Kraken => self
                .max_depth()
                .and_then(|d| i32::try_from(d).ok())
                .unwrap_or(FULL_DEPTH),
        }
    }

    /// Check the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pairs.is_empty() {
            return Err(ConfigError::NoPairs(self.venue));
        }
        if self.commit_failure_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "commit_failure_limit",
                reason: "must be at least 1".into(),
            });
        }
        if self.log_every_messages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "log_every_messages",
                reason: "must be at least 1".into(),
            });
        }
        if self.connect_timeout < Duration::from_secs(1) {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_secs",
                reason: "must be at least 1 second".into(),
            });
        }
        let depth = self.subscription.kraken_depth;
        if self.venue == Venue::Kraken && !KRAKEN_DEPTHS.contains(&depth) {
            return Err(ConfigError::InvalidValue {
                field: "kraken_depth",
                reason: format!("{depth} (supported: 10, 25, 100, 500, 1000)"),
            });
        }
        if self.venue == Venue::Bitstamp && self.subscription.bitstamp_channels.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "bitstamp_channels",
                reason: "at least one channel is required".into(),
            });
        }
        Ok(())
    }
}
