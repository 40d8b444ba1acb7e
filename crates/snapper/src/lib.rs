//! Multi-venue order book snapper
//!
//! Streams public order-book feeds from Coinbase, Bitstamp and Kraken,
//! reconstructs one book per pair and appends every classified event to a
//! durable sink for later analysis.
//!
//! # Architecture
//!
//! - `snapper-types`: canonical events, records and errors
//! - `snapper-venues`: pair codec, per-venue classifiers, subscriptions
//! - `snapper-book`: book reconstruction and checksum validation
//! - `snapper-ws`: transport and bounded reconnect supervision
//! - `snapper` (this crate): sessions, persistence, configuration
//!
//! # Example
//!
//! ```no_run
//! use snapper::{Orchestrator, SnapperConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SnapperConfig::from_file("config/snapper.toml")?;
//!     let sessions = config.session_configs()?;
//!     let codec = config.codec(&sessions)?;
//!
//!     let exits = Orchestrator::new(sessions, codec, &config.output_dir).run().await;
//!     for exit in exits {
//!         eprintln!("{} stopped: {}", exit.venue, exit.error);
//!     }
//!     Ok(())
//! }
//! ```

pub mod commit;
pub mod config;
pub mod persistence;
pub mod session;
pub mod stats;

// Re-export main types
pub use commit::CommitTracker;
pub use config::{ConfigError, SessionConfig, SnapperConfig};
pub use persistence::{JsonlSink, MemorySink, PersistenceError, PersistenceSink, StoredRecord};
pub use session::{run_sessions, Orchestrator, Session, SessionExit};
pub use stats::SessionStats;
