//! Connection layer for snapper venue sessions
//!
//! A [`ConnectionSupervisor`] owns one [`Transport`], resends the venue's
//! subscription payloads after every connect and hides transient failures
//! behind a bounded [`ReconnectPolicy`]. Once the ceiling is hit the session
//! is `Failed` and every further receive reports `ReconnectExhausted`.
//!
//! # Example
//!
//! ```no_run
//! use snapper_types::Venue;
//! use snapper_ws::{ConnectionSupervisor, ReconnectPolicy, WsTransport};
//!
//! # async fn run() -> snapper_types::SnapperResult<()> {
//! let transport = WsTransport::new(Venue::Kraken.ws_url());
//! let subscribe =
//!     r#"{"event":"subscribe","pair":["XBT/USD"],"subscription":{"name":"book","depth":10}}"#;
//! let mut supervisor = ConnectionSupervisor::new(
//!     Venue::Kraken,
//!     transport,
//!     vec![subscribe.to_string()],
//!     ReconnectPolicy::default(),
//! );
//!
//! supervisor.start().await?;
//! loop {
//!     let frame = supervisor.recv().await?;
//!     println!("{frame}");
//! }
//! # }
//! ```

pub mod reconnect;
pub mod supervisor;
pub mod transport;

// Re-export main types
pub use reconnect::ReconnectPolicy;
pub use supervisor::{ConnectionCounters, ConnectionState, ConnectionSupervisor};
pub use transport::{Transport, TransportError, WsTransport, DEFAULT_CONNECT_TIMEOUT};

#[cfg(any(test, feature = "test-utils"))]
pub use transport::MockTransport;
