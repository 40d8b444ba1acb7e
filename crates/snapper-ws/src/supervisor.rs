//! Connection lifecycle for one venue session
//!
//! `Disconnected → Connecting → Subscribed → Streaming`, back to
//! `Connecting` on any receive failure and on to `Failed` once reconnecting
//! has failed `failure_limit` times in a row. A connection that drops before
//! delivering its first frame counts as a failed reconnect, so connect-then-drop
//! loops back off and hit the same ceiling. Subscriptions are resent after
//! every successful connect.

use crate::reconnect::ReconnectPolicy;
use crate::transport::{Transport, TransportError};
use snapper_types::{SnapperError, SnapperResult, Venue};
use std::fmt;
use tracing::{error, info, warn};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Connecting (initially or after a receive failure)
    Connecting,
    /// Connected and subscriptions sent
    Subscribed,
    /// At least one frame received on this connection
    Streaming,
    /// Reconnect ceiling reached; terminal
    Failed,
}

/// Connection counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionCounters {
    /// Receive failures since the last successful receive
    pub consecutive_receive_failures: u32,
    /// Failed reconnects since the last successful receive
    pub consecutive_reconnect_failures: u32,
    /// Frames received
    pub messages_received: u64,
    /// Receive failures, graceful closes included
    pub receive_failures: u64,
    /// Graceful closes by the peer
    pub closed_connections: u64,
    /// Successful reconnects after a receive failure
    pub reconnects: u64,
}

/// Owns a transport and keeps it subscribed
pub struct ConnectionSupervisor<T: Transport> {
    venue: Venue,
    transport: T,
    policy: ReconnectPolicy,
    subscriptions: Vec<String>,
    state: ConnectionState,
    counters: ConnectionCounters,
}

impl<T: Transport> ConnectionSupervisor<T> {
    /// Supervise `transport`, sending `subscriptions` after every connect
    pub fn new(
        venue: Venue,
        transport: T,
        subscriptions: Vec<String>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            venue,
            transport,
            policy,
            subscriptions,
            state: ConnectionState::Disconnected,
            counters: ConnectionCounters::default(),
        }
    }

    /// Venue of this connection
    pub fn venue(&self) -> Venue {
        self.venue
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current counters
    pub fn counters(&self) -> ConnectionCounters {
        self.counters
    }

    /// Reconnect policy in effect
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Connect and subscribe, retrying under the reconnect policy
    pub async fn start(&mut self) -> SnapperResult<()> {
        self.transition(ConnectionState::Connecting);
        self.connect_with_retry().await
    }

    /// Next text frame, reconnecting transparently on failure
    ///
    /// Only returns an error once the session has failed.
    pub async fn recv(&mut self) -> SnapperResult<String> {
        loop {
            if self.state == ConnectionState::Failed {
                return Err(self.exhausted());
            }

            match self.transport.recv().await {
                Ok(Some(text)) => {
                    self.on_receive();
                    return Ok(text);
                }
                Ok(None) => {
                    self.counters.closed_connections += 1;
                    let cause =
                        SnapperError::network(self.venue.as_str(), "connection closed by peer");
                    self.on_receive_failure(cause).await?;
                }
                Err(e) => {
                    let cause = SnapperError::network(self.venue.as_str(), e.to_string());
                    self.on_receive_failure(cause).await?;
                }
            }
        }
    }

    /// Send an extra frame on the current connection
    ///
    /// Failures are logged and returned; the next `recv` surfaces the
    /// broken connection and drives the reconnect.
    pub async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let result = self.transport.send(message).await;
        if let Err(e) = &result {
            warn!("{} send failed: {}", self.venue, e);
        }
        result
    }

    /// Close the transport
    pub async fn close(&mut self) -> Result<(), TransportError> {
        let result = self.transport.close().await;
        if self.state != ConnectionState::Failed {
            self.transition(ConnectionState::Disconnected);
        }
        result
    }

    fn on_receive(&mut self) {
        self.counters.messages_received += 1;
        self.counters.consecutive_receive_failures = 0;
        self.counters.consecutive_reconnect_failures = 0;
        if self.state == ConnectionState::Subscribed {
            self.transition(ConnectionState::Streaming);
        }
    }

    async fn on_receive_failure(&mut self, cause: SnapperError) -> SnapperResult<()> {
        self.counters.receive_failures += 1;
        self.counters.consecutive_receive_failures += 1;

        // A connection that dies before its first frame is a failed reconnect
        if self.state == ConnectionState::Subscribed {
            self.reconnect_failed(&cause).await?;
        } else {
            warn!("{}, reconnecting", cause);
        }

        self.transition(ConnectionState::Connecting);
        self.connect_with_retry().await?;
        self.counters.reconnects += 1;
        Ok(())
    }

    async fn connect_with_retry(&mut self) -> SnapperResult<()> {
        loop {
            match self.connect_and_subscribe().await {
                Ok(()) => {
                    self.transition(ConnectionState::Subscribed);
                    return Ok(());
                }
                Err(e) => self.reconnect_failed(&e).await?,
            }
        }
    }

    /// Count one failed reconnect; errors at the ceiling, otherwise backs off
    async fn reconnect_failed(&mut self, cause: &(dyn fmt::Display + Sync)) -> SnapperResult<()> {
        self.counters.consecutive_reconnect_failures += 1;
        let failures = self.counters.consecutive_reconnect_failures;

        if !self.policy.should_retry(failures) {
            error!(
                "{} reconnect failed {}/{} times in a row, giving up: {}",
                self.venue, failures, self.policy.failure_limit, cause
            );
            self.transition(ConnectionState::Failed);
            return Err(self.exhausted());
        }

        warn!(
            "{} reconnect failed ({}/{}): {}, retrying in {:?}",
            self.venue, failures, self.policy.failure_limit, cause, self.policy.backoff
        );
        tokio::time::sleep(self.policy.backoff).await;
        Ok(())
    }

    async fn connect_and_subscribe(&mut self) -> Result<(), TransportError> {
        if self.transport.is_connected() {
            let _ = self.transport.close().await;
        }
        self.transport.connect().await?;
        for message in &self.subscriptions {
            self.transport.send(message).await?;
        }
        info!(
            "{} connected to {} and sent {} subscription message(s)",
            self.venue,
            self.transport.endpoint(),
            self.subscriptions.len()
        );
        Ok(())
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!("{} connection {:?} -> {:?}", self.venue, self.state, next);
            self.state = next;
        }
    }

    fn exhausted(&self) -> SnapperError {
        SnapperError::ReconnectExhausted {
            venue: self.venue.to_string(),
            attempts: self.counters.consecutive_reconnect_failures,
            limit: self.policy.failure_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::time::Duration;

    const SUBSCRIBE: &str = r#"{"event":"subscribe"}"#;

    fn supervisor(transport: MockTransport) -> ConnectionSupervisor<MockTransport> {
        ConnectionSupervisor::new(
            Venue::Kraken,
            transport,
            vec![SUBSCRIBE.to_string()],
            ReconnectPolicy::new().with_backoff(Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_start_subscribes_then_streams() {
        let mut transport = MockTransport::new("wss://mock.test");
        transport.push_response("a");
        let mut sup = supervisor(transport);

        assert_eq!(sup.state(), ConnectionState::Disconnected);
        sup.start().await.unwrap();
        assert_eq!(sup.state(), ConnectionState::Subscribed);
        assert_eq!(sup.transport().sent_messages, vec![SUBSCRIBE.to_string()]);

        assert_eq!(sup.recv().await.unwrap(), "a");
        assert_eq!(sup.state(), ConnectionState::Streaming);
    }

    #[tokio::test]
    async fn test_reconnect_ceiling_is_fatal() {
        let mut transport = MockTransport::new("wss://mock.test");
        transport.push_response("a");
        transport.push_error(TransportError::ReceiveFailed("reset".into()));
        let mut sup = supervisor(transport);
        sup.start().await.unwrap();
        sup.recv().await.unwrap();

        sup.transport_mut().fail_next_connects(5);
        let err = sup.recv().await.unwrap_err();

        assert_eq!(
            err,
            SnapperError::ReconnectExhausted {
                venue: "kraken".into(),
                attempts: 5,
                limit: 5
            }
        );
        assert!(err.is_fatal());
        assert_eq!(sup.state(), ConnectionState::Failed);
        assert_eq!(sup.transport().connect_attempts, 6);
        assert!(sup.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_success_below_ceiling_resets_counter() {
        let mut transport = MockTransport::new("wss://mock.test");
        transport.push_response("a");
        transport.push_error(TransportError::ConnectionClosed);
        transport.push_response("b");
        let mut sup = supervisor(transport);
        sup.start().await.unwrap();
        sup.recv().await.unwrap();

        sup.transport_mut().fail_next_connects(4);
        assert_eq!(sup.recv().await.unwrap(), "b");

        let counters = sup.counters();
        assert_eq!(counters.consecutive_reconnect_failures, 0);
        assert_eq!(counters.consecutive_receive_failures, 0);
        assert_eq!(counters.reconnects, 1);
        assert_eq!(counters.receive_failures, 1);
        assert_eq!(sup.state(), ConnectionState::Streaming);
        // Subscriptions are resent on the new connection
        assert_eq!(sup.transport().sent_messages.len(), 2);
    }

    #[tokio::test]
    async fn test_graceful_close_reconnects() {
        let mut transport = MockTransport::new("wss://mock.test");
        transport.push_close();
        transport.push_response("after");
        let mut sup = supervisor(transport);
        sup.start().await.unwrap();

        assert_eq!(sup.recv().await.unwrap(), "after");
        assert_eq!(sup.counters().closed_connections, 1);
        assert_eq!(sup.counters().reconnects, 1);
    }

    #[tokio::test]
    async fn test_initial_connect_exhausts() {
        let mut transport = MockTransport::new("wss://mock.test");
        transport.fail_next_connects(10);
        let mut sup = ConnectionSupervisor::new(
            Venue::Coinbase,
            transport,
            Vec::new(),
            ReconnectPolicy::new()
                .with_failure_limit(2)
                .with_backoff(Duration::ZERO),
        );

        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, SnapperError::ReconnectExhausted { attempts: 2, limit: 2, .. }));
        assert_eq!(sup.state(), ConnectionState::Failed);
    }

    /// Accepts every connect, then closes before sending anything
    #[derive(Default)]
    struct ClosesImmediately {
        connected: bool,
        connects: u32,
    }

    #[async_trait::async_trait]
    impl Transport for ClosesImmediately {
        async fn connect(&mut self) -> Result<(), TransportError> {
            self.connects += 1;
            self.connected = true;
            Ok(())
        }

        async fn send(&mut self, _message: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<String>, TransportError> {
            self.connected = false;
            Ok(None)
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn endpoint(&self) -> &str {
            "wss://closes.test"
        }
    }

    #[tokio::test]
    async fn test_connect_then_drop_is_bounded() {
        let backoff = Duration::from_millis(20);
        let mut sup = ConnectionSupervisor::new(
            Venue::Bitstamp,
            ClosesImmediately::default(),
            vec![SUBSCRIBE.to_string()],
            ReconnectPolicy::new().with_failure_limit(3).with_backoff(backoff),
        );
        sup.start().await.unwrap();

        let started = std::time::Instant::now();
        let err = sup.recv().await.unwrap_err();

        assert!(matches!(err, SnapperError::ReconnectExhausted { attempts: 3, limit: 3, .. }));
        assert_eq!(sup.state(), ConnectionState::Failed);
        // Two backoffs before the third failure gives up
        assert!(started.elapsed() >= backoff * 2);
        assert_eq!(sup.transport().connects, 3);
        assert_eq!(sup.counters().closed_connections, 3);
    }

    #[tokio::test]
    async fn test_first_frame_resets_dead_connection_count() {
        let mut transport = MockTransport::new("wss://mock.test");
        transport.push_close();
        transport.push_close();
        transport.push_response("a");
        transport.push_close();
        transport.push_response("b");
        let mut sup = supervisor(transport);
        sup.start().await.unwrap();

        assert_eq!(sup.recv().await.unwrap(), "a");
        assert_eq!(sup.counters().consecutive_reconnect_failures, 0);
        assert_eq!(sup.recv().await.unwrap(), "b");
        assert_eq!(sup.counters().consecutive_reconnect_failures, 0);
        assert_eq!(sup.counters().reconnects, 3);
    }
}
