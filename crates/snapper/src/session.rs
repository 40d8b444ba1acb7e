//! Venue sessions and the orchestrator that runs them
//!
//! A [`Session`] wires one supervised connection, one venue adapter, the
//! venue's books and a persistence sink. Frames are handled strictly in
//! arrival order: classify, persist, apply. Only `ReconnectExhausted` and
//! `PersistenceWrite` end a session; everything else is logged and counted.

use crate::commit::CommitTracker;
use crate::config::SessionConfig;
use crate::persistence::{JsonlSink, PersistenceSink};
use crate::stats::SessionStats;
use chrono::Utc;
use snapper_book::{ApplyOutcome, BookSet};
use snapper_types::{
    BookDiff, BookSnapshot, ClassifiedEvent, ControlKind, EventRecord, LevelChanges,
    LevelDiffRecord, OverrideRecord, RecordId, RecoveryStrategy, SnapperError, SnapperResult,
    SnapshotRecord, Venue,
};
use snapper_venues::{adapter_for, PairCodec, SubscriptionPlan, VenueAdapter};
use snapper_ws::{ConnectionSupervisor, Transport, WsTransport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// One venue's ingest loop
pub struct Session<T: Transport, S: PersistenceSink> {
    config: SessionConfig,
    supervisor: ConnectionSupervisor<T>,
    adapter: Box<dyn VenueAdapter>,
    plan: SubscriptionPlan,
    books: BookSet,
    sink: S,
    commits: CommitTracker,
    stats: SessionStats,
}

impl<T: Transport, S: PersistenceSink> Session<T, S> {
    /// Assemble a session; nothing is connected until [`start`](Self::start)
    pub fn new(config: SessionConfig, codec: Arc<PairCodec>, transport: T, sink: S) -> Self {
        let plan = SubscriptionPlan::new(config.venue, &config.pairs, &codec)
            .with_options(config.subscription.clone());
        let supervisor = ConnectionSupervisor::new(
            config.venue,
            transport,
            plan.subscribe_messages(),
            config.reconnect.clone(),
        );
        let books = match config.max_depth() {
            Some(depth) => BookSet::with_depth(depth),
            None => BookSet::new(),
        };

        Self {
            adapter: adapter_for(config.venue, codec),
            commits: CommitTracker::new(config.commit_interval, config.commit_failure_limit),
            supervisor,
            plan,
            books,
            sink,
            stats: SessionStats::default(),
            config,
        }
    }

    /// Venue of this session
    pub fn venue(&self) -> Venue {
        self.config.venue
    }

    /// Books reconstructed so far
    pub fn books(&self) -> &BookSet {
        &self.books
    }

    /// Message counters
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Commit state
    pub fn commits(&self) -> &CommitTracker {
        &self.commits
    }

    /// The persistence sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The connection supervisor
    pub fn supervisor(&self) -> &ConnectionSupervisor<T> {
        &self.supervisor
    }

    /// The connection supervisor, mutably
    pub fn supervisor_mut(&mut self) -> &mut ConnectionSupervisor<T> {
        &mut self.supervisor
    }

    /// Connect, subscribe and process frames until a fatal error
    pub async fn run(&mut self) -> SnapperResult<()> {
        info!(
            "Starting {} session for {} pair(s): {:?}",
            self.venue(),
            self.config.pairs.len(),
            self.plan.symbols()
        );
        self.start().await?;
        loop {
            self.step().await?;
        }
    }

    /// Connect and subscribe
    pub async fn start(&mut self) -> SnapperResult<()> {
        self.supervisor.start().await
    }

    /// Receive and handle one frame
    pub async fn step(&mut self) -> SnapperResult<()> {
        let text = self.supervisor.recv().await?;
        self.handle_frame(&text).await
    }

    /// Classify one frame and act on it
    pub async fn handle_frame(&mut self, text: &str) -> SnapperResult<()> {
        let received_at = Utc::now();
        let event = self.adapter.classify(text);
        self.stats.record(&event);

        if self.stats.should_log(self.config.log_every_messages) {
            self.log_progress();
        }

        match event {
            ClassifiedEvent::Snapshot(snapshot) => self.on_snapshot(snapshot, received_at).await,
            ClassifiedEvent::Diff(diff) => self.on_diff(diff, received_at).await,
            ClassifiedEvent::LevelChanges(changes) => {
                self.on_level_changes(changes, received_at).await
            }
            ClassifiedEvent::Control(ControlKind::VenueError(message)) => {
                warn!("{} reported an error: {}", self.venue(), message);
                Ok(())
            }
            ClassifiedEvent::Control(kind) => {
                debug!("{} control message: {:?}", self.venue(), kind);
                Ok(())
            }
            ClassifiedEvent::Unknown { raw_payload } => {
                debug!("{} unclassified message: {}", self.venue(), raw_payload);
                Ok(())
            }
            ClassifiedEvent::Malformed { reason } => {
                warn!("{} malformed message discarded: {}", self.venue(), reason);
                Ok(())
            }
        }
    }

    async fn on_snapshot(
        &mut self,
        snapshot: BookSnapshot,
        received_at: chrono::DateTime<Utc>,
    ) -> SnapperResult<()> {
        let depth = self.config.level_depth();
        let record = SnapshotRecord::new(self.venue(), &snapshot, depth, received_at)
            .map(EventRecord::Snapshot);
        let snapshot_id = self.persist(record).await?;

        self.books.apply_snapshot(&snapshot, snapshot_id);
        info!(
            "{} snapshot for {} applied (record {:?})",
            self.venue(),
            snapshot.pair,
            snapshot_id
        );
        Ok(())
    }

    async fn on_diff(
        &mut self,
        diff: BookDiff,
        received_at: chrono::DateTime<Utc>,
    ) -> SnapperResult<()> {
        let snapshot_id = self.books.snapshot_id(&diff.pair);
        let record = OverrideRecord::new(self.venue(), &diff, snapshot_id, received_at)
            .map(EventRecord::Override);
        self.persist(record).await?;

        match self.books.apply_diff(&diff) {
            Ok(ApplyOutcome::Dropped) => {
                self.stats.dropped_diffs += 1;
                debug!("{} diff for {} dropped, no snapshot yet", self.venue(), diff.pair);
            }
            Ok(_) => {}
            Err(e) => {
                let err = SnapperError::from(e);
                warn!("{}: {}", self.venue(), err);
                match err.recovery_strategy() {
                    RecoveryStrategy::Resnapshot => {
                        self.stats.desyncs += 1;
                        self.resubscribe(&diff.native_symbol).await;
                    }
                    RecoveryStrategy::Skip => self.stats.diff_was_malformed(),
                    RecoveryStrategy::Reconnect | RecoveryStrategy::Fatal => return Err(err),
                }
            }
        }
        Ok(())
    }

    async fn on_level_changes(
        &mut self,
        changes: LevelChanges,
        received_at: chrono::DateTime<Utc>,
    ) -> SnapperResult<()> {
        let snapshot_id = self.books.snapshot_id(&changes.pair);
        let record = LevelDiffRecord::new(self.venue(), &changes, snapshot_id, received_at)
            .map(EventRecord::LevelDiff);
        self.persist(record).await?;
        Ok(())
    }

    async fn resubscribe(&mut self, native_symbol: &str) {
        info!("{} requesting a fresh snapshot for {}", self.venue(), native_symbol);
        for message in self.plan.resubscribe_messages(native_symbol) {
            if self.supervisor.send(&message).await.is_err() {
                break;
            }
        }
    }

    /// Accept a record and commit it when due; returns the record id if accepted
    async fn persist(
        &mut self,
        record: Result<EventRecord, serde_json::Error>,
    ) -> SnapperResult<Option<RecordId>> {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                self.commits.record_failure(&e.to_string())?;
                return Ok(None);
            }
        };
        let is_snapshot = record.is_snapshot();

        let id = match self.sink.accept(record).await {
            Ok(id) => id,
            Err(e) => {
                self.commits.record_failure(&e.to_string())?;
                return Ok(None);
            }
        };

        let now = Instant::now();
        if self.commits.should_commit(is_snapshot, now) {
            match self.sink.commit().await {
                Ok(()) => self.commits.record_success(now),
                Err(e) => self.commits.record_failure(&e.to_string())?,
            }
        }

        Ok(Some(id))
    }

    fn log_progress(&self) {
        let connection = self.supervisor.counters();
        info!(
            "{} msgs: {}. snapshots: {}. diffs: {}. level changes: {}. control: {}. \
             unknown: {}. malformed: {}. desyncs: {}. dropped diffs: {}. \
             receive failures: {}. closed sockets: {}. reconnects: {}. commit failures: {}",
            self.venue(),
            self.stats.messages,
            self.stats.snapshots,
            self.stats.diffs,
            self.stats.level_changes,
            self.stats.control,
            self.stats.unknown,
            self.stats.malformed,
            self.stats.desyncs,
            self.stats.dropped_diffs,
            connection.receive_failures,
            connection.closed_connections,
            connection.reconnects,
            self.commits.total_failures(),
        );
    }
}

/// Outcome of one session run by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct SessionExit {
    pub venue: Venue,
    pub error: SnapperError,
}

/// Runs every session concurrently, one task each
pub struct Orchestrator {
    sessions: Vec<SessionConfig>,
    codec: Arc<PairCodec>,
    output_dir: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator writing `<venue>.jsonl` files under `output_dir`
    pub fn new(
        sessions: Vec<SessionConfig>,
        codec: PairCodec,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            sessions,
            codec: Arc::new(codec),
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Open sinks, connect every venue and wait until all sessions end
    pub async fn run(self) -> Vec<SessionExit> {
        let mut ready = Vec::with_capacity(self.sessions.len());
        let mut exits = Vec::new();

        for config in self.sessions {
            let venue = config.venue;
            let path = self.output_dir.join(format!("{venue}.jsonl"));
            match JsonlSink::open(&path).await {
                Ok(sink) => {
                    info!("{} records go to {}", venue, path.display());
                    let transport =
                        WsTransport::new(venue.ws_url()).with_timeout(config.connect_timeout);
                    ready.push(Session::new(config, Arc::clone(&self.codec), transport, sink));
                }
                Err(e) => {
                    error!("{} could not open {}: {}", venue, path.display(), e);
                    exits.push(SessionExit {
                        venue,
                        error: SnapperError::Configuration(e.to_string()),
                    });
                }
            }
        }

        exits.extend(run_sessions(ready).await);
        exits
    }
}

/// Spawn each session on its own task and collect how they ended
pub async fn run_sessions<T, S>(sessions: Vec<Session<T, S>>) -> Vec<SessionExit>
where
    T: Transport + 'static,
    S: PersistenceSink + 'static,
{
    let mut tasks = JoinSet::new();
    for mut session in sessions {
        tasks.spawn(async move {
            let venue = session.venue();
            let error = match session.run().await {
                Err(e) => e,
                Ok(()) => SnapperError::Configuration("session ended without an error".into()),
            };
            SessionExit { venue, error }
        });
    }

    let mut exits = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(exit) => {
                error!("{} session stopped: {}", exit.venue, exit.error);
                exits.push(exit);
            }
            Err(e) => error!("Session task panicked or was cancelled: {}", e),
        }
    }
    exits
}
