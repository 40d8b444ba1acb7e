//! Persistence sinks
//!
//! A sink assigns every accepted record an id and makes queued records
//! durable on `commit`. Ids increase monotonically per sink, like an
//! autoincrement key.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snapper_types::{EventRecord, RecordId};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sink refused the operation
    #[error("sink rejected the operation: {0}")]
    Rejected(String),
}

/// Durable append-only destination for event records
#[async_trait]
pub trait PersistenceSink: Send {
    /// Queue a record and return its id
    async fn accept(&mut self, record: EventRecord) -> Result<RecordId, PersistenceError>;

    /// Make every queued record durable
    async fn commit(&mut self) -> Result<(), PersistenceError>;
}

/// One line of a JSON-lines sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: EventRecord,
}

/// Append-only JSON-lines file
///
/// Records are buffered by `accept` and written, flushed and synced by
/// `commit`. A failed commit keeps only the bytes that did not reach the
/// file, so the retry completes a partly written line instead of repeating it.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: File,
    buffer: Vec<u8>,
    pending: usize,
    next_id: RecordId,
}

impl JsonlSink {
    /// Open `path` for appending, continuing ids after any existing lines
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let existing = match File::open(&path).await {
            Ok(file) => {
                let mut lines = BufReader::new(file).lines();
                let mut count: RecordId = 0;
                while lines.next_line().await?.is_some() {
                    count += 1;
                }
                count
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        debug!("Opened {} with {} existing records", path.display(), existing);

        Ok(Self {
            path,
            file,
            buffer: Vec::new(),
            pending: 0,
            next_id: existing + 1,
        })
    }

    /// File being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records accepted but not yet committed
    pub fn pending(&self) -> usize {
        self.pending
    }
}

#[async_trait]
impl PersistenceSink for JsonlSink {
    async fn accept(&mut self, record: EventRecord) -> Result<RecordId, PersistenceError> {
        let stored = StoredRecord {
            id: self.next_id,
            record,
        };
        serde_json::to_writer(&mut self.buffer, &stored)?;
        self.buffer.push(b'\n');
        self.pending += 1;
        self.next_id += 1;
        Ok(stored.id)
    }

    async fn commit(&mut self) -> Result<(), PersistenceError> {
        if self.buffer.is_empty() && self.pending == 0 {
            return Ok(());
        }
        write_drained(&mut self.file, &mut self.buffer).await?;
        self.file.flush().await?;
        self.file.sync_data().await?;

        debug!("Committed {} records to {}", self.pending, self.path.display());
        self.pending = 0;
        Ok(())
    }
}

/// Write `buffer` out, removing each chunk from it as soon as it is written
async fn write_drained<W>(writer: &mut W, buffer: &mut Vec<u8>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while !buffer.is_empty() {
        match writer.write(buffer).await {
            Ok(0) => return Err(std::io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buffer.drain(..n);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// In-memory sink with injectable failures
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Records made durable by `commit`
    pub committed: Vec<StoredRecord>,
    /// Records accepted since the last successful commit
    pub pending: Vec<StoredRecord>,
    /// Number of upcoming `accept` calls that fail
    pub accept_failures: u32,
    /// Number of upcoming `commit` calls that fail
    pub commit_failures: u32,
    /// Number of `commit` calls, failed or not
    pub commit_calls: u32,
    next_id: RecordId,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail
    pub fn fail_next_commits(mut self, count: u32) -> Self {
        self.commit_failures = count;
        self
    }

    /// Make the next `count` accepts fail
    pub fn fail_next_accepts(mut self, count: u32) -> Self {
        self.accept_failures = count;
        self
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn accept(&mut self, record: EventRecord) -> Result<RecordId, PersistenceError> {
        if self.accept_failures > 0 {
            self.accept_failures -= 1;
            return Err(PersistenceError::Rejected("injected accept failure".into()));
        }
        self.next_id += 1;
        self.pending.push(StoredRecord {
            id: self.next_id,
            record,
        });
        Ok(self.next_id)
    }

    async fn commit(&mut self) -> Result<(), PersistenceError> {
        self.commit_calls += 1;
        if self.commit_failures > 0 {
            self.commit_failures -= 1;
            return Err(PersistenceError::Rejected("injected commit failure".into()));
        }
        self.committed.append(&mut self.pending);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use snapper_types::{BookSnapshot, CanonicalPair, PriceLevel, SnapshotRecord, Venue, FULL_DEPTH};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Writer that accepts `budget` bytes, fails once, then accepts everything
    struct ShortWriter {
        written: Vec<u8>,
        budget: Option<usize>,
    }

    impl AsyncWrite for ShortWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            match self.budget {
                Some(0) => {
                    self.budget = None;
                    Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "no space left")))
                }
                Some(left) => {
                    let n = left.min(buf.len());
                    self.written.extend_from_slice(&buf[..n]);
                    self.budget = Some(left - n);
                    Poll::Ready(Ok(n))
                }
                None => {
                    self.written.extend_from_slice(buf);
                    Poll::Ready(Ok(buf.len()))
                }
            }
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn snapshot_record() -> EventRecord {
        let snapshot = BookSnapshot {
            pair: CanonicalPair::new("BTC", "USD"),
            native_symbol: "BTC-USD".into(),
            external_time: None,
            bids: vec![PriceLevel::parse("100.0", "2.5").unwrap()],
            asks: vec![],
        };
        let received_at = Utc.timestamp_opt(1_690_000_000, 0).unwrap();
        EventRecord::Snapshot(
            SnapshotRecord::new(Venue::Coinbase, &snapshot, FULL_DEPTH, received_at).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_jsonl_commit_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("coinbase.jsonl");

        let mut sink = JsonlSink::open(&path).await.unwrap();
        assert_eq!(sink.accept(snapshot_record()).await.unwrap(), 1);
        assert_eq!(sink.accept(snapshot_record()).await.unwrap(), 2);
        assert_eq!(sink.pending(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        sink.commit().await.unwrap();
        assert_eq!(sink.pending(), 0);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<StoredRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].id, 2);
        assert_eq!(lines[0].record, snapshot_record());

        let raw: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(raw["record_type"], "snapshot");
        assert_eq!(raw["bids_json"], r#"[["100.0","2.5"]]"#);
        assert_eq!(raw["level_depth"], -1);
    }

    #[tokio::test]
    async fn test_jsonl_ids_continue_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kraken.jsonl");

        let mut sink = JsonlSink::open(&path).await.unwrap();
        sink.accept(snapshot_record()).await.unwrap();
        sink.commit().await.unwrap();
        drop(sink);

        let mut sink = JsonlSink::open(&path).await.unwrap();
        assert_eq!(sink.accept(snapshot_record()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_memory_sink_failures_keep_pending() {
        let mut sink = MemorySink::new().fail_next_commits(1).fail_next_accepts(1);

        assert!(sink.accept(snapshot_record()).await.is_err());
        assert_eq!(sink.accept(snapshot_record()).await.unwrap(), 1);
        assert!(sink.commit().await.is_err());
        assert_eq!(sink.pending.len(), 1);

        sink.commit().await.unwrap();
        assert_eq!(sink.committed.len(), 1);
        assert!(sink.pending.is_empty());
        assert_eq!(sink.commit_calls, 2);
    }

    #[tokio::test]
    async fn test_short_write_retry_does_not_duplicate() {
        let lines = b"{\"id\":1}\n{\"id\":2}\n".to_vec();
        let mut buffer = lines.clone();
        let mut writer = ShortWriter {
            written: Vec::new(),
            budget: Some(5),
        };

        assert!(write_drained(&mut writer, &mut buffer).await.is_err());
        assert_eq!(writer.written, lines[..5].to_vec());
        assert_eq!(buffer, lines[5..].to_vec());

        write_drained(&mut writer, &mut buffer).await.unwrap();
        assert!(buffer.is_empty());
        assert_eq!(writer.written, lines);
    }
}
