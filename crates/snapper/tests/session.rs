//! Session integration tests
//!
//! Drive full sessions over scripted transports and in-memory sinks.

mod common;

use common::*;
use rust_decimal_macros::dec;
use snapper::{run_sessions, JsonlSink, MemorySink, StoredRecord};
use snapper_book::SyncState;
use snapper_types::{EventRecord, SnapperError, Venue};
use snapper_ws::{ConnectionState, TransportError};

// =============================================================================
// Book reconstruction
// =============================================================================

#[tokio::test]
async fn test_coinbase_snapshot_then_removal() {
    let mut session = memory_session(
        Venue::Coinbase,
        &[COINBASE_SUBSCRIPTIONS, COINBASE_SNAPSHOT, COINBASE_REMOVE_BID],
    );
    session.start().await.unwrap();

    session.step().await.unwrap();
    session.step().await.unwrap();
    {
        let book = session.books().book(&btc_usd()).unwrap();
        let bid = book.best_bid().unwrap();
        let ask = book.best_ask().unwrap();
        assert_eq!((bid.price, bid.size), (dec!(100.0), dec!(2.5)));
        assert_eq!((ask.price, ask.size), (dec!(101.0), dec!(1.0)));
    }

    session.step().await.unwrap();
    let book = session.books().book(&btc_usd()).unwrap();
    assert!(book.best_bid().is_none());
    assert_eq!(book.ask_count(), 1);

    let committed = &session.sink().committed;
    assert_eq!(committed.len(), 2);
    assert!(committed[0].record.is_snapshot());
    match &committed[1].record {
        EventRecord::Override(record) => {
            assert_eq!(record.snapshot_id_ref, Some(committed[0].id));
            assert_eq!(record.bid_overrides_json, r#"[["100.0","0"]]"#);
            assert_eq!(record.provider, "coinbase");
        }
        other => panic!("expected override record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_diff_before_snapshot_is_dropped_but_recorded() {
    let mut session = memory_session(Venue::Coinbase, &[COINBASE_REMOVE_BID]);
    session.start().await.unwrap();
    session.step().await.unwrap();

    assert!(session.books().book(&btc_usd()).is_none());
    assert_eq!(session.stats().dropped_diffs, 1);
    match &session.sink().committed[0].record {
        EventRecord::Override(record) => assert_eq!(record.snapshot_id_ref, None),
        other => panic!("expected override record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_kraken_checksum_validated() {
    let update = kraken_bid_update("3.0", None);
    let mut session = memory_session(
        Venue::Kraken,
        &[KRAKEN_SYSTEM_STATUS, KRAKEN_SNAPSHOT, update.as_str()],
    );
    session.start().await.unwrap();
    for _ in 0..3 {
        session.step().await.unwrap();
    }

    let book = session.books().book(&btc_usd()).unwrap();
    assert_eq!(book.state(), SyncState::Synced);
    assert_eq!(book.best_bid().unwrap().size, dec!(3.0));
    assert_eq!(session.stats().desyncs, 0);

    match &session.sink().committed[0].record {
        EventRecord::Snapshot(record) => assert_eq!(record.level_depth, 10),
        other => panic!("expected snapshot record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_kraken_checksum_mismatch_resubscribes() {
    let update = kraken_bid_update("3.0", Some(1));
    let mut session = memory_session(Venue::Kraken, &[KRAKEN_SNAPSHOT, update.as_str()]);
    session.start().await.unwrap();
    session.step().await.unwrap();
    session.step().await.unwrap();

    let book = session.books().book(&btc_usd()).unwrap();
    assert_eq!(book.state(), SyncState::Desynchronized);
    assert!(book.is_empty());
    assert_eq!(session.stats().desyncs, 1);

    let sent = &session.supervisor().transport().sent_messages;
    assert_eq!(sent.len(), 3);
    let unsubscribe: serde_json::Value = serde_json::from_str(&sent[1]).unwrap();
    let resubscribe: serde_json::Value = serde_json::from_str(&sent[2]).unwrap();
    assert_eq!(unsubscribe["event"], "unsubscribe");
    assert_eq!(resubscribe["event"], "subscribe");
    assert_eq!(resubscribe["pair"], serde_json::json!(["XBT/USD"]));

    // Diffs are ignored until the fresh snapshot lands
    session.handle_frame(&kraken_bid_update("4.0", None)).await.unwrap();
    assert_eq!(session.stats().dropped_diffs, 1);
    match &session.sink().committed.last().unwrap().record {
        EventRecord::Override(record) => assert_eq!(record.snapshot_id_ref, None),
        other => panic!("expected override record, got {other:?}"),
    }

    session.handle_frame(KRAKEN_SNAPSHOT).await.unwrap();
    assert_eq!(
        session.books().book(&btc_usd()).unwrap().state(),
        SyncState::Synced
    );
}

#[tokio::test]
async fn test_unreadable_checksum_counted_once() {
    let update =
        r#"[0, {"b": [["100.0", "3.0", "1690000001.5"]], "c": "abc"}, "book-10", "XBT/USD"]"#;
    let mut session = memory_session(Venue::Kraken, &[KRAKEN_SNAPSHOT, update]);
    session.start().await.unwrap();
    session.step().await.unwrap();
    session.step().await.unwrap();

    let stats = session.stats();
    assert_eq!(stats.messages, 2);
    assert_eq!(stats.snapshots, 1);
    assert_eq!(stats.diffs, 0);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.desyncs, 0);

    let book = session.books().book(&btc_usd()).unwrap();
    assert_eq!(book.state(), SyncState::Synced);
    assert_eq!(book.best_bid().unwrap().size, dec!(2.5));
    assert_eq!(session.supervisor().transport().sent_messages.len(), 1);
}

#[tokio::test]
async fn test_bitstamp_snapshot_records_published_depth() {
    let mut session = memory_session(Venue::Bitstamp, &[BITSTAMP_SNAPSHOT]);
    session.start().await.unwrap();
    session.step().await.unwrap();

    assert_eq!(session.books().book(&btc_usd()).unwrap().bid_count(), 1);
    match &session.sink().committed[0].record {
        EventRecord::Snapshot(record) => {
            assert_eq!(record.level_depth, 100);
            assert_eq!(record.provider, "bitstamp");
        }
        other => panic!("expected snapshot record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bitstamp_live_orders_are_recorded_not_applied() {
    let mut session = memory_session(Venue::Bitstamp, &[BITSTAMP_LIVE_ORDER]);
    session.start().await.unwrap();
    session.step().await.unwrap();

    assert!(session.books().is_empty());
    assert_eq!(session.stats().level_changes, 1);
    match &session.sink().committed[0].record {
        EventRecord::LevelDiff(record) => {
            assert_eq!(
                record.bid_changes_json,
                r#"[{"price":"99.5","amount":"0.5","action_type":"ADD"}]"#
            );
            assert_eq!(record.ask_changes_json, "[]");
        }
        other => panic!("expected level diff record, got {other:?}"),
    }
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_malformed_message_keeps_streaming() {
    let mut session = memory_session(
        Venue::Kraken,
        &[
            KRAKEN_SYSTEM_STATUS,
            r#"[0, {"a":[],"c":"1"}, {"b":[],"c":"2"}, "book-10", "XBT/USD"]"#,
        ],
    );
    session.start().await.unwrap();
    session.step().await.unwrap();
    session.step().await.unwrap();

    assert_eq!(session.stats().malformed, 1);
    assert_eq!(session.supervisor().state(), ConnectionState::Streaming);
    assert_eq!(session.supervisor().counters().reconnects, 0);
}

#[tokio::test]
async fn test_reconnect_resends_subscriptions() {
    let mut transport = scripted(&[COINBASE_SNAPSHOT]);
    transport.push_error(TransportError::ReceiveFailed("connection reset".into()));
    transport.push_response(COINBASE_SNAPSHOT);
    let mut session =
        session_with(session_config(Venue::Coinbase), transport, MemorySink::new());

    session.start().await.unwrap();
    session.step().await.unwrap();
    session.step().await.unwrap();

    let sent = &session.supervisor().transport().sent_messages;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
    assert_eq!(session.supervisor().counters().reconnects, 1);
    assert_eq!(session.sink().committed.len(), 2);
}

#[tokio::test]
async fn test_fourth_commit_failure_is_fatal() {
    let frames = [COINBASE_SNAPSHOT; 4];
    let mut session = session_with(
        session_config(Venue::Coinbase),
        scripted(&frames),
        MemorySink::new().fail_next_commits(4),
    );
    session.start().await.unwrap();

    for _ in 0..3 {
        session.step().await.unwrap();
    }
    let err = session.step().await.unwrap_err();
    assert!(matches!(err, SnapperError::PersistenceWrite { consecutive: 4, limit: 3, .. }));
}

#[tokio::test]
async fn test_sessions_fail_independently() {
    let mut unreachable = scripted(&[]);
    unreachable.fail_next_connects(5);
    let offline = session_with(session_config(Venue::Kraken), unreachable, MemorySink::new());

    let failing_sink = session_with(
        session_config(Venue::Coinbase),
        scripted(&[COINBASE_SNAPSHOT; 4]),
        MemorySink::new().fail_next_commits(100),
    );

    let mut exits = run_sessions(vec![offline, failing_sink]).await;
    exits.sort_by_key(|e| e.venue.as_str());

    assert_eq!(exits.len(), 2);
    assert_eq!(exits[0].venue, Venue::Coinbase);
    assert!(matches!(exits[0].error, SnapperError::PersistenceWrite { .. }));
    assert_eq!(exits[1].venue, Venue::Kraken);
    assert!(matches!(
        exits[1].error,
        SnapperError::ReconnectExhausted { attempts: 5, limit: 5, .. }
    ));
}

// =============================================================================
// Durable output
// =============================================================================

#[tokio::test]
async fn test_jsonl_session_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coinbase.jsonl");
    let sink = JsonlSink::open(&path).await.unwrap();
    let mut session = session_with(
        session_config(Venue::Coinbase),
        scripted(&[COINBASE_SNAPSHOT, COINBASE_REMOVE_BID]),
        sink,
    );
    session.start().await.unwrap();
    session.step().await.unwrap();
    session.step().await.unwrap();

    let records: Vec<StoredRecord> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, 1);
    match &records[1].record {
        EventRecord::Override(record) => assert_eq!(record.snapshot_id_ref, Some(1)),
        other => panic!("expected override record, got {other:?}"),
    }
}
