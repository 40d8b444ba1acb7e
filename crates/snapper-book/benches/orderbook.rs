//! Benchmarks for book apply operations
//!
//! Run with: cargo bench --bench orderbook

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use snapper_book::{compute_checksum, OrderBookState, ParticipantBook};
use snapper_types::{BookDiff, BookSnapshot, CanonicalPair, PriceLevel, Side};

fn create_levels(base_price: Decimal, count: usize, step: Decimal) -> Vec<PriceLevel> {
    (0..count)
        .map(|i| {
            PriceLevel::new(
                base_price + step * Decimal::from(i as i64),
                dec!(1.0) + Decimal::from(i as i64) / dec!(10),
            )
        })
        .collect()
}

fn create_snapshot(count: usize) -> BookSnapshot {
    BookSnapshot {
        pair: CanonicalPair::new("BTC", "USD"),
        native_symbol: "BTC/USD".to_string(),
        external_time: None,
        bids: create_levels(dec!(100000), count, dec!(-1)),
        asks: create_levels(dec!(100001), count, dec!(1)),
    }
}

fn bench_apply_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_snapshot");

    for size in [10, 100, 500, 1000] {
        group.throughput(Throughput::Elements((size * 2) as u64));
        let snapshot = create_snapshot(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, snapshot| {
            b.iter(|| {
                let mut book = OrderBookState::new(snapshot.pair.clone());
                let result = book.apply_snapshot(black_box(snapshot), Some(1));
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_apply_diff_with_checksum(c: &mut Criterion) {
    let snapshot = create_snapshot(10);
    let mut template = OrderBookState::with_depth(snapshot.pair.clone(), 10);
    template.apply_snapshot(&snapshot, Some(1));

    let override_level = PriceLevel::new(dec!(100000), dec!(2.5));
    let mut bids = template.top_bids(10);
    bids[0] = override_level.clone();
    let checksum = compute_checksum(&bids, &template.top_asks(10));

    let diff = BookDiff {
        pair: snapshot.pair.clone(),
        native_symbol: "BTC/USD".to_string(),
        external_time: None,
        checksum: Some(checksum.to_string()),
        bid_overrides: vec![override_level],
        ask_overrides: vec![],
    };

    c.bench_function("apply_diff_with_checksum", |b| {
        b.iter_batched(
            || template.clone(),
            |mut book| {
                let result = book.apply_diff(black_box(&diff));
                black_box(result)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_participant_submit(c: &mut Criterion) {
    c.bench_function("participant_submit_1000", |b| {
        b.iter(|| {
            let mut book = ParticipantBook::new();
            for i in 0..1000u64 {
                let side = if i % 2 == 0 { Side::Bid } else { Side::Ask };
                let price = Decimal::from(100 + (i % 50));
                let _ = book.submit_limit(side, dec!(1), black_box(price), i % 7);
            }
            black_box(book.market_depth(10))
        })
    });
}

criterion_group!(
    benches,
    bench_apply_snapshot,
    bench_apply_diff_with_checksum,
    bench_participant_submit,
);

criterion_main!(benches);
