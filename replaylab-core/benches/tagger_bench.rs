//! Criterion benchmarks for the replay hot path.
//!
//! Benchmarks:
//! 1. Single-signal scan over a long candle series
//! 2. Batch tagging (rayon parallel map) at several signal counts

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use replaylab_core::domain::{Candle, CandleSeries, Direction, Signal};
use replaylab_core::engine::{OutcomeTagger, TieBreak};

// ── Helpers ──────────────────────────────────────────────────────────

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap()
}

/// Seeded random walk of one-minute candles starting at 100.0.
fn make_candles(n: usize) -> CandleSeries {
    let mut rng = StdRng::seed_from_u64(7);
    let mut price = 100.0_f64;
    let candles = (0..n)
        .map(|i| {
            let open = price;
            let close = price * (1.0 + rng.gen_range(-0.002..0.002));
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.001));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.001));
            price = close;
            Candle {
                timestamp: base() + Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                volume: Some(rng.gen_range(100.0..10_000.0)),
            }
        })
        .collect();
    CandleSeries::new(candles)
}

fn make_signals(n: usize, candles: &CandleSeries) -> Vec<Signal> {
    let mut rng = StdRng::seed_from_u64(11);
    let slice = candles.as_slice();
    (0..n)
        .map(|i| {
            let anchor = &slice[rng.gen_range(0..slice.len() / 2)];
            let direction = if i % 2 == 0 {
                Direction::Long
            } else {
                Direction::Short
            };
            let entry = anchor.close;
            let (sl, tp) = match direction {
                Direction::Long => (entry * 0.995, entry * 1.01),
                Direction::Short => (entry * 1.005, entry * 0.99),
            };
            Signal {
                signal_id: format!("bench_{i}"),
                timestamp: anchor.timestamp,
                symbol: "BENCH".into(),
                timeframe: "M1".into(),
                direction,
                signal_type: None,
                entry,
                sl,
                tp,
                session: None,
                meta: serde_json::Map::new(),
            }
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_single_signal(c: &mut Criterion) {
    let candles = make_candles(50_000);
    let signals = make_signals(1, &candles);
    let tagger = OutcomeTagger::new(&candles);

    c.bench_function("tag_signal_50k_candles", |b| {
        b.iter(|| tagger.tag_signal(black_box(&signals[0])))
    });
}

fn bench_batch(c: &mut Criterion) {
    let candles = make_candles(20_000);
    let mut group = c.benchmark_group("tag_batch");

    for &n in &[100usize, 1_000, 10_000] {
        let signals = make_signals(n, &candles);
        let tagger = OutcomeTagger::new(&candles).with_tie_break(TieBreak::Loss);
        group.bench_with_input(BenchmarkId::from_parameter(n), &signals, |b, signals| {
            b.iter(|| tagger.tag(black_box(signals)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_signal, bench_batch);
criterion_main!(benches);
