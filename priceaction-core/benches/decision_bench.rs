//! Criterion benchmarks for the decision cycle.
//!
//! Benchmarks:
//! 1. Full `decide` call at typical history lengths
//! 2. Volatility estimate (ATR + trend average)
//! 3. Regime classification
//! 4. Structure counting (wedge pivots + pullback scan)

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use priceaction_core::domain::{Bar, Direction, MarketSnapshot, NewsEvent};
use priceaction_core::indicators::VolatilityEstimator;
use priceaction_core::regime::RegimeClassifier;
use priceaction_core::structure::StructureCounter;
use priceaction_core::{DecisionEngine, EngineConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 2000.0 + (i as f64 * 0.1).sin() * 20.0 + i as f64 * 0.05;
            let open = close - 0.8;
            Bar::new(
                base + Duration::minutes(5 * i as i64),
                open,
                close + 2.5,
                open - 2.5,
                close,
            )
        })
        .collect()
}

fn snapshot(n: usize) -> MarketSnapshot {
    let bars = make_bars(n);
    let htf_bars: Vec<Bar> = bars.chunks(12).filter_map(|c| c.last().cloned()).collect();
    MarketSnapshot {
        symbol: "XAUUSD".into(),
        server_hour: 10,
        server_minute: 0,
        bid: 2000.0,
        ask: 2000.2,
        spread: 20,
        account_equity: 10_000.0,
        margin_level: 0.0,
        bars,
        htf_bars,
        news: NewsEvent::default(),
        positions: Vec::new(),
        last_closed_trade: None,
    }
}

// ── 1. Decision cycle ────────────────────────────────────────────────

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");
    let engine = DecisionEngine::new(&EngineConfig::default());
    for n in [100usize, 300, 1000] {
        let snap = snapshot(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &snap, |b, snap| {
            b.iter(|| engine.decide(black_box(snap)))
        });
    }
    group.finish();
}

// ── 2-4. Pipeline stages ─────────────────────────────────────────────

fn bench_stages(c: &mut Criterion) {
    let config = EngineConfig::default();
    let bars = make_bars(300);
    let estimator = VolatilityEstimator::new(&config.volatility);
    let classifier = RegimeClassifier::new(&config);
    let counter = StructureCounter::new(&config);
    let vol = estimator.measure(&bars);

    let mut group = c.benchmark_group("stages_300_bars");
    group.bench_function("volatility", |b| b.iter(|| estimator.measure(black_box(&bars))));
    group.bench_function("regime", |b| {
        b.iter(|| classifier.classify_with_bias(black_box(&bars), &vol, Direction::Neutral))
    });
    group.bench_function("structure", |b| {
        b.iter(|| counter.analyze(black_box(&bars), &vol, Direction::Bull))
    });
    group.finish();
}

criterion_group!(benches, bench_decide, bench_stages);
criterion_main!(benches);
