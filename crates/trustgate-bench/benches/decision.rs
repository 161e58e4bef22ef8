//! Decision point benchmarks.
//!
//! Measures the full just-in-time decision path, the Layer 1 short circuit,
//! and belief updates against concurrent readers.

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use trustgate_bench::{BILLING, Fixture, LatencyTracker, subject};
use trustgate_kernel::{DecaySettings, Evidence};
use trustgate_types::{ObjectId, Risk, Timestamp};

fn fixture(subjects: usize) -> Fixture {
    Fixture::new(subjects, DecaySettings::exact(0.05).expect("valid rate")).expect("valid fixture")
}

// ============================================================================
// Decide Benchmarks
// ============================================================================

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");
    group.throughput(Throughput::Elements(1));

    for subjects in [1, 1_000, 100_000] {
        let fixture = fixture(subjects);
        let record = fixture.record();
        let target = subject(subjects / 2);
        let now = Timestamp::from_secs(3);

        group.bench_with_input(
            BenchmarkId::new("supplied_risk", subjects),
            &subjects,
            |b, _| {
                b.iter(|| {
                    let decision =
                        fixture
                            .pdp
                            .decide(black_box(&target), &record, Some(Risk::ZERO), now);
                    let _ = black_box(decision);
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("risk_source", subjects),
            &subjects,
            |b, _| {
                b.iter(|| {
                    let decision = fixture.pdp.decide(black_box(&target), &record, None, now);
                    let _ = black_box(decision);
                });
            },
        );
    }

    group.finish();
}

fn bench_static_mismatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide_static_mismatch");
    let fixture = fixture(1_000);
    let billing = ObjectId::new(BILLING);
    let target = subject(7);

    group.bench_function("layer_one_deny", |b| {
        b.iter(|| {
            let decision = fixture
                .pdp
                .decide(black_box(&target), &billing, None, Timestamp::EPOCH);
            let _ = black_box(decision);
        });
    });

    group.finish();
}

// ============================================================================
// Update Benchmarks
// ============================================================================

fn bench_observation_under_readers(c: &mut Criterion) {
    let mut group = c.benchmark_group("observation_under_readers");

    for readers in [0, 2, 4] {
        let fixture = Arc::new(fixture(64));
        let stop = Arc::new(AtomicBool::new(false));
        let handles: Vec<_> = (0..readers)
            .map(|n| {
                let fixture = Arc::clone(&fixture);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    let record = fixture.record();
                    let mut i = n;
                    while !stop.load(Ordering::Relaxed) {
                        let target = subject(i % 64);
                        let _ = fixture.pdp.decide(&target, &record, None, Timestamp::EPOCH);
                        i += 1;
                    }
                })
            })
            .collect();

        let target = subject(0);
        let evidence = Evidence::from_ratio(1.01).expect("valid ratio");
        group.bench_with_input(BenchmarkId::from_parameter(readers), &readers, |b, _| {
            b.iter(|| {
                let trust = fixture
                    .engine
                    .apply_observation(black_box(&target), &evidence, Timestamp::EPOCH);
                let _ = black_box(trust);
            });
        });

        stop.store(true, Ordering::Relaxed);
        for handle in handles {
            handle.join().expect("reader thread panicked");
        }
    }

    group.finish();
}

// ============================================================================
// Tail Latency
// ============================================================================

/// Records per-call latency outside Criterion so p99.9 is visible.
fn bench_decide_tail(_c: &mut Criterion) {
    let fixture = fixture(10_000);
    let record = fixture.record();
    let mut tracker = LatencyTracker::new();

    for i in 0..100_000 {
        let target = subject(i % 10_000);
        let _ = tracker.time(|| fixture.pdp.decide(&target, &record, None, Timestamp::EPOCH));
    }
    tracker.print_summary("decide");
    println!("{}", tracker.to_json("decide"));
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    decision_benches,
    bench_decide,
    bench_static_mismatch,
    bench_observation_under_readers,
    bench_decide_tail
);

criterion_main!(decision_benches);
