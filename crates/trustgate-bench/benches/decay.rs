//! Decay benchmarks.
//!
//! Compares exact exponential decay against the first-order approximation,
//! and measures the configured dispatcher including its domain check.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use trustgate_kernel::{
    DecayDomain, DecayMode, DecaySettings, DomainFallback, approx_decay, exact_decay,
};

// ============================================================================
// Primitive Benchmarks
// ============================================================================

fn bench_exact_vs_approx(c: &mut Criterion) {
    let mut group = c.benchmark_group("decay_primitive");
    let domain = DecayDomain::from_tolerance(0.01).expect("valid tolerance");

    for elapsed in [0.1, 1.0, 2.0] {
        group.bench_with_input(BenchmarkId::new("exact", elapsed), &elapsed, |b, &elapsed| {
            b.iter(|| black_box(exact_decay(black_box(0.8), black_box(0.05), elapsed)));
        });
        group.bench_with_input(BenchmarkId::new("approx", elapsed), &elapsed, |b, &elapsed| {
            b.iter(|| {
                let trust = approx_decay(black_box(0.8), black_box(0.05), elapsed, &domain);
                let _ = black_box(trust);
            });
        });
    }

    group.finish();
}

// ============================================================================
// Dispatcher Benchmarks
// ============================================================================

fn bench_settings_decay(c: &mut Criterion) {
    let mut group = c.benchmark_group("decay_settings");
    let domain = DecayDomain::from_tolerance(0.01).expect("valid tolerance");

    let configs = [
        ("exact", DecaySettings::exact(0.05).expect("valid rate")),
        (
            "approx_fallback_exact",
            DecaySettings::new(0.05, DecayMode::Approximate, domain, DomainFallback::Exact)
                .expect("valid rate"),
        ),
        (
            "approx_fallback_zero",
            DecaySettings::new(0.05, DecayMode::Approximate, domain, DomainFallback::Zero)
                .expect("valid rate"),
        ),
    ];

    // 1s stays inside the domain (x = 0.05), 30s leaves it (x = 1.5).
    for (name, settings) in configs {
        for elapsed in [1.0, 30.0] {
            group.bench_with_input(BenchmarkId::new(name, elapsed), &elapsed, |b, &elapsed| {
                b.iter(|| black_box(settings.decay(black_box(0.8), 0.05, elapsed)));
            });
        }
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(decay_benches, bench_exact_vs_approx, bench_settings_decay);

criterion_main!(decay_benches);
