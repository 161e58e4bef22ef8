//! # trustgate-bench: Latency benchmarks for the decision kernel
//!
//! Fixtures shared by the Criterion benches plus an HDR-histogram latency
//! tracker for tail measurements outside Criterion.

#![allow(clippy::cast_precision_loss)] // Latency stats use f64 for percentile calculations
#![allow(clippy::cast_possible_truncation)] // Nanosecond counts fit in u64
//!
//! ## Benchmarks
//!
//! - **decay**: exact vs approximate decay, and the configured dispatcher
//! - **decision**: full `decide` path, Layer 1 rejections, contended updates
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p trustgate-bench
//!
//! # Save baseline for comparison
//! cargo bench -p trustgate-bench --bench decision -- --save-baseline main
//!
//! # Compare against baseline
//! cargo bench -p trustgate-bench --bench decision -- --baseline main
//! ```

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use hdrhistogram::Histogram;
use trustgate_kernel::{FixedRisk, PolicyDecisionPoint, PolicySnapshot, TrustEngine};
use trustgate_kernel::{DecaySettings, RiskSource};
use trustgate_types::{ObjectId, Risk, SubjectId, Timestamp, Trust};

// ============================================================================
// Fixtures
// ============================================================================

/// Object every fixture subject is granted.
pub const RECORD: &str = "record_8842";

/// Object no fixture subject is granted.
pub const BILLING: &str = "billing";

/// Names the `i`-th fixture subject.
pub fn subject(i: usize) -> SubjectId {
    SubjectId::new(format!("subject-{i}"))
}

/// A decision point over `subjects` enrolled subjects, all granted [`RECORD`].
#[derive(Debug)]
pub struct Fixture {
    pub pdp: PolicyDecisionPoint,
    pub engine: Arc<TrustEngine>,
    pub risk: Arc<FixedRisk>,
}

impl Fixture {
    /// Builds the fixture with every subject enrolled at [`Timestamp::EPOCH`].
    ///
    /// # Errors
    ///
    /// Fails if the kernel rejects the fixture policy or an enrollment.
    pub fn new(subjects: usize, decay: DecaySettings) -> anyhow::Result<Self> {
        let mut builder = PolicySnapshot::builder()
            .alpha(0.5)
            .object(RECORD, 0.6)
            .object(BILLING, 0.3);
        for i in 0..subjects {
            builder = builder.grant(subject(i), RECORD);
        }
        let policy = builder.build().context("building fixture policy")?;

        let engine = Arc::new(TrustEngine::new(decay));
        for i in 0..subjects {
            engine
                .enroll(subject(i), Trust::new(0.8)?, Timestamp::EPOCH)
                .with_context(|| format!("enrolling {}", subject(i)))?;
        }

        let risk = Arc::new(FixedRisk::new(Risk::new(0.1)?));
        let pdp = PolicyDecisionPoint::new(policy, Arc::clone(&engine))
            .with_risk_source(Arc::clone(&risk) as Arc<dyn RiskSource>)
            .without_audit();

        Ok(Self { pdp, engine, risk })
    }

    pub fn record(&self) -> ObjectId {
        ObjectId::new(RECORD)
    }
}

// ============================================================================
// Latency Tracking
// ============================================================================

/// Tracks latency percentiles for operations.
#[derive(Debug)]
pub struct LatencyTracker {
    histogram: Histogram<u64>,
}

impl LatencyTracker {
    /// Creates a new latency tracker with 3 significant digits.
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new(3).expect("valid histogram config"),
        }
    }

    /// Records a latency measurement in nanoseconds.
    pub fn record(&mut self, latency_ns: u64) {
        self.histogram.record(latency_ns).ok();
    }

    /// Times `op` and records its latency.
    pub fn time<T>(&mut self, op: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = op();
        self.record(start.elapsed().as_nanos() as u64);
        out
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn p50(&self) -> u64 {
        self.histogram.value_at_quantile(0.50)
    }

    pub fn p99(&self) -> u64 {
        self.histogram.value_at_quantile(0.99)
    }

    pub fn p999(&self) -> u64 {
        self.histogram.value_at_quantile(0.999)
    }

    pub fn max(&self) -> u64 {
        self.histogram.max()
    }

    pub fn mean(&self) -> f64 {
        self.histogram.mean()
    }

    /// Exports the latency distribution as eCDF CSV (`latency_ns,percentile`).
    pub fn export_ecdf_csv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "latency_ns,percentile")?;
        for v in self.histogram.iter_quantiles(1) {
            writeln!(
                writer,
                "{},{}",
                v.value_iterated_to(),
                v.percentile() / 100.0
            )?;
        }
        Ok(())
    }

    /// Exports latency statistics as JSON for CI integration.
    pub fn to_json(&self, operation: &str) -> String {
        serde_json::json!({
            "operation": operation,
            "count": self.count(),
            "p50_ns": self.p50(),
            "p99_ns": self.p99(),
            "p999_ns": self.p999(),
            "max_ns": self.max(),
            "mean_ns": self.mean(),
        })
        .to_string()
    }

    /// Prints a summary of latency statistics.
    pub fn print_summary(&self, operation: &str) {
        println!("{operation} Latency Statistics ({} samples):", self.count());
        println!("  p50:   {:>10} ns", self.p50());
        println!("  p99:   {:>10} ns", self.p99());
        println!("  p99.9: {:>10} ns", self.p999());
        println!("  max:   {:>10} ns", self.max());
        println!("  mean:  {:>10.0} ns", self.mean());
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}
