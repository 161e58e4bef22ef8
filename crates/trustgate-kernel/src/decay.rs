//! Time decay of trust.
//!
//! Trust is never stored in decayed form. Every read recomputes
//! `τ = τ0 · e^(−λ·Δt)` from the committed `(τ0, timestamp)` pair, so a
//! stored value can never outlive the instant it described.
//!
//! Two interchangeable implementations exist:
//!
//! - [`exact_decay`]: the reference exponential.
//! - [`approx_decay`]: the first-order Taylor form `τ0 · max(0, 1 − λ·Δt)`,
//!   which avoids the transcendental call on the request path.
//!
//! For `x = λ·Δt ≥ 0` the linear form satisfies
//! `0 ≤ e^(−x) − (1 − x) ≤ x²/2`. It therefore never exceeds the exact value
//! (the fast path can only deny more, never permit more) and its error for
//! `τ0 ≤ 1` is bounded by `x²/2`. [`DecayDomain`] turns a tolerance into the
//! largest exponent for which that bound holds, and [`DecaySettings::decay`]
//! refuses to use the approximation outside it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrustError};

/// Default decay rate λ, per second.
pub const DEFAULT_DECAY_RATE: f64 = 0.05;

/// Default absolute error tolerated from the approximation.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Largest accepted decay rate, per second.
pub const MAX_DECAY_RATE: f64 = 1_000.0;

/// Tolerances at or above this value would admit exponents near 1, where
/// the linear form collapses to zero.
pub const MAX_TOLERANCE: f64 = 0.5;

// ============================================================================
// Decay Functions
// ============================================================================

/// Exact exponential decay, clamped to `[0, 1]`.
pub fn exact_decay(trust0: f64, rate: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 || rate <= 0.0 {
        return trust0.clamp(0.0, 1.0);
    }
    (trust0 * (-rate * elapsed_secs).exp()).clamp(0.0, 1.0)
}

/// First-order approximation of [`exact_decay`], clamped to `[0, 1]`.
///
/// # Errors
///
/// Returns [`TrustError::ApproximationDomainExceeded`] if `rate · elapsed`
/// lies outside `domain`.
pub fn approx_decay(trust0: f64, rate: f64, elapsed_secs: f64, domain: &DecayDomain) -> Result<f64> {
    let exponent = decay_exponent(rate, elapsed_secs);
    if !domain.contains(exponent) {
        return Err(TrustError::ApproximationDomainExceeded {
            exponent,
            max_exponent: domain.max_exponent(),
        });
    }
    Ok((trust0 * (1.0 - exponent).max(0.0)).clamp(0.0, 1.0))
}

/// Worst-case absolute error of [`approx_decay`] at exponent `x`, for `τ0 ≤ 1`.
pub fn error_bound(exponent: f64) -> f64 {
    exponent * exponent / 2.0
}

fn decay_exponent(rate: f64, elapsed_secs: f64) -> f64 {
    (rate * elapsed_secs).max(0.0)
}

/// Validates a decay rate λ.
///
/// # Errors
///
/// Returns [`TrustError::ConfigurationInvalid`] unless λ is finite and in
/// `[0, MAX_DECAY_RATE]`.
pub fn validate_rate(rate: f64) -> Result<f64> {
    if rate.is_finite() && (0.0..=MAX_DECAY_RATE).contains(&rate) {
        Ok(rate)
    } else {
        Err(TrustError::config(format!(
            "decay rate must be finite and in [0, {MAX_DECAY_RATE}], got {rate}"
        )))
    }
}

// ============================================================================
// Approximation Domain
// ============================================================================

/// The exponents `x = λ·Δt` for which the approximation error stays within tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayDomain {
    tolerance: f64,
    max_exponent: f64,
}

impl DecayDomain {
    /// Derives the widest valid domain: `max_exponent = sqrt(2 · tolerance)`.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::ConfigurationInvalid`] unless `0 < tolerance < MAX_TOLERANCE`.
    pub fn from_tolerance(tolerance: f64) -> Result<Self> {
        validate_tolerance(tolerance)?;
        Ok(Self {
            tolerance,
            max_exponent: (2.0 * tolerance).sqrt(),
        })
    }

    /// Uses an explicit, narrower domain bound.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::ConfigurationInvalid`] if `max_exponent` is not
    /// positive or its error bound `max_exponent²/2` exceeds `tolerance`.
    pub fn with_max_exponent(tolerance: f64, max_exponent: f64) -> Result<Self> {
        validate_tolerance(tolerance)?;
        if !(max_exponent.is_finite() && max_exponent > 0.0) {
            return Err(TrustError::config(format!(
                "approximation domain bound must be positive, got {max_exponent}"
            )));
        }
        if error_bound(max_exponent) > tolerance {
            return Err(TrustError::config(format!(
                "approximation domain bound {max_exponent} admits error {} above tolerance {tolerance}",
                error_bound(max_exponent)
            )));
        }
        Ok(Self {
            tolerance,
            max_exponent,
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_exponent(&self) -> f64 {
        self.max_exponent
    }

    /// Returns `true` if the approximation may be used at exponent `x`.
    pub fn contains(&self, exponent: f64) -> bool {
        exponent.is_finite() && (0.0..=self.max_exponent).contains(&exponent)
    }
}

impl Default for DecayDomain {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_exponent: (2.0 * DEFAULT_TOLERANCE).sqrt(),
        }
    }
}

fn validate_tolerance(tolerance: f64) -> Result<()> {
    if tolerance.is_finite() && tolerance > 0.0 && tolerance < MAX_TOLERANCE {
        Ok(())
    } else {
        Err(TrustError::config(format!(
            "approximation tolerance must be in (0, {MAX_TOLERANCE}), got {tolerance}"
        )))
    }
}

// ============================================================================
// Strategy Selection
// ============================================================================

/// Which decay implementation serves reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecayMode {
    /// Always use the exponential.
    #[default]
    Exact,
    /// Use the linear fast path inside its domain.
    Approximate,
}

/// What the approximate mode does when the exponent leaves the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainFallback {
    /// Pay for the exponential on this read.
    #[default]
    Exact,
    /// Treat the trust as fully decayed. Bounded cost, strictly more denials.
    Zero,
}

/// Immutable decay configuration used by the trust engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecaySettings {
    default_rate: f64,
    mode: DecayMode,
    domain: DecayDomain,
    fallback: DomainFallback,
}

impl DecaySettings {
    /// Creates validated decay settings.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::ConfigurationInvalid`] for an invalid rate.
    pub fn new(
        default_rate: f64,
        mode: DecayMode,
        domain: DecayDomain,
        fallback: DomainFallback,
    ) -> Result<Self> {
        Ok(Self {
            default_rate: validate_rate(default_rate)?,
            mode,
            domain,
            fallback,
        })
    }

    /// Exact decay at the given rate.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::ConfigurationInvalid`] for an invalid rate.
    pub fn exact(default_rate: f64) -> Result<Self> {
        Self::new(
            default_rate,
            DecayMode::Exact,
            DecayDomain::default(),
            DomainFallback::Exact,
        )
    }

    pub fn default_rate(&self) -> f64 {
        self.default_rate
    }

    pub fn mode(&self) -> DecayMode {
        self.mode
    }

    pub fn domain(&self) -> &DecayDomain {
        &self.domain
    }

    pub fn fallback(&self) -> DomainFallback {
        self.fallback
    }

    /// Decays `trust0` over `elapsed_secs` at `rate` using the selected strategy.
    ///
    /// Out-of-domain approximations are recovered here and never surface.
    pub fn decay(&self, trust0: f64, rate: f64, elapsed_secs: f64) -> f64 {
        match self.mode {
            DecayMode::Exact => exact_decay(trust0, rate, elapsed_secs),
            DecayMode::Approximate => {
                match approx_decay(trust0, rate, elapsed_secs, &self.domain) {
                    Ok(trust) => trust,
                    Err(err) => {
                        debug!(error = %err, fallback = ?self.fallback, "decay fast path declined");
                        match self.fallback {
                            DomainFallback::Exact => exact_decay(trust0, rate, elapsed_secs)
                                .min(self.domain_edge(trust0)),
                            DomainFallback::Zero => 0.0,
                        }
                    }
                }
            }
        }
    }

    /// The approximation's value at the domain bound.
    ///
    /// Capping the exact fallback here keeps reads non-increasing across the
    /// edge, where `1 − x_max` sits below `e^(−x)` for `x` just past it.
    fn domain_edge(&self, trust0: f64) -> f64 {
        (trust0 * (1.0 - self.domain.max_exponent()).max(0.0)).clamp(0.0, 1.0)
    }
}

impl Default for DecaySettings {
    fn default() -> Self {
        Self {
            default_rate: DEFAULT_DECAY_RATE,
            mode: DecayMode::Exact,
            domain: DecayDomain::default(),
            fallback: DomainFallback::Exact,
        }
    }
}
