//! Linear risk-adaptive policy (LRAP).
//!
//! Access is permitted iff `τ ≥ b + b·α·r`, evaluated on fixed-point
//! integers at scale `K` (see [`crate::fixed`]):
//!
//! ```text
//! penalty   = ceil(b · α · r / K²)
//! threshold = b + penalty
//! permit    ⟺ τ ≥ threshold
//! ```
//!
//! The product `b · α · r` is formed in full (in `u128`) before the single
//! division. Normalizing an intermediate product first truncates twice and
//! lets a small risk increase vanish from the threshold entirely; the
//! regression tests sweep risk to show the two orders disagree.
//!
//! Rounding the division up keeps the integer inequality exactly equivalent
//! to the real-valued one for integer `τ` and `b`:
//! `τ − b ≥ b·α·r/K² ⟺ τ − b ≥ ceil(b·α·r/K²)`.

use crate::fixed::Scale;

/// Result of evaluating the inequality on fixed-point inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LrapOutcome {
    /// Risk-adjusted threshold, in units of `1/K`.
    pub threshold: u64,
    /// Whether `τ ≥ threshold`.
    pub permitted: bool,
    /// The threshold exceeds `K`: no trust value can satisfy it.
    pub lockdown: bool,
}

/// Risk penalty `ceil(b · α · r / K²)`.
///
/// All arguments are fixed-point at scale `scale`; `alpha` may exceed `K`.
pub fn risk_penalty(base: u64, alpha: u64, risk: u64, scale: Scale) -> u64 {
    let k = u128::from(scale.get());
    let product = u128::from(base) * u128::from(alpha) * u128::from(risk);
    let penalty = product.div_ceil(k * k);
    u64::try_from(penalty).unwrap_or(u64::MAX)
}

/// Threshold `b + penalty`, saturating.
pub fn threshold(base: u64, alpha: u64, risk: u64, scale: Scale) -> u64 {
    base.saturating_add(risk_penalty(base, alpha, risk, scale))
}

/// Evaluates `τ ≥ b + ceil(b·α·r / K²)`.
pub fn evaluate(trust: u64, base: u64, alpha: u64, risk: u64, scale: Scale) -> LrapOutcome {
    let threshold = threshold(base, alpha, risk, scale);
    let lockdown = threshold > scale.get();
    let permitted = !lockdown && trust >= threshold;

    // Postcondition: a permit always satisfies the inequality.
    debug_assert!(!permitted || trust >= threshold);

    LrapOutcome {
        threshold,
        permitted,
        lockdown,
    }
}
