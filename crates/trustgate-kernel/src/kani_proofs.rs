//! Kani proofs for the decision inequality
//!
//! These proofs check the LRAP arithmetic over every fixed-point input at a
//! small scale, using bounded model checking.
//!
//! **Proof Count**: 5 proofs (#1-5)
//!
//! Run with: `cargo kani --harness verify_*`

#[cfg(kani)]
use crate::fixed::Scale;
#[cfg(kani)]
use crate::lrap;

#[cfg(kani)]
const K: u64 = 10;

#[cfg(kani)]
fn any_unit(k: u64) -> u64 {
    let value: u64 = kani::any();
    kani::assume(value <= k);
    value
}

/// Proof #1: Risk monotonicity
///
/// **Property**: Raising risk never turns a DENY into a PERMIT
///
/// **Verification**:
/// - Symbolic trust, base, α, and two risks `r1 <= r2`
/// - PERMIT at `r2` implies PERMIT at `r1`
#[cfg(kani)]
#[kani::proof]
fn verify_risk_monotonicity() {
    let scale = Scale::new(K).unwrap();
    let trust = any_unit(K);
    let base = any_unit(K);
    let alpha = any_unit(10 * K);
    let r1 = any_unit(K);
    let r2 = any_unit(K);
    kani::assume(r1 <= r2);

    let high = lrap::evaluate(trust, base, alpha, r2, scale);
    let low = lrap::evaluate(trust, base, alpha, r1, scale);

    assert!(!high.permitted || low.permitted);
}

/// Proof #2: Liveness at zero risk and full trust
///
/// **Property**: Maximum trust with zero risk is always permitted
///
/// **Verification**:
/// - Symbolic base and α
/// - Trust `K`, risk 0 must PERMIT
#[cfg(kani)]
#[kani::proof]
fn verify_liveness() {
    let scale = Scale::new(K).unwrap();
    let base = any_unit(K);
    let alpha = any_unit(10 * K);

    let outcome = lrap::evaluate(K, base, alpha, 0, scale);

    assert!(outcome.permitted);
    assert!(!outcome.lockdown);
}

/// Proof #3: Multiply-first matches the real inequality
///
/// **Property**: `τ ≥ b + ceil(b·α·r/K²)` iff `τ·K² ≥ b·K² + b·α·r`
///
/// **Verification**:
/// - Symbolic inputs at `K = 10`
/// - Compare against the division-free cross-multiplied form
#[cfg(kani)]
#[kani::proof]
fn verify_penalty_exactness() {
    let scale = Scale::new(K).unwrap();
    let trust = any_unit(K);
    let base = any_unit(K);
    let alpha = any_unit(10 * K);
    let risk = any_unit(K);

    let outcome = lrap::evaluate(trust, base, alpha, risk, scale);
    let k2 = K * K;
    let exact = trust * k2 >= base * k2 + base * alpha * risk;

    if !outcome.lockdown {
        assert_eq!(outcome.permitted, exact);
    }
}

/// Proof #4: Threshold never below base
///
/// **Property**: The risk penalty is non-negative
#[cfg(kani)]
#[kani::proof]
fn verify_threshold_at_least_base() {
    let scale = Scale::new(K).unwrap();
    let base = any_unit(K);
    let alpha = any_unit(10 * K);
    let risk = any_unit(K);

    assert!(lrap::threshold(base, alpha, risk, scale) >= base);
}

/// Proof #5: Lockdown is unsatisfiable
///
/// **Property**: Under lockdown no trust value permits
#[cfg(kani)]
#[kani::proof]
fn verify_lockdown_denies() {
    let scale = Scale::new(K).unwrap();
    let trust = any_unit(K);
    let base = any_unit(K);
    let alpha = any_unit(10 * K);
    let risk = any_unit(K);

    let outcome = lrap::evaluate(trust, base, alpha, risk, scale);
    if outcome.lockdown {
        assert!(!outcome.permitted);
        assert!(outcome.threshold > K);
    }
}
