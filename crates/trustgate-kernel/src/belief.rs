//! Bayesian belief update.
//!
//! A subject is modeled as a two-state hidden Markov chain: Honest or
//! Compromised. Trust `τ` is the posterior probability of Honest. Decay
//! (see [`crate::decay`]) plays the role of the transition step; this module
//! implements the emission step.
//!
//! Evidence is summarized by its likelihood ratio
//! `LR = P(E | Honest) / P(E | Compromised)` and folded into the prior with
//! Bayes' rule:
//!
//! ```text
//! posterior = LR·p / (LR·p + (1 − p))  =  1 / (1 + (1 − p) / (LR·p))
//! ```
//!
//! The second form is what is computed. Each IEEE operation in it is
//! monotone, so the posterior is non-decreasing in `LR` for a fixed prior
//! even after rounding, and it never leaves `[0, 1]`.

use crate::error::{Result, TrustError};

/// Largest accepted likelihood ratio (and inverse of the smallest).
pub const MAX_LIKELIHOOD_RATIO: f64 = 1e12;

/// A behavioral or authentication observation, reduced to its likelihood ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evidence {
    ratio: f64,
}

impl Evidence {
    /// Likelihood ratio assigned to a successful multi-factor authentication.
    pub const MFA_SUCCESS_RATIO: f64 = 999.0;
    /// Likelihood ratio assigned to a failed multi-factor authentication.
    pub const MFA_FAILURE_RATIO: f64 = 0.05;
    /// Likelihood ratio assigned to traffic flagged as anomalous.
    pub const ANOMALOUS_TRAFFIC_RATIO: f64 = 0.1;
    /// Likelihood ratio assigned to routine, expected activity.
    pub const NORMAL_ACTIVITY_RATIO: f64 = 1.5;

    /// Wraps a likelihood ratio.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InputOutOfRange`] unless the ratio is finite and in
    /// `[1/MAX_LIKELIHOOD_RATIO, MAX_LIKELIHOOD_RATIO]`.
    pub fn from_ratio(ratio: f64) -> Result<Self> {
        if ratio.is_finite() && (1.0 / MAX_LIKELIHOOD_RATIO..=MAX_LIKELIHOOD_RATIO).contains(&ratio)
        {
            Ok(Self { ratio })
        } else {
            Err(TrustError::out_of_range(
                "likelihood ratio",
                format!(
                    "must be finite and within [{}, {MAX_LIKELIHOOD_RATIO}], got {ratio}",
                    1.0 / MAX_LIKELIHOOD_RATIO
                ),
            ))
        }
    }

    /// Builds evidence from the two conditional likelihoods.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InputOutOfRange`] if either likelihood is not a
    /// probability, the compromised likelihood is zero, or the ratio is out of range.
    pub fn from_likelihoods(honest: f64, compromised: f64) -> Result<Self> {
        for (field, value) in [("honest likelihood", honest), ("compromised likelihood", compromised)] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(TrustError::out_of_range(
                    field,
                    format!("must be a probability, got {value}"),
                ));
            }
        }
        if compromised == 0.0 {
            return Err(TrustError::out_of_range(
                "compromised likelihood",
                "must be non-zero",
            ));
        }
        Self::from_ratio(honest / compromised)
    }

    pub fn mfa_success() -> Self {
        Self {
            ratio: Self::MFA_SUCCESS_RATIO,
        }
    }

    pub fn mfa_failure() -> Self {
        Self {
            ratio: Self::MFA_FAILURE_RATIO,
        }
    }

    pub fn anomalous_traffic() -> Self {
        Self {
            ratio: Self::ANOMALOUS_TRAFFIC_RATIO,
        }
    }

    pub fn normal_activity() -> Self {
        Self {
            ratio: Self::NORMAL_ACTIVITY_RATIO,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Natural log of the likelihood ratio: positive supports Honest.
    pub fn log_likelihood_ratio(&self) -> f64 {
        self.ratio.ln()
    }

    /// Returns `true` if the evidence raises trust.
    pub fn is_positive(&self) -> bool {
        self.ratio > 1.0
    }
}

/// One Bayesian emission step.
///
/// `prior` is the decayed trust at the instant of the observation.
///
/// A prior of exactly `0` or `1` would absorb every later observation, so
/// evidence pointing away from a boundary first pulls the prior in by
/// `1/MAX_LIKELIHOOD_RATIO`. Evidence pointing into a boundary leaves it put.
pub fn posterior(prior: f64, evidence: &Evidence) -> f64 {
    let epsilon = 1.0 / MAX_LIKELIHOOD_RATIO;
    let p = prior.clamp(0.0, 1.0);
    let p = if evidence.ratio < 1.0 {
        p.min(1.0 - epsilon)
    } else if evidence.ratio > 1.0 {
        p.max(epsilon)
    } else {
        p
    };
    let odds_against = (1.0 - p) / (evidence.ratio * p);
    (1.0 / (1.0 + odds_against)).clamp(0.0, 1.0)
}
