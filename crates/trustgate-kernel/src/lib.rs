//! # trustgate-kernel: Trust engine and risk-adaptive decision point
//!
//! The kernel decides whether a subject may access an object *right now*,
//! given what is known about the subject and how risky the environment is.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  decide(subject, object, risk?, now)          │
//! └──────────────────┬───────────────────────────┘
//!                    │
//!                    ▼
//! ┌──────────────────────────────────────────────┐
//! │  Layer 1: static attribute relation           │
//! │  (subject, object) ∉ relation  ──►  DENY      │
//! └──────────────────┬───────────────────────────┘
//!                    │
//!                    ▼
//! ┌──────────────────────────────────────────────┐
//! │  Layer 2: LRAP inequality (fixed point)       │
//! │  τ = JIT-decayed trust     (TrustEngine)      │
//! │  r = request risk or PIP   (RiskSource)       │
//! │  PERMIT ⟺ τ ≥ b + ceil(b·α·r / K²)            │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`decay`]: exact and first-order decay with a guarded domain
//! - [`belief`]: evidence likelihood ratios and the posterior update
//! - [`engine`]: per-subject belief state with just-in-time reads
//! - [`fixed`] and [`lrap`]: the integer decision inequality
//! - [`snapshot`]: immutable policy configuration
//! - [`pdp`]: the two-layer decision point
//! - [`pip`]: risk sources
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use trustgate_kernel::{DecaySettings, PolicyDecisionPoint, PolicySnapshot, TrustEngine};
//! use trustgate_types::{Risk, Timestamp, Trust};
//!
//! let engine = Arc::new(TrustEngine::new(DecaySettings::default()));
//! engine.enroll("alice".into(), Trust::new(0.75).unwrap(), Timestamp::EPOCH).unwrap();
//!
//! let policy = PolicySnapshot::builder()
//!     .alpha(0.5)
//!     .object("record_8842", 0.6)
//!     .grant("alice", "record_8842")
//!     .build()
//!     .unwrap();
//! let pdp = PolicyDecisionPoint::new(policy, engine);
//!
//! let decision = pdp
//!     .decide(&"alice".into(), &"record_8842".into(), Some(Risk::new(0.1).unwrap()), Timestamp::EPOCH)
//!     .unwrap();
//! assert!(decision.is_permit());
//! ```

pub mod belief;
pub mod decay;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod lrap;
pub mod pdp;
pub mod pip;
pub mod snapshot;

// Kani proofs for bounded model checking
#[cfg(any(test, kani))]
mod kani_proofs;


pub use belief::{Evidence, posterior};
pub use decay::{
    DecayDomain, DecayMode, DecaySettings, DomainFallback, approx_decay, error_bound, exact_decay,
};
pub use engine::{BeliefSnapshot, TrustEngine};
pub use error::{Result, TrustError};
pub use fixed::Scale;
pub use pdp::{Decision, DecisionReason, DecisionRecord, Layer, Outcome, PolicyDecisionPoint};
pub use pip::{ContextRiskTable, FixedRisk, RiskSource};
pub use snapshot::{ObjectPolicy, PolicySnapshot, PolicySnapshotBuilder};
