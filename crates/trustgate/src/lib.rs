//! # trustgate
//!
//! Risk-adaptive, trust-decaying access decisions for zero-trust gateways.
//!
//! A subject's trust is a belief that decays while nothing is heard from it
//! and moves with evidence (successful MFA, anomalous traffic). Every access
//! request is decided just in time:
//!
//! - **Layer 1** refuses any `(subject, object)` pair outside the static
//!   attribute relation, whatever the trust or risk.
//! - **Layer 2** permits only if `trust ≥ b + b·α·risk`, evaluated in
//!   fixed point with the full product taken before dividing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Trustgate                            │
//! │  ┌──────────┐   ┌──────────────┐   ┌───────────────────────┐  │
//! │  │  Config  │ → │   Snapshot   │ → │  PolicyDecisionPoint  │  │
//! │  │ (layers) │   │  (ArcSwap)   │   │  Layer 1 → Layer 2    │  │
//! │  └──────────┘   └──────────────┘   └───────────┬───────────┘  │
//! │                                                ▼              │
//! │  ┌──────────────────────────┐   ┌───────────────────────┐    │
//! │  │ TrustEngine (per-subject │   │ Risk (request value,  │    │
//! │  │ locks, JIT decay)        │   │ snapshot table, PIP)  │    │
//! │  └──────────────────────────┘   └───────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use trustgate::{Evidence, Trustgate, TrustgateConfig};
//! use trustgate::{ObjectId, SubjectId, Timestamp};
//!
//! let config: TrustgateConfig = toml::from_str(r#"
//!     [[objects]]
//!     id = "record_8842"
//!     base_requirement = 0.6
//!
//!     [[grants]]
//!     subject = "alice"
//!     object = "record_8842"
//!
//!     [[subjects]]
//!     id = "alice"
//!     initial_trust = 0.75
//! "#).unwrap();
//!
//! let start = Timestamp::from_secs(1_000);
//! let gate = Trustgate::from_config_at(&config, start).unwrap();
//! let alice = SubjectId::new("alice");
//! let record = ObjectId::new("record_8842");
//!
//! assert!(gate.authorize(&alice, &record, Some(0.1), start));
//! assert!(!gate.authorize(&alice, &record, Some(0.9), start));
//!
//! gate.observe(&alice, &Evidence::mfa_success(), start).unwrap();
//! assert!(gate.authorize(&alice, &record, Some(0.9), start));
//! ```

mod build;
mod gate;

pub use gate::Trustgate;

// Re-export configuration
pub use trustgate_config::{ConfigError, ConfigLoader, RiskContextConfig, TrustgateConfig};

// Re-export core types
pub use trustgate_types::{BaseRequirement, ObjectId, RangeError, Risk, SubjectId, Timestamp, Trust};

// Re-export kernel types
pub use trustgate_kernel::{
    BeliefSnapshot, ContextRiskTable, Decision, DecisionReason, DecisionRecord, DecayMode,
    DecaySettings, DomainFallback, Evidence, FixedRisk, Layer, Outcome, PolicyDecisionPoint,
    PolicySnapshot, Result, RiskSource, TrustEngine, TrustError,
};
