//! Two-layer policy decision point.
//!
//! Every decision runs the layers in a fixed order:
//!
//! 1. **Static check.** `(subject, object)` must be in the attribute
//!    relation. A mismatch is a DENY that no trust or risk value can
//!    change; Layer 2 is not evaluated.
//! 2. **Risk-adaptive inequality.** The subject's just-in-time trust is
//!    compared against `b + b·α·risk` in fixed point (see [`crate::lrap`]).
//!
//! The decision point holds no per-call state. It reads one policy
//! snapshot per decision (α, requirements, grants, decay settings, and the
//! risk table all come from that one load) and never writes to the trust
//! engine, so re-evaluating a request against unchanged state gives the
//! same answer.
//!
//! Errors are not decisions. A missing object, unknown subject, missing
//! risk, or out-of-range input comes back as `Err`, and callers must fail
//! closed on it.

use std::fmt::{self, Display};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trustgate_types::{ObjectId, Risk, SubjectId, Timestamp, Trust};

use crate::belief::Evidence;
use crate::engine::TrustEngine;
use crate::error::{Result, TrustError};
use crate::lrap;
use crate::pip::{ContextRiskTable, RiskSource};
use crate::snapshot::PolicySnapshot;

// ============================================================================
// Decision
// ============================================================================

/// PERMIT or DENY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Permit,
    Deny,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permit => write!(f, "PERMIT"),
            Self::Deny => write!(f, "DENY"),
        }
    }
}

/// The evaluation layer that produced a DENY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    /// Layer 1: the static attribute relation.
    Static,
    /// Layer 2: the risk-adaptive trust inequality.
    RiskAdaptive,
}

/// Why a decision came out the way it did.
///
/// Safe to show to the requesting subject: the `Display` form names the
/// layer but carries no trust, risk, or threshold values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    /// Both layers passed.
    Permitted,
    /// Layer 1: no static attribute match.
    StaticMismatch,
    /// Layer 2: effective trust is below the risk-adjusted requirement.
    InsufficientTrust,
    /// Layer 2: the risk-adjusted requirement exceeds maximum trust.
    Lockdown,
}

impl DecisionReason {
    /// Returns the layer that denied, or `None` for a permit.
    pub fn layer(self) -> Option<Layer> {
        match self {
            Self::Permitted => None,
            Self::StaticMismatch => Some(Layer::Static),
            Self::InsufficientTrust | Self::Lockdown => Some(Layer::RiskAdaptive),
        }
    }
}

impl Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permitted => write!(f, "access permitted"),
            Self::StaticMismatch => write!(f, "access denied: no static attribute match"),
            Self::InsufficientTrust => {
                write!(f, "access denied: trust below the risk-adjusted requirement")
            }
            Self::Lockdown => write!(f, "access denied: risk lockdown in effect"),
        }
    }
}

/// Operator-facing record of the inputs a decision used.
///
/// Layer 2 fields are `None` when Layer 1 denied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub subject: SubjectId,
    pub object: ObjectId,
    pub evaluated_at: Timestamp,
    pub risk_used: Option<Risk>,
    pub effective_trust_used: Option<Trust>,
    /// Risk-adjusted requirement in `[0, 1]` real terms (may exceed 1 under lockdown).
    pub threshold_computed: Option<f64>,
    /// The same requirement in fixed point, at `scale`.
    pub threshold_fixed: Option<u64>,
    pub scale: u64,
    pub outcome: Outcome,
}

/// Result of a policy decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: Outcome,
    pub reason: DecisionReason,
    pub record: DecisionRecord,
}

impl Decision {
    pub fn is_permit(&self) -> bool {
        self.outcome == Outcome::Permit
    }

    /// The layer that denied, or `None` for a permit.
    pub fn layer(&self) -> Option<Layer> {
        self.reason.layer()
    }
}

// ============================================================================
// Policy Decision Point
// ============================================================================

/// Evaluates access requests against the active policy snapshot.
pub struct PolicyDecisionPoint {
    policy: ArcSwap<PolicySnapshot>,
    trust: Arc<TrustEngine>,
    risk_source: Option<Arc<dyn RiskSource>>,
    audit_enabled: bool,
}

impl PolicyDecisionPoint {
    /// Creates a decision point over a policy snapshot and a trust engine.
    pub fn new(policy: PolicySnapshot, trust: Arc<TrustEngine>) -> Self {
        Self {
            policy: ArcSwap::from_pointee(policy),
            trust,
            risk_source: None,
            audit_enabled: true,
        }
    }

    /// Sets the source queried when a request carries no risk.
    pub fn with_risk_source(mut self, source: Arc<dyn RiskSource>) -> Self {
        self.risk_source = Some(source);
        self
    }

    /// Disables audit logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    /// Returns the active policy snapshot.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.policy.load_full()
    }

    /// Swaps in a new policy snapshot.
    ///
    /// Decisions already in flight finish against the snapshot they loaded.
    /// If the new risk table names no active context, it keeps the one that
    /// is active at the instant of the swap; a concurrent
    /// [`Self::set_risk_context`] is never lost.
    pub fn reload(&self, policy: PolicySnapshot) {
        info!(
            alpha = policy.alpha(),
            scale = policy.scale().get(),
            objects = policy.object_count(),
            grants = policy.grant_count(),
            "policy snapshot reloaded"
        );
        self.policy.rcu(|current| {
            let active = current.risk_table().and_then(ContextRiskTable::active);
            Arc::new(policy.clone().inheriting_context(active))
        });
    }

    /// Switches the active context of the snapshot's risk table.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::ConfigurationInvalid`] if the active snapshot has
    /// no risk table.
    pub fn set_risk_context(&self, context: &str) -> Result<()> {
        let mut switched = false;
        self.policy.rcu(|current| {
            let next = current.with_active_context(context);
            switched = next.is_some();
            next.map_or_else(|| Arc::clone(current), Arc::new)
        });
        if !switched {
            return Err(TrustError::config(format!(
                "cannot switch to risk context '{context}': no risk table configured"
            )));
        }
        info!(context, "risk context switched");
        Ok(())
    }

    /// Effective trust at `now`, decayed with the active snapshot's settings.
    ///
    /// # Errors
    ///
    /// Everything [`TrustEngine::effective_trust`] returns.
    pub fn effective_trust(&self, subject: &SubjectId, now: Timestamp) -> Result<Trust> {
        self.trust_at(&self.policy.load(), subject, now)
    }

    /// Folds evidence into a subject's belief, decaying the prior with the
    /// active snapshot's settings.
    ///
    /// # Errors
    ///
    /// Everything [`TrustEngine::apply_observation`] returns.
    pub fn apply_observation(
        &self,
        subject: &SubjectId,
        evidence: &Evidence,
        now: Timestamp,
    ) -> Result<Trust> {
        match self.policy.load().decay() {
            Some(settings) => self
                .trust
                .apply_observation_with(subject, evidence, now, settings),
            None => self.trust.apply_observation(subject, evidence, now),
        }
    }

    pub fn trust_engine(&self) -> &Arc<TrustEngine> {
        &self.trust
    }

    /// Decides a request, taking the risk as a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InputOutOfRange`] if `risk` is outside `[0, 1]`,
    /// plus everything [`Self::decide`] returns.
    pub fn decide_raw(
        &self,
        subject: &SubjectId,
        object: &ObjectId,
        risk: Option<f64>,
        now: Timestamp,
    ) -> Result<Decision> {
        let risk = risk.map(Risk::new).transpose()?;
        self.decide(subject, object, risk, now)
    }

    /// Decides whether `subject` may access `object` at `now`.
    ///
    /// When `risk` is `None` the snapshot's risk table is consulted, then the
    /// configured [`RiskSource`], but only once Layer 1 passes and the
    /// subject's trust is known.
    ///
    /// # Errors
    ///
    /// - [`TrustError::UnknownObject`] if the object is not in the snapshot.
    /// - [`TrustError::UnknownSubject`] if Layer 1 passes for a subject the
    ///   trust engine has never seen.
    /// - [`TrustError::ConfigurationInvalid`] if risk is needed and neither a
    ///   risk table with an active context nor a source is configured, or any
    ///   error the risk source reports.
    /// - [`TrustError::ClockRegression`] if `now` precedes the subject's last update.
    pub fn decide(
        &self,
        subject: &SubjectId,
        object: &ObjectId,
        risk: Option<Risk>,
        now: Timestamp,
    ) -> Result<Decision> {
        let policy = self.policy.load();
        let scale = policy.scale();
        let object_policy = policy
            .object(object)
            .ok_or_else(|| TrustError::UnknownObject(object.clone()))?;

        let mut record = DecisionRecord {
            subject: subject.clone(),
            object: object.clone(),
            evaluated_at: now,
            risk_used: None,
            effective_trust_used: None,
            threshold_computed: None,
            threshold_fixed: None,
            scale: scale.get(),
            outcome: Outcome::Deny,
        };

        // Layer 1
        if !policy.is_granted(subject, object) {
            let decision = Decision {
                outcome: Outcome::Deny,
                reason: DecisionReason::StaticMismatch,
                record,
            };
            self.audit(&decision);
            return Ok(decision);
        }

        // Layer 2
        let trust = self.trust_at(&policy, subject, now)?;
        let risk = match risk {
            Some(risk) => risk,
            None => self.query_risk(&policy)?,
        };

        let outcome = lrap::evaluate(
            scale.floor(trust.get()),
            object_policy.base_fixed(),
            policy.alpha_fixed(),
            scale.ceil(risk.get()),
            scale,
        );
        let reason = if outcome.permitted {
            DecisionReason::Permitted
        } else if outcome.lockdown {
            DecisionReason::Lockdown
        } else {
            DecisionReason::InsufficientTrust
        };

        record.risk_used = Some(risk);
        record.effective_trust_used = Some(trust);
        record.threshold_computed = Some(scale.to_real(outcome.threshold));
        record.threshold_fixed = Some(outcome.threshold);
        record.outcome = if outcome.permitted {
            Outcome::Permit
        } else {
            Outcome::Deny
        };

        let decision = Decision {
            outcome: record.outcome,
            reason,
            record,
        };

        // Postcondition: a static mismatch never reaches this point.
        debug_assert!(policy.is_granted(subject, object));

        self.audit(&decision);
        Ok(decision)
    }

    fn trust_at(&self, policy: &PolicySnapshot, subject: &SubjectId, now: Timestamp) -> Result<Trust> {
        match policy.decay() {
            Some(settings) => self.trust.effective_trust_with(subject, now, settings),
            None => self.trust.effective_trust(subject, now),
        }
    }

    fn query_risk(&self, policy: &PolicySnapshot) -> Result<Risk> {
        if let Some(table) = policy.risk_table() {
            if table.active().is_some() || self.risk_source.is_none() {
                return table.current_risk();
            }
        }
        let source = self.risk_source.as_ref().ok_or_else(|| {
            TrustError::config("request carries no risk and no risk source is configured")
        })?;
        source.current_risk()
    }

    fn audit(&self, decision: &Decision) {
        if !self.audit_enabled {
            return;
        }
        let record = &decision.record;
        if decision.is_permit() {
            info!(
                subject = %record.subject,
                object = %record.object,
                risk = ?record.risk_used.map(Risk::get),
                trust = ?record.effective_trust_used.map(Trust::get),
                threshold = ?record.threshold_computed,
                "access permitted"
            );
        } else {
            warn!(
                subject = %record.subject,
                object = %record.object,
                layer = ?decision.layer(),
                reason = ?decision.reason,
                risk = ?record.risk_used.map(Risk::get),
                trust = ?record.effective_trust_used.map(Trust::get),
                threshold = ?record.threshold_computed,
                "access denied"
            );
        }
    }
}

impl fmt::Debug for PolicyDecisionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyDecisionPoint")
            .field("policy", &**self.policy.load())
            .field("trust", &self.trust)
            .field("has_risk_source", &self.risk_source.is_some())
            .field("audit_enabled", &self.audit_enabled)
            .finish()
    }
}
