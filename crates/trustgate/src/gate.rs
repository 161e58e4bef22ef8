//! Main entry point for gateways.
//!
//! [`Trustgate`] wires a trust engine and a decision point together from one
//! [`TrustgateConfig`]. Policy, decay settings and the context risk table
//! travel in a single snapshot, so a reload is observed all at once. It is the surface a policy
//! enforcement point calls: [`Trustgate::authorize`] collapses every fault
//! into a DENY, while [`Trustgate::decide`] keeps faults and decisions apart
//! for callers that want to report them separately.

use std::sync::Arc;

use tracing::{error, info};
use trustgate_config::TrustgateConfig;
use trustgate_kernel::{Decision, Evidence, PolicyDecisionPoint, Result, TrustEngine, TrustError};
use trustgate_types::{ObjectId, Risk, SubjectId, Timestamp, Trust};

use crate::build;

/// A configured decision kernel.
#[derive(Debug)]
pub struct Trustgate {
    engine: Arc<TrustEngine>,
    pdp: PolicyDecisionPoint,
}

impl Trustgate {
    /// Builds the kernel from a configuration, enrolling its subjects now.
    ///
    /// # Errors
    ///
    /// Returns [`trustgate_kernel::TrustError::ConfigurationInvalid`] or
    /// [`trustgate_kernel::TrustError::InputOutOfRange`] for an unusable configuration.
    pub fn from_config(config: &TrustgateConfig) -> Result<Self> {
        Self::from_config_at(config, Timestamp::now())
    }

    /// Builds the kernel, enrolling configured subjects at `now`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_config`].
    pub fn from_config_at(config: &TrustgateConfig, now: Timestamp) -> Result<Self> {
        build::validate(config)?;
        let decay = build::decay_settings(&config.decay)?;
        let policy = build::policy_snapshot(config)?;

        let engine = Arc::new(TrustEngine::new(decay));
        enroll_subjects(&engine, config, now)?;

        let pdp = PolicyDecisionPoint::new(policy, Arc::clone(&engine));

        info!(
            subjects = engine.subject_count(),
            objects = config.objects.len(),
            grants = config.grants.len(),
            "trustgate initialized"
        );

        Ok(Self { engine, pdp })
    }

    /// Disables decision audit logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.pdp = self.pdp.without_audit();
        self
    }

    /// Replaces policy, decay settings and risk table from a new configuration.
    ///
    /// Everything is built before anything is swapped, so an invalid
    /// configuration leaves the running one untouched. Subjects new to the
    /// configuration are enrolled before the swap, so the new policy never
    /// grants a subject the engine cannot find. Existing belief state is kept.
    ///
    /// Policy, decay settings and the risk table are swapped as one snapshot.
    /// A configuration without `active_context` keeps the context that is
    /// active at the instant of the swap.
    ///
    /// # Errors
    ///
    /// See [`Self::from_config`].
    pub fn reload(&self, config: &TrustgateConfig) -> Result<()> {
        self.reload_at(config, Timestamp::now())
    }

    /// Like [`Self::reload`], enrolling new subjects at `now`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_config`].
    pub fn reload_at(&self, config: &TrustgateConfig, now: Timestamp) -> Result<()> {
        build::validate(config)?;
        let decay = build::decay_settings(&config.decay)?;
        let policy = build::policy_snapshot(config)?;

        enroll_subjects(&self.engine, config, now)?;
        self.pdp.reload(policy);
        // Direct engine callers see the new defaults; decisions already
        // read them from the snapshot.
        self.engine.reload_decay(decay);
        Ok(())
    }

    /// Decides a request; faults come back as `Err`, never as a decision.
    ///
    /// # Errors
    ///
    /// See [`PolicyDecisionPoint::decide`].
    pub fn decide(
        &self,
        subject: &SubjectId,
        object: &ObjectId,
        risk: Option<Risk>,
        now: Timestamp,
    ) -> Result<Decision> {
        self.pdp.decide(subject, object, risk, now)
    }

    /// Fail-closed gateway check: `true` only for a PERMIT.
    ///
    /// Any error (unknown entity, out-of-range risk, missing risk source,
    /// clock regression) is logged and denies.
    pub fn authorize(
        &self,
        subject: &SubjectId,
        object: &ObjectId,
        risk: Option<f64>,
        now: Timestamp,
    ) -> bool {
        match self.pdp.decide_raw(subject, object, risk, now) {
            Ok(decision) => decision.is_permit(),
            Err(err) => {
                error!(
                    subject = %subject,
                    object = %object,
                    error = %err,
                    "decision fault, failing closed"
                );
                false
            }
        }
    }

    /// Folds an authentication or behavior observation into a subject's trust.
    ///
    /// # Errors
    ///
    /// See [`TrustEngine::apply_observation`].
    pub fn observe(&self, subject: &SubjectId, evidence: &Evidence, now: Timestamp) -> Result<Trust> {
        self.pdp.apply_observation(subject, evidence, now)
    }

    /// Restores full trust after a verified re-authentication.
    ///
    /// # Errors
    ///
    /// See [`TrustEngine::set_trust`].
    pub fn remediate(&self, subject: &SubjectId, now: Timestamp) -> Result<Trust> {
        self.engine.set_trust(subject, Trust::ONE.get(), now)
    }

    /// Enrolls a subject outside the configuration.
    ///
    /// # Errors
    ///
    /// See [`TrustEngine::enroll`].
    pub fn enroll(&self, subject: SubjectId, prior: Trust, now: Timestamp) -> Result<()> {
        self.engine.enroll(subject, prior, now)
    }

    /// Returns a subject's trust decayed to `now`.
    ///
    /// # Errors
    ///
    /// See [`TrustEngine::effective_trust`].
    pub fn effective_trust(&self, subject: &SubjectId, now: Timestamp) -> Result<Trust> {
        self.pdp.effective_trust(subject, now)
    }

    /// Switches the risk context reported for requests that carry no risk.
    ///
    /// # Errors
    ///
    /// See [`PolicyDecisionPoint::set_risk_context`].
    pub fn set_risk_context(&self, context: &str) -> Result<()> {
        self.pdp.set_risk_context(context)
    }

    pub fn engine(&self) -> &Arc<TrustEngine> {
        &self.engine
    }

    pub fn decision_point(&self) -> &PolicyDecisionPoint {
        &self.pdp
    }
}

/// Enrolls every configured subject the engine does not know yet.
///
/// A subject enrolled concurrently through [`Trustgate::enroll`] keeps its
/// state and counts as enrolled.
fn enroll_subjects(engine: &TrustEngine, config: &TrustgateConfig, now: Timestamp) -> Result<()> {
    for subject in &config.subjects {
        let id = SubjectId::new(subject.id.as_str());
        let prior = Trust::new(subject.initial_trust)?;
        let enrolled = match subject.decay_rate {
            Some(rate) => engine.enroll_with_rate(id, prior, rate, now),
            None => engine.enroll(id, prior, now),
        };
        match enrolled {
            Ok(()) | Err(TrustError::AlreadyEnrolled(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
