//! The trust engine: single source of truth for subject belief state.
//!
//! Each subject owns one [`BeliefRecord`] holding the last committed
//! `(τ0, timestamp)` pair. Records live in a sharded arena and each sits
//! behind its own mutex, so operations on one subject serialize with each
//! other and never wait on another subject's lock.
//!
//! Reads are just-in-time: [`TrustEngine::effective_trust`] decays the
//! committed pair to the requested instant and returns the result without
//! writing it back. Only [`TrustEngine::apply_observation`] and
//! [`TrustEngine::set_trust`] commit a new pair.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::{debug, info};
use trustgate_types::{SubjectId, Timestamp, Trust};

use crate::belief::{Evidence, posterior};
use crate::decay::{DecaySettings, validate_rate};
use crate::error::{Result, TrustError};

// ============================================================================
// Belief State
// ============================================================================

/// Committed belief for one subject.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BeliefRecord {
    trust: f64,
    updated_at: Timestamp,
    decay_rate: Option<f64>,
}

/// A copy of a subject's committed (undecayed) belief.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeliefSnapshot {
    /// Trust at `updated_at`.
    pub trust: Trust,
    /// When the belief was last committed.
    pub updated_at: Timestamp,
    /// Subject-specific λ, if it overrides the engine default.
    pub decay_rate: Option<f64>,
}

// ============================================================================
// Trust Engine
// ============================================================================

/// Owns per-subject belief state and computes effective trust on demand.
pub struct TrustEngine {
    records: DashMap<SubjectId, Arc<Mutex<BeliefRecord>>>,
    decay: ArcSwap<DecaySettings>,
}

impl TrustEngine {
    /// Creates an engine with no enrolled subjects.
    pub fn new(decay: DecaySettings) -> Self {
        Self {
            records: DashMap::new(),
            decay: ArcSwap::from_pointee(decay),
        }
    }

    /// Enrolls a subject with an initial trust prior at the engine's default λ.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::AlreadyEnrolled`] if the subject exists.
    pub fn enroll(&self, subject: SubjectId, prior: Trust, now: Timestamp) -> Result<()> {
        self.insert(subject, prior, None, now)
    }

    /// Enrolls a subject with its own decay rate.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::AlreadyEnrolled`] if the subject exists, or
    /// [`TrustError::ConfigurationInvalid`] for an invalid rate.
    pub fn enroll_with_rate(
        &self,
        subject: SubjectId,
        prior: Trust,
        decay_rate: f64,
        now: Timestamp,
    ) -> Result<()> {
        let rate = validate_rate(decay_rate)?;
        self.insert(subject, prior, Some(rate), now)
    }

    fn insert(
        &self,
        subject: SubjectId,
        prior: Trust,
        decay_rate: Option<f64>,
        now: Timestamp,
    ) -> Result<()> {
        match self.records.entry(subject) {
            Entry::Occupied(entry) => Err(TrustError::AlreadyEnrolled(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(subject = %entry.key(), prior = prior.get(), "subject enrolled");
                entry.insert(Arc::new(Mutex::new(BeliefRecord {
                    trust: prior.get(),
                    updated_at: now,
                    decay_rate,
                })));
                Ok(())
            }
        }
    }

    /// Returns the subject's trust decayed to `now`.
    ///
    /// Never mutates stored state.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::UnknownSubject`] if the subject is not enrolled, or
    /// [`TrustError::ClockRegression`] if `now` precedes the last commit.
    pub fn effective_trust(&self, subject: &SubjectId, now: Timestamp) -> Result<Trust> {
        self.effective_trust_with(subject, now, &self.decay.load())
    }

    /// Like [`TrustEngine::effective_trust`], decaying under `settings`
    /// instead of the engine's own.
    ///
    /// The decision point passes the settings pinned in its policy snapshot.
    pub fn effective_trust_with(
        &self,
        subject: &SubjectId,
        now: Timestamp,
        settings: &DecaySettings,
    ) -> Result<Trust> {
        let record = *self.record(subject)?.lock();
        let trust = decayed(settings, subject, &record, now)?;
        Ok(Trust::saturating(trust))
    }

    /// Folds an observation into the subject's belief and commits the posterior at `now`.
    ///
    /// The prior is the effective trust at `now`. The whole read-update-commit
    /// runs under the subject's lock, so concurrent observations never lose
    /// an update.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::UnknownSubject`], [`TrustError::ClockRegression`],
    /// or [`TrustError::InputOutOfRange`] if the posterior is not a valid
    /// trust. State is unchanged on error.
    pub fn apply_observation(
        &self,
        subject: &SubjectId,
        evidence: &Evidence,
        now: Timestamp,
    ) -> Result<Trust> {
        self.apply_observation_with(subject, evidence, now, &self.decay.load())
    }

    /// Like [`TrustEngine::apply_observation`], decaying the prior under
    /// `settings` instead of the engine's own.
    pub fn apply_observation_with(
        &self,
        subject: &SubjectId,
        evidence: &Evidence,
        now: Timestamp,
        settings: &DecaySettings,
    ) -> Result<Trust> {
        let cell = self.record(subject)?;

        let mut record = cell.lock();
        let prior = decayed(settings, subject, &record, now)?;
        let updated = Trust::new(posterior(prior, evidence))?;

        record.trust = updated.get();
        record.updated_at = now;
        drop(record);

        debug!(
            subject = %subject,
            prior,
            likelihood_ratio = evidence.ratio(),
            posterior = updated.get(),
            "belief updated"
        );
        Ok(updated)
    }

    /// Sets a subject's trust directly (remediation path).
    ///
    /// Used for verified re-authentication and administrative resets.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InputOutOfRange`] if `value` is outside `[0, 1]`,
    /// [`TrustError::UnknownSubject`], or [`TrustError::ClockRegression`].
    /// State is unchanged on error.
    pub fn set_trust(&self, subject: &SubjectId, value: f64, now: Timestamp) -> Result<Trust> {
        let trust = Trust::new(value)?;
        let cell = self.record(subject)?;

        let mut record = cell.lock();
        if now < record.updated_at {
            return Err(TrustError::ClockRegression {
                subject: subject.clone(),
                now,
                last_update: record.updated_at,
            });
        }
        record.trust = trust.get();
        record.updated_at = now;
        drop(record);

        info!(subject = %subject, trust = trust.get(), "trust set by remediation");
        Ok(trust)
    }

    /// Returns the committed (undecayed) belief for a subject.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::UnknownSubject`] if the subject is not enrolled.
    pub fn belief(&self, subject: &SubjectId) -> Result<BeliefSnapshot> {
        let record = *self.record(subject)?.lock();
        Ok(BeliefSnapshot {
            trust: Trust::saturating(record.trust),
            updated_at: record.updated_at,
            decay_rate: record.decay_rate,
        })
    }

    pub fn is_enrolled(&self, subject: &SubjectId) -> bool {
        self.records.contains_key(subject)
    }

    pub fn subject_count(&self) -> usize {
        self.records.len()
    }

    /// Returns the active decay settings.
    pub fn decay_settings(&self) -> Arc<DecaySettings> {
        self.decay.load_full()
    }

    /// Replaces the decay settings atomically.
    ///
    /// Committed beliefs are untouched; subsequent reads use the new settings.
    pub fn reload_decay(&self, settings: DecaySettings) {
        info!(
            rate = settings.default_rate(),
            mode = ?settings.mode(),
            "decay settings reloaded"
        );
        self.decay.store(Arc::new(settings));
    }

    /// Clones the subject's cell out of the arena.
    ///
    /// The shard guard is released before the caller locks the cell, so a
    /// long critical section on one subject never pins its shard.
    fn record(&self, subject: &SubjectId) -> Result<Arc<Mutex<BeliefRecord>>> {
        self.records
            .get(subject)
            .map(|cell| Arc::clone(cell.value()))
            .ok_or_else(|| TrustError::UnknownSubject(subject.clone()))
    }

    #[cfg(test)]
    pub(crate) fn with_locked<R>(&self, subject: &SubjectId, f: impl FnOnce() -> R) -> R {
        let cell = self.record(subject).expect("enrolled subject");
        let _guard = cell.lock();
        f()
    }
}

impl Default for TrustEngine {
    fn default() -> Self {
        Self::new(DecaySettings::default())
    }
}

impl std::fmt::Debug for TrustEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustEngine")
            .field("subjects", &self.records.len())
            .field("decay", &**self.decay.load())
            .finish()
    }
}

/// Decays a committed record to `now`.
fn decayed(
    settings: &DecaySettings,
    subject: &SubjectId,
    record: &BeliefRecord,
    now: Timestamp,
) -> Result<f64> {
    let elapsed = now
        .seconds_since(record.updated_at)
        .ok_or_else(|| TrustError::ClockRegression {
            subject: subject.clone(),
            now,
            last_update: record.updated_at,
        })?;
    let rate = record.decay_rate.unwrap_or(settings.default_rate());
    Ok(settings.decay(record.trust, rate, elapsed))
}
