//! Immutable policy configuration.
//!
//! A [`PolicySnapshot`] bundles everything the decision point reads that an
//! administrator can change: the risk sensitivity α, the fixed-point scale,
//! per-object base requirements, the static attribute relation, and
//! optionally the decay settings and the context risk table. It is never
//! mutated after [`PolicySnapshotBuilder::build`]; administrative changes
//! build a new snapshot and swap it in whole, so one decision reads every
//! parameter from the same generation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use trustgate_types::{BaseRequirement, ObjectId, SubjectId};

use crate::decay::DecaySettings;
use crate::error::{Result, TrustError};
use crate::fixed::Scale;
use crate::pip::ContextRiskTable;

/// Default risk sensitivity: maximum risk raises the requirement by 50%.
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Largest accepted risk sensitivity.
pub const MAX_ALPHA: f64 = 10.0;

// ============================================================================
// Object Policy
// ============================================================================

/// Per-object requirement, in real and fixed-point form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPolicy {
    base: BaseRequirement,
    base_fixed: u64,
}

impl ObjectPolicy {
    pub fn base_requirement(&self) -> BaseRequirement {
        self.base
    }

    /// Base requirement at the snapshot's scale, rounded up.
    pub fn base_fixed(&self) -> u64 {
        self.base_fixed
    }
}

// ============================================================================
// Policy Snapshot
// ============================================================================

/// Read-only policy state consulted by every decision.
#[derive(Debug, Clone)]
pub struct PolicySnapshot {
    alpha: f64,
    alpha_fixed: u64,
    scale: Scale,
    objects: Arc<HashMap<ObjectId, ObjectPolicy>>,
    grants: Arc<HashMap<SubjectId, HashSet<ObjectId>>>,
    decay: Option<DecaySettings>,
    risk_table: Option<ContextRiskTable>,
}

impl PolicySnapshot {
    /// Starts a snapshot with default α and scale and no objects.
    pub fn builder() -> PolicySnapshotBuilder {
        PolicySnapshotBuilder::default()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// α at the snapshot's scale, rounded up.
    pub fn alpha_fixed(&self) -> u64 {
        self.alpha_fixed
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Looks up an object's policy.
    pub fn object(&self, object: &ObjectId) -> Option<&ObjectPolicy> {
        self.objects.get(object)
    }

    /// Returns `true` if the static attribute relation contains `(subject, object)`.
    pub fn is_granted(&self, subject: &SubjectId, object: &ObjectId) -> bool {
        self.grants
            .get(subject)
            .is_some_and(|objects| objects.contains(object))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn grant_count(&self) -> usize {
        self.grants.values().map(HashSet::len).sum()
    }

    /// Decay settings pinned to this snapshot, if any.
    ///
    /// When absent, the decision point decays with the engine's own settings.
    pub fn decay(&self) -> Option<&DecaySettings> {
        self.decay.as_ref()
    }

    /// Context risk table consulted when a request carries no risk.
    pub fn risk_table(&self) -> Option<&ContextRiskTable> {
        self.risk_table.as_ref()
    }

    /// Copy of this snapshot with the risk table's active context switched.
    ///
    /// Object and grant maps are shared with `self`. Returns `None` when the
    /// snapshot has no risk table.
    pub fn with_active_context(&self, context: &str) -> Option<Self> {
        let table = self.risk_table.as_ref()?.with_active(context);
        Some(Self {
            risk_table: Some(table),
            ..self.clone()
        })
    }

    /// Copy of this snapshot whose risk table adopts `context` if the table
    /// has no active context of its own.
    pub(crate) fn inheriting_context(self, context: Option<&str>) -> Self {
        let adopted = match (self.risk_table.as_ref(), context) {
            (Some(table), Some(context)) if table.active().is_none() => {
                Some(table.with_active(context))
            }
            _ => None,
        };
        match adopted {
            Some(table) => Self {
                risk_table: Some(table),
                ..self
            },
            None => self,
        }
    }
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            alpha_fixed: Scale::DEFAULT.ceil(DEFAULT_ALPHA),
            scale: Scale::DEFAULT,
            objects: Arc::new(HashMap::new()),
            grants: Arc::new(HashMap::new()),
            decay: None,
            risk_table: None,
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects policy parameters and validates them all at once.
#[derive(Debug, Clone)]
pub struct PolicySnapshotBuilder {
    alpha: f64,
    scale: u64,
    objects: Vec<(ObjectId, f64)>,
    grants: Vec<(SubjectId, ObjectId)>,
    decay: Option<DecaySettings>,
    risk_table: Option<ContextRiskTable>,
}

impl Default for PolicySnapshotBuilder {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            scale: Scale::DEFAULT.get(),
            objects: Vec::new(),
            grants: Vec::new(),
            decay: None,
            risk_table: None,
        }
    }
}

impl PolicySnapshotBuilder {
    /// Sets the risk sensitivity coefficient α.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the fixed-point scale `K`.
    pub fn scale(mut self, scale: u64) -> Self {
        self.scale = scale;
        self
    }

    /// Declares an object and its base trust requirement.
    pub fn object(mut self, object: impl Into<ObjectId>, base_requirement: f64) -> Self {
        self.objects.push((object.into(), base_requirement));
        self
    }

    /// Adds `(subject, object)` to the static attribute relation.
    pub fn grant(mut self, subject: impl Into<SubjectId>, object: impl Into<ObjectId>) -> Self {
        self.grants.push((subject.into(), object.into()));
        self
    }

    /// Pins decay settings to the snapshot.
    pub fn decay(mut self, settings: DecaySettings) -> Self {
        self.decay = Some(settings);
        self
    }

    /// Attaches the context risk table.
    pub fn risk_table(mut self, table: ContextRiskTable) -> Self {
        self.risk_table = Some(table);
        self
    }

    /// Validates and freezes the snapshot.
    ///
    /// # Errors
    ///
    /// - [`TrustError::ConfigurationInvalid`] for α outside `[0, MAX_ALPHA]`,
    ///   an invalid scale, a duplicate object, or a grant naming an undeclared object.
    /// - [`TrustError::InputOutOfRange`] for a base requirement outside `[0, 1]`.
    pub fn build(self) -> Result<PolicySnapshot> {
        if !(self.alpha.is_finite() && (0.0..=MAX_ALPHA).contains(&self.alpha)) {
            return Err(TrustError::config(format!(
                "risk sensitivity alpha must be in [0, {MAX_ALPHA}], got {}",
                self.alpha
            )));
        }
        let scale = Scale::new(self.scale)?;

        let mut objects = HashMap::with_capacity(self.objects.len());
        for (object, base) in self.objects {
            let base = BaseRequirement::new(base)?;
            let policy = ObjectPolicy {
                base,
                base_fixed: scale.ceil(base.get()),
            };
            if objects.insert(object.clone(), policy).is_some() {
                return Err(TrustError::config(format!(
                    "object '{object}' declared more than once"
                )));
            }
        }

        let mut grants: HashMap<SubjectId, HashSet<ObjectId>> = HashMap::new();
        for (subject, object) in self.grants {
            if !objects.contains_key(&object) {
                return Err(TrustError::config(format!(
                    "grant for subject '{subject}' names undeclared object '{object}'"
                )));
            }
            grants.entry(subject).or_default().insert(object);
        }

        let snapshot = PolicySnapshot {
            alpha: self.alpha,
            alpha_fixed: scale.ceil(self.alpha),
            scale,
            objects: Arc::new(objects),
            grants: Arc::new(grants),
            decay: self.decay,
            risk_table: self.risk_table,
        };

        // Postcondition: every base requirement is representable at this scale.
        debug_assert!(
            snapshot
                .objects
                .values()
                .all(|o| o.base_fixed <= snapshot.scale.get())
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PolicySnapshot {
        PolicySnapshot::builder()
            .alpha(0.5)
            .scale(10)
            .object("record_8842", 0.6)
            .object("public_page", 0.0)
            .grant("alice", "record_8842")
            .build()
            .expect("valid snapshot")
    }

    #[test]
    fn test_static_relation_lookup() {
        let snapshot = sample();
        assert!(snapshot.is_granted(&"alice".into(), &"record_8842".into()));
        assert!(!snapshot.is_granted(&"alice".into(), &"public_page".into()));
        assert!(!snapshot.is_granted(&"mallory".into(), &"record_8842".into()));
        assert_eq!(snapshot.grant_count(), 1);
        assert_eq!(snapshot.object_count(), 2);
    }

    #[test]
    fn test_fixed_point_quantization() {
        let snapshot = sample();
        assert_eq!(snapshot.alpha_fixed(), 5);
        let record = snapshot.object(&"record_8842".into()).unwrap();
        assert_eq!(record.base_fixed(), 6);
    }

    #[test]
    fn test_rejects_bad_alpha() {
        let err = PolicySnapshot::builder().alpha(-0.1).build().unwrap_err();
        assert!(matches!(err, TrustError::ConfigurationInvalid(_)));
        assert!(PolicySnapshot::builder().alpha(f64::NAN).build().is_err());
        assert!(PolicySnapshot::builder().alpha(MAX_ALPHA + 1.0).build().is_err());
    }

    #[test]
    fn test_rejects_bad_requirement() {
        let err = PolicySnapshot::builder()
            .object("vault", 1.2)
            .build()
            .unwrap_err();
        assert!(matches!(err, TrustError::InputOutOfRange { .. }));
    }

    #[test]
    fn test_rejects_duplicate_object() {
        let result = PolicySnapshot::builder()
            .object("vault", 0.2)
            .object("vault", 0.3)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_dangling_grant() {
        let result = PolicySnapshot::builder().grant("alice", "ghost").build();
        assert!(matches!(result, Err(TrustError::ConfigurationInvalid(_))));
    }

    #[test]
    fn test_context_switch_keeps_everything_else() {
        let snapshot = PolicySnapshot::builder()
            .alpha(0.5)
            .object("record_8842", 0.6)
            .decay(DecaySettings::exact(0.0).unwrap())
            .risk_table(ContextRiskTable::with_defaults())
            .build()
            .unwrap();
        assert!(snapshot.risk_table().unwrap().active().is_none());

        let switched = snapshot.with_active_context("public_cafe").unwrap();
        assert_eq!(switched.risk_table().unwrap().active(), Some("public_cafe"));
        assert_eq!(switched.alpha(), snapshot.alpha());
        assert_eq!(switched.object_count(), 1);
        assert_eq!(switched.decay(), snapshot.decay());

        assert!(sample().with_active_context("public_cafe").is_none());
    }

    #[test]
    fn test_inherits_context_only_when_unset() {
        let bare = PolicySnapshot::builder()
            .risk_table(ContextRiskTable::with_defaults())
            .build()
            .unwrap();
        let inherited = bare.inheriting_context(Some("hospital_wifi"));
        assert_eq!(inherited.risk_table().unwrap().active(), Some("hospital_wifi"));

        let kept = inherited.inheriting_context(Some("public_cafe"));
        assert_eq!(kept.risk_table().unwrap().active(), Some("hospital_wifi"));
    }

    #[test]
    fn test_rejects_bad_scale() {
        assert!(PolicySnapshot::builder().scale(0).build().is_err());
    }
}
