//! Error taxonomy for the decision kernel.
//!
//! None of these is a security decision. A caller that receives an error
//! must treat the request as denied (fail closed) and report the fault to
//! an operator; it must never read an error as "access refused for cause".

use thiserror::Error;
use trustgate_types::{ObjectId, RangeError, SubjectId, Timestamp};

/// Error type for trust engine and policy decision operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrustError {
    /// A risk, trust, or requirement value fell outside `[0, 1]`.
    #[error("{field} out of range: {reason}")]
    InputOutOfRange { field: &'static str, reason: String },

    /// The subject has never been enrolled.
    #[error("unknown subject '{0}'")]
    UnknownSubject(SubjectId),

    /// The object is not part of the active policy snapshot.
    #[error("unknown object '{0}'")]
    UnknownObject(ObjectId),

    /// Enrollment was attempted for a subject that already has belief state.
    #[error("subject '{0}' is already enrolled")]
    AlreadyEnrolled(SubjectId),

    /// The evaluation instant precedes the subject's last committed update.
    #[error("clock regression for subject '{subject}': {now} precedes last update {last_update}")]
    ClockRegression {
        subject: SubjectId,
        now: Timestamp,
        last_update: Timestamp,
    },

    /// A configuration parameter (α, λ, K, tolerance, relation) is unusable.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// The linear decay approximation was asked to work outside its error bound.
    ///
    /// Recovered locally by [`crate::decay::DecaySettings::decay`]; it only
    /// escapes when [`crate::decay::approx_decay`] is called directly.
    #[error("decay exponent {exponent} exceeds the approximation domain {max_exponent}")]
    ApproximationDomainExceeded { exponent: f64, max_exponent: f64 },
}

impl TrustError {
    /// Returns `true` for errors caused by missing entities.
    pub fn is_unknown_entity(&self) -> bool {
        matches!(self, Self::UnknownSubject(_) | Self::UnknownObject(_))
    }

    pub(crate) fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InputOutOfRange {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(reason.into())
    }
}

impl From<RangeError> for TrustError {
    fn from(err: RangeError) -> Self {
        Self::InputOutOfRange {
            field: err.kind,
            reason: err.to_string(),
        }
    }
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, TrustError>;
