//! # trustgate-types: Core types for `trustgate`
//!
//! Shared vocabulary for the decision kernel and its collaborators:
//! - Entity IDs ([`SubjectId`], [`ObjectId`])
//! - Temporal types ([`Timestamp`])
//! - Unit-interval scores ([`Trust`], [`Risk`], [`BaseRequirement`])
//!
//! Every score type is validated on construction, so a value of one of these
//! types is always finite and inside `[0, 1]`.

use std::{
    fmt::Display,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Entity IDs
// ============================================================================

/// Identity of a subject (user, device, or service account) whose trust is tracked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identity of a protected object (resource).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ============================================================================
// Temporal Types
// ============================================================================

/// Wall-clock timestamp with nanosecond precision.
///
/// The kernel never reads the clock itself: every operation takes the
/// evaluation instant as an argument, which keeps decisions reproducible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch (1970-01-01 00:00:00 UTC).
    pub const EPOCH: Timestamp = Timestamp(0);

    const NANOS_PER_SEC: u64 = 1_000_000_000;

    /// Creates a timestamp from nanoseconds since Unix epoch.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a timestamp from whole seconds since Unix epoch (saturating).
    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(Self::NANOS_PER_SEC))
    }

    /// Creates a timestamp from fractional seconds since Unix epoch.
    ///
    /// Negative and non-finite inputs map to the epoch.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::EPOCH;
        }
        Self((secs * Self::NANOS_PER_SEC as f64) as u64)
    }

    /// Returns the timestamp as nanoseconds since Unix epoch.
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Returns the timestamp as seconds since Unix epoch (truncates nanoseconds).
    pub fn as_secs(&self) -> u64 {
        self.0 / Self::NANOS_PER_SEC
    }

    /// Creates a timestamp for the current time.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is before Unix epoch (should never happen).
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before Unix epoch");
        Self(duration.as_nanos() as u64)
    }

    /// Returns this timestamp advanced by fractional seconds (saturating).
    pub fn plus_secs(self, secs: f64) -> Self {
        Self(self.0.saturating_add(Self::from_secs_f64(secs).0))
    }

    /// Elapsed seconds from `earlier` to `self`.
    ///
    /// Returns `None` when `earlier` is after `self`: time never runs
    /// backwards inside the kernel.
    pub fn seconds_since(&self, earlier: Timestamp) -> Option<f64> {
        let nanos = self.0.checked_sub(earlier.0)?;
        Some(nanos as f64 / Self::NANOS_PER_SEC as f64)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / Self::NANOS_PER_SEC;
        let nanos = self.0 % Self::NANOS_PER_SEC;
        write!(f, "{secs}.{nanos:09}")
    }
}

impl From<u64> for Timestamp {
    fn from(nanos: u64) -> Self {
        Self(nanos)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

// ============================================================================
// Unit-Interval Scores
// ============================================================================

/// A real-valued score was NaN, infinite, or outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{kind} must be a finite value in [0, 1], got {value}")]
pub struct RangeError {
    /// Which score type rejected the value.
    pub kind: &'static str,
    /// The rejected value.
    pub value: f64,
}

macro_rules! unit_interval {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(try_from = "f64", into = "f64")]
        pub struct $name(f64);

        impl $name {
            /// The lower bound, `0.0`.
            pub const ZERO: $name = $name(0.0);
            /// The upper bound, `1.0`.
            pub const ONE: $name = $name(1.0);

            /// Validates and wraps a raw value.
            ///
            /// # Errors
            ///
            /// Returns [`RangeError`] if `value` is NaN, infinite, or outside `[0, 1]`.
            pub fn new(value: f64) -> Result<Self, RangeError> {
                if value.is_finite() && (0.0..=1.0).contains(&value) {
                    Ok(Self(value))
                } else {
                    Err(RangeError { kind: $kind, value })
                }
            }

            /// Wraps a raw value, clamping it into `[0, 1]`.
            ///
            /// NaN maps to `0.0`.
            pub fn saturating(value: f64) -> Self {
                if value.is_nan() {
                    Self(0.0)
                } else {
                    Self(value.clamp(0.0, 1.0))
                }
            }

            /// Returns the raw value.
            pub fn get(self) -> f64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4}", self.0)
            }
        }

        impl TryFrom<f64> for $name {
            type Error = RangeError;

            fn try_from(value: f64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for f64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

unit_interval!(
    /// A subject's trust: the posterior probability that it is honest.
    Trust,
    "trust"
);

unit_interval!(
    /// Environmental risk supplied by the policy information point.
    Risk,
    "risk"
);

impl Risk {
    /// The calmest environment.
    pub const MIN: Risk = Risk::ZERO;
    /// The most hostile environment.
    pub const MAX: Risk = Risk::ONE;
}

unit_interval!(
    /// The static trust an object demands before risk is considered.
    BaseRequirement,
    "base requirement"
);
