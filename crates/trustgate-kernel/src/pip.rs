//! Policy information points: where the decision point gets risk.
//!
//! A request may carry its own risk score. When it does not, the decision
//! point asks its configured [`RiskSource`]. Sources report errors rather
//! than guessing; the decision point fails closed on any of them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use trustgate_types::Risk;

use crate::error::{Result, TrustError};

/// Produces the current environmental risk for a decision.
pub trait RiskSource: Send + Sync {
    /// Returns the risk to apply right now.
    ///
    /// # Errors
    ///
    /// Returns an error if no trustworthy risk value is available.
    fn current_risk(&self) -> Result<Risk>;
}

impl<F> RiskSource for F
where
    F: Fn() -> Result<Risk> + Send + Sync,
{
    fn current_risk(&self) -> Result<Risk> {
        self()
    }
}

// ============================================================================
// Fixed Risk
// ============================================================================

/// A single risk value that can be replaced at runtime.
///
/// Stored as the bit pattern of an `f64`, so reads never block.
#[derive(Debug)]
pub struct FixedRisk {
    bits: AtomicU64,
}

impl FixedRisk {
    pub fn new(risk: Risk) -> Self {
        Self {
            bits: AtomicU64::new(risk.get().to_bits()),
        }
    }

    /// Replaces the reported risk.
    pub fn set(&self, risk: Risk) {
        self.bits.store(risk.get().to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> Risk {
        Risk::saturating(f64::from_bits(self.bits.load(Ordering::Acquire)))
    }
}

impl RiskSource for FixedRisk {
    fn current_risk(&self) -> Result<Risk> {
        Ok(self.get())
    }
}

// ============================================================================
// Context Risk Table
// ============================================================================

/// Risk for a trusted network context.
pub const HOSPITAL_RISK: f64 = 0.1;
/// Risk for an untrusted public network.
pub const PUBLIC_NETWORK_RISK: f64 = 0.9;
/// Risk for a context nobody has classified.
pub const UNCLASSIFIED_RISK: f64 = 0.5;

/// Maps named contexts (networks, locations) to risk, with a fallback.
///
/// The table is immutable. Switching the active context builds a new table
/// with [`ContextRiskTable::with_active`]; the decision point keeps it
/// inside its policy snapshot, so a context switch and a reload never
/// interleave. Lookups of a context missing from the table use the default
/// risk.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRiskTable {
    contexts: Arc<HashMap<String, Risk>>,
    default_risk: Risk,
    active: Option<String>,
}

impl ContextRiskTable {
    /// Creates an empty table. The active context starts unset.
    pub fn new(default_risk: Risk) -> Self {
        Self {
            contexts: Arc::new(HashMap::new()),
            default_risk,
            active: None,
        }
    }

    /// Table with the stock network contexts.
    pub fn with_defaults() -> Self {
        Self::new(Risk::saturating(UNCLASSIFIED_RISK))
            .with_context("hospital_wifi", Risk::saturating(HOSPITAL_RISK))
            .with_context("public_cafe", Risk::saturating(PUBLIC_NETWORK_RISK))
    }

    /// Adds or replaces a context.
    pub fn with_context(mut self, context: impl Into<String>, risk: Risk) -> Self {
        Arc::make_mut(&mut self.contexts).insert(context.into(), risk);
        self
    }

    /// Adds a context from a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InputOutOfRange`] if `risk` is outside `[0, 1]`.
    pub fn try_with_context(self, context: impl Into<String>, risk: f64) -> Result<Self> {
        Ok(self.with_context(context, Risk::new(risk)?))
    }

    /// Returns a copy whose [`RiskSource::current_risk`] reports `context`.
    ///
    /// The context list is shared, not copied.
    pub fn with_active(&self, context: impl Into<String>) -> Self {
        Self {
            contexts: Arc::clone(&self.contexts),
            default_risk: self.default_risk,
            active: Some(context.into()),
        }
    }

    /// Looks up a context, falling back to the default risk.
    pub fn risk_for(&self, context: &str) -> Risk {
        self.contexts.get(context).copied().unwrap_or(self.default_risk)
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn default_risk(&self) -> Risk {
        self.default_risk
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }
}

impl RiskSource for ContextRiskTable {
    fn current_risk(&self) -> Result<Risk> {
        self.active
            .as_deref()
            .map(|context| self.risk_for(context))
            .ok_or_else(|| TrustError::config("no active risk context"))
    }
}
