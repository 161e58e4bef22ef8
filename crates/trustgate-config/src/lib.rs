//! Configuration management for trustgate
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (TRUSTGATE_* prefix, highest precedence)
//! 2. trustgate.local.toml (gitignored, local overrides)
//! 3. trustgate.toml (git-tracked, project config)
//! 4. ~/.config/trustgate/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! A loaded configuration is always validated. It is turned into an
//! immutable policy snapshot by the `trustgate` crate; reloading means
//! loading a fresh configuration and swapping the whole snapshot.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Largest accepted risk sensitivity α.
pub const MAX_ALPHA: f64 = 10.0;
/// Largest accepted fixed-point scale K.
pub const MAX_SCALE: u64 = 1_000_000;
/// Largest accepted decay rate λ, per second.
pub const MAX_DECAY_RATE: f64 = 1_000.0;
/// Exclusive upper bound on the approximation tolerance.
pub const MAX_TOLERANCE: f64 = 0.5;

/// Main trustgate configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustgateConfig {
    pub policy: PolicyConfig,
    pub decay: DecayConfig,
    pub risk: RiskConfig,
    pub objects: Vec<ObjectConfig>,
    pub grants: Vec<GrantConfig>,
    pub subjects: Vec<SubjectConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Risk sensitivity: how much maximum risk raises the base requirement.
    pub alpha: f64,
    /// Fixed-point resolution K.
    pub scale: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            scale: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Default λ, per second.
    pub rate: f64,
    pub mode: DecayMode,
    /// Absolute error tolerated from the approximation.
    pub tolerance: f64,
    /// Narrower approximation domain; derived from `tolerance` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_exponent: Option<f64>,
    pub fallback: FallbackMode,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            rate: 0.05,
            mode: DecayMode::Exact,
            tolerance: 0.01,
            max_exponent: None,
            fallback: FallbackMode::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DecayMode {
    Exact,
    Approximate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackMode {
    Exact,
    Zero,
}

/// Context-to-risk table used when a request carries no risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Risk for contexts missing from the table.
    pub default: f64,
    /// Context reported until the gateway switches it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_context: Option<String>,
    pub contexts: Vec<RiskContextConfig>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            default: 0.5,
            active_context: None,
            contexts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContextConfig {
    pub name: String,
    pub risk: f64,
}

/// A protected object and its base trust requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub id: String,
    pub base_requirement: f64,
}

/// One pair of the static attribute relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantConfig {
    pub subject: String,
    pub object: String,
}

/// A subject enrolled at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub id: String,
    pub initial_trust: f64,
    /// Overrides `decay.rate` for this subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_rate: Option<f64>,
}

impl TrustgateConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, with no layering
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value against its documented bounds
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let policy = &self.policy;
        check(
            policy.alpha.is_finite() && (0.0..=MAX_ALPHA).contains(&policy.alpha),
            || format!("policy.alpha must be in [0, {MAX_ALPHA}], got {}", policy.alpha),
        )?;
        check((1..=MAX_SCALE).contains(&policy.scale), || {
            format!("policy.scale must be in 1..={MAX_SCALE}, got {}", policy.scale)
        })?;

        let decay = &self.decay;
        check_rate("decay.rate", decay.rate)?;
        check(
            decay.tolerance.is_finite() && decay.tolerance > 0.0 && decay.tolerance < MAX_TOLERANCE,
            || format!("decay.tolerance must be in (0, {MAX_TOLERANCE}), got {}", decay.tolerance),
        )?;
        if let Some(max_exponent) = decay.max_exponent {
            check(
                max_exponent.is_finite()
                    && max_exponent > 0.0
                    && max_exponent * max_exponent / 2.0 <= decay.tolerance,
                || {
                    format!(
                        "decay.max_exponent {max_exponent} must be positive with max_exponent²/2 <= tolerance"
                    )
                },
            )?;
        }

        check_unit("risk.default", self.risk.default)?;
        let mut contexts = HashSet::new();
        for context in &self.risk.contexts {
            check_unit("risk.contexts.risk", context.risk)?;
            check(contexts.insert(context.name.as_str()), || {
                format!("risk context '{}' declared more than once", context.name)
            })?;
        }

        let mut objects = HashSet::new();
        for object in &self.objects {
            check_unit("objects.base_requirement", object.base_requirement)?;
            check(objects.insert(object.id.as_str()), || {
                format!("object '{}' declared more than once", object.id)
            })?;
        }

        for grant in &self.grants {
            check(objects.contains(grant.object.as_str()), || {
                format!(
                    "grant for subject '{}' names undeclared object '{}'",
                    grant.subject, grant.object
                )
            })?;
        }

        let mut subjects = HashSet::new();
        for subject in &self.subjects {
            check_unit("subjects.initial_trust", subject.initial_trust)?;
            if let Some(rate) = subject.decay_rate {
                check_rate("subjects.decay_rate", rate)?;
            }
            check(subjects.insert(subject.id.as_str()), || {
                format!("subject '{}' declared more than once", subject.id)
            })?;
        }

        Ok(())
    }
}

fn check(
    condition: bool,
    message: impl FnOnce() -> String,
) -> std::result::Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(message()))
    }
}

fn check_unit(field: &str, value: f64) -> std::result::Result<(), ConfigError> {
    check(value.is_finite() && (0.0..=1.0).contains(&value), || {
        format!("{field} must be in [0, 1], got {value}")
    })
}

fn check_rate(field: &str, rate: f64) -> std::result::Result<(), ConfigError> {
    check(
        rate.is_finite() && (0.0..=MAX_DECAY_RATE).contains(&rate),
        || format!("{field} must be in [0, {MAX_DECAY_RATE}], got {rate}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use test_case::test_case;

    fn sample() -> TrustgateConfig {
        toml::from_str(
            r#"
[policy]
alpha = 0.5
scale = 10000

[risk]
default = 0.5
active_context = "hospital_wifi"

[[risk.contexts]]
name = "hospital_wifi"
risk = 0.1

[[risk.contexts]]
name = "public_cafe"
risk = 0.9

[[objects]]
id = "record_8842"
base_requirement = 0.6

[[grants]]
subject = "alice"
object = "record_8842"

[[subjects]]
id = "alice"
initial_trust = 0.75
decay_rate = 0.01
"#,
        )
        .expect("valid toml")
    }

    #[test]
    fn test_default_config() {
        let config = TrustgateConfig::default();
        assert_eq!(config.policy.alpha, 0.5);
        assert_eq!(config.policy.scale, 10_000);
        assert_eq!(config.decay.rate, 0.05);
        assert_eq!(config.decay.fallback, FallbackMode::Exact);
        assert_eq!(config.risk.default, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_is_valid() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert_eq!(config.risk.contexts.len(), 2);
        assert_eq!(config.risk.active_context.as_deref(), Some("hospital_wifi"));
        assert_eq!(config.subjects[0].decay_rate, Some(0.01));
    }

    #[test_case(|c: &mut TrustgateConfig| c.policy.alpha = 11.0 ; "alpha too large")]
    #[test_case(|c: &mut TrustgateConfig| c.policy.scale = 0 ; "zero scale")]
    #[test_case(|c: &mut TrustgateConfig| c.decay.rate = f64::NAN ; "nan rate")]
    #[test_case(|c: &mut TrustgateConfig| c.decay.tolerance = 0.0 ; "zero tolerance")]
    #[test_case(|c: &mut TrustgateConfig| c.decay.max_exponent = Some(0.5) ; "loose domain")]
    #[test_case(|c: &mut TrustgateConfig| c.risk.default = 1.5 ; "default risk")]
    #[test_case(|c: &mut TrustgateConfig| c.objects[0].base_requirement = -0.1 ; "negative requirement")]
    #[test_case(|c: &mut TrustgateConfig| c.subjects[0].initial_trust = 2.0 ; "trust above one")]
    #[test_case(|c: &mut TrustgateConfig| c.subjects[0].decay_rate = Some(-1.0) ; "negative subject rate")]
    #[test_case(|c: &mut TrustgateConfig| c.grants[0].object = "ghost".into() ; "dangling grant")]
    #[test_case(|c: &mut TrustgateConfig| { let dup = c.objects[0].clone(); c.objects.push(dup); } ; "duplicate object")]
    #[test_case(|c: &mut TrustgateConfig| { let dup = c.subjects[0].clone(); c.subjects.push(dup); } ; "duplicate subject")]
    fn test_validation_rejects(mutate: fn(&mut TrustgateConfig)) {
        let mut config = sample();
        mutate(&mut config);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let missing = TrustgateConfig::from_file(temp_dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError { .. })));

        let broken = temp_dir.path().join("broken.toml");
        std::fs::write(&broken, "[policy\nalpha = ").unwrap();
        assert!(matches!(
            TrustgateConfig::from_file(&broken),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_from_file_round_trip() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("trustgate.toml");
        let config = sample();
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        assert_eq!(TrustgateConfig::from_file(&path).unwrap(), config);
    }
}
