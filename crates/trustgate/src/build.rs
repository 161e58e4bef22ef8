//! Turns a validated [`TrustgateConfig`] into kernel components.

use trustgate_config::{DecayConfig, FallbackMode, RiskConfig, TrustgateConfig};
use trustgate_kernel::{
    ContextRiskTable, DecayDomain, DecayMode, DecaySettings, DomainFallback, PolicySnapshot,
    Result, TrustError,
};
use trustgate_types::Risk;

/// Validates the whole configuration, reporting failures as kernel errors.
pub(crate) fn validate(config: &TrustgateConfig) -> Result<()> {
    config
        .validate()
        .map_err(|err| TrustError::ConfigurationInvalid(err.to_string()))
}

pub(crate) fn decay_settings(decay: &DecayConfig) -> Result<DecaySettings> {
    let domain = match decay.max_exponent {
        Some(max_exponent) => DecayDomain::with_max_exponent(decay.tolerance, max_exponent)?,
        None => DecayDomain::from_tolerance(decay.tolerance)?,
    };
    let mode = match decay.mode {
        trustgate_config::DecayMode::Exact => DecayMode::Exact,
        trustgate_config::DecayMode::Approximate => DecayMode::Approximate,
    };
    let fallback = match decay.fallback {
        FallbackMode::Exact => DomainFallback::Exact,
        FallbackMode::Zero => DomainFallback::Zero,
    };
    DecaySettings::new(decay.rate, mode, domain, fallback)
}

/// Builds the snapshot the decision point swaps in whole: policy, decay
/// settings and risk table together.
pub(crate) fn policy_snapshot(config: &TrustgateConfig) -> Result<PolicySnapshot> {
    let mut builder = PolicySnapshot::builder()
        .alpha(config.policy.alpha)
        .scale(config.policy.scale)
        .decay(decay_settings(&config.decay)?)
        .risk_table(risk_table(&config.risk)?);
    for object in &config.objects {
        builder = builder.object(object.id.as_str(), object.base_requirement);
    }
    for grant in &config.grants {
        builder = builder.grant(grant.subject.as_str(), grant.object.as_str());
    }
    builder.build()
}

pub(crate) fn risk_table(risk: &RiskConfig) -> Result<ContextRiskTable> {
    let mut table = ContextRiskTable::new(Risk::new(risk.default)?);
    for context in &risk.contexts {
        table = table.try_with_context(context.name.as_str(), context.risk)?;
    }
    Ok(match &risk.active_context {
        Some(active) => table.with_active(active.as_str()),
        None => table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustgate_kernel::RiskSource;

    #[test]
    fn test_decay_settings_mapping() {
        let config = DecayConfig {
            rate: 0.2,
            mode: trustgate_config::DecayMode::Approximate,
            tolerance: 0.02,
            max_exponent: Some(0.1),
            fallback: FallbackMode::Zero,
        };
        let settings = decay_settings(&config).unwrap();
        assert_eq!(settings.default_rate(), 0.2);
        assert_eq!(settings.mode(), DecayMode::Approximate);
        assert_eq!(settings.fallback(), DomainFallback::Zero);
        assert_eq!(settings.domain().max_exponent(), 0.1);
    }

    #[test]
    fn test_derived_domain() {
        let settings = decay_settings(&DecayConfig::default()).unwrap();
        assert!((settings.domain().max_exponent() - 0.02_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_risk_table_mapping() {
        let config = RiskConfig {
            default: 0.4,
            active_context: Some("lab".into()),
            contexts: vec![trustgate_config::RiskContextConfig {
                name: "lab".into(),
                risk: 0.2,
            }],
        };
        let table = risk_table(&config).unwrap();
        assert_eq!(table.current_risk().unwrap().get(), 0.2);
        assert_eq!(table.risk_for("elsewhere").get(), 0.4);
    }

    #[test]
    fn test_snapshot_carries_decay_and_risk() {
        let mut config = TrustgateConfig::default();
        config.decay.rate = 0.3;
        config.risk.active_context = Some("office".into());
        config.risk.contexts.push(trustgate_config::RiskContextConfig {
            name: "office".into(),
            risk: 0.25,
        });

        let snapshot = policy_snapshot(&config).unwrap();
        assert_eq!(snapshot.decay().map(DecaySettings::default_rate), Some(0.3));
        let table = snapshot.risk_table().unwrap();
        assert_eq!(table.active(), Some("office"));
        assert_eq!(table.current_risk().unwrap().get(), 0.25);
    }

    #[test]
    fn test_invalid_config_maps_to_configuration_invalid() {
        let mut config = TrustgateConfig::default();
        config.policy.alpha = -1.0;
        assert!(matches!(
            validate(&config),
            Err(TrustError::ConfigurationInvalid(_))
        ));
    }
}
