//! Configuration loader with multi-source merging

use crate::TrustgateConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

/// Git-tracked project config file name
const PROJECT_CONFIG_FILE: &str = "trustgate.toml";

/// Gitignored local override file name
const LOCAL_CONFIG_FILE: &str = "trustgate.local.toml";

/// User config file (~/.config/trustgate/config.toml), if the platform has one
fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("dev", "trustgate", "trustgate")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "TRUSTGATE".to_string(),
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "TRUSTGATE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/trustgate/config.toml (hermetic loads, tests)
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence, then validate it
    pub fn load(self) -> Result<TrustgateConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = TrustgateConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/trustgate/config.toml)
        if self.include_user_config {
            if let Some(user_config_file) = user_config_file() {
                if user_config_file.exists() {
                    builder = builder.add_source(
                        config::File::from(user_config_file)
                            .required(false)
                            .format(config::FileFormat::Toml),
                    );
                }
            }
        }

        // 3. Project config (trustgate.toml)
        let project_config_file = self.project_dir.join(PROJECT_CONFIG_FILE);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (trustgate.local.toml, gitignored)
        let local_config_file = self.project_dir.join(LOCAL_CONFIG_FILE);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (TRUSTGATE_POLICY__ALPHA=0.7)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let trustgate_config: TrustgateConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        trustgate_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(trustgate_config)
    }

    /// Load configuration or return defaults if not found or invalid
    pub fn load_or_default(self) -> TrustgateConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecayMode, FallbackMode};
    use std::fs;
    use tempfile::tempdir;

    fn loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(dir)
            .with_env_prefix("TRUSTGATE_LOADER_TEST")
            .without_user_config()
    }

    #[test]
    fn test_user_config_location() {
        // May be unavailable on some platforms, but must not panic
        if let Some(config_file) = user_config_file() {
            assert!(config_file.to_string_lossy().contains("trustgate"));
            assert!(config_file.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(config.policy.alpha, 0.5);
        assert_eq!(config.policy.scale, 10_000);
        assert_eq!(config.decay.mode, DecayMode::Exact);
        assert!(config.objects.is_empty());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[policy]
alpha = 0.5
scale = 10

[decay]
rate = 0.1
mode = "approximate"
tolerance = 0.02
fallback = "zero"

[[objects]]
id = "record_8842"
base_requirement = 0.6

[[grants]]
subject = "alice"
object = "record_8842"

[[subjects]]
id = "alice"
initial_trust = 0.75
"#;
        fs::write(project_dir.join("trustgate.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.policy.scale, 10);
        assert_eq!(config.decay.rate, 0.1);
        assert_eq!(config.decay.mode, DecayMode::Approximate);
        assert_eq!(config.decay.fallback, FallbackMode::Zero);
        assert_eq!(config.objects.len(), 1);
        assert_eq!(config.objects[0].base_requirement, 0.6);
        assert_eq!(config.grants[0].subject, "alice");
        assert_eq!(config.subjects[0].initial_trust, 0.75);
        assert_eq!(config.subjects[0].decay_rate, None);
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("trustgate.toml"),
            r#"
[policy]
alpha = 0.5

[decay]
rate = 0.05
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("trustgate.local.toml"),
            r#"
[policy]
alpha = 0.9
"#,
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config overrides project config; untouched keys survive
        assert_eq!(config.policy.alpha, 0.9);
        assert_eq!(config.decay.rate, 0.05);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("trustgate.toml"),
            r#"
[[grants]]
subject = "alice"
object = "undeclared"
"#,
        )
        .expect("Failed to write config");

        let err = loader(project_dir).load().unwrap_err();
        assert!(format!("{err:#}").contains("undeclared"));
    }

    // Environment overrides use a double underscore between section and key:
    //
    // TRUSTGATE_POLICY__ALPHA=0.7
    // TRUSTGATE_DECAY__MODE=approximate
    //
    // Tests avoid mutating the process environment.

    #[test]
    fn test_load_or_default_on_invalid() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(project_dir.join("trustgate.toml"), "[policy]\nalpha = -3.0\n")
            .expect("Failed to write config");

        let config = loader(project_dir).load_or_default();
        assert_eq!(config.policy.alpha, 0.5);
    }
}
