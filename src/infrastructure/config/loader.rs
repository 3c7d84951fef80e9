//! Layered configuration loading and validation.

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::PhaseKind;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".driftwatch";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "DRIFTWATCH_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `default_group_name` is blank.
    #[error("default_group_name cannot be empty")]
    EmptyDefaultGroup,

    /// A model name with no configuration.
    #[error("Unknown model '{model}' referenced by {referenced_by}")]
    UnknownModel {
        /// Missing model name.
        model: String,
        /// Setting or rule phase naming it.
        referenced_by: String,
    },

    /// A rule defines no phases.
    #[error("Rule '{0}' has no phases")]
    NoPhases(String),

    /// A programmatic phase names an unregistered validator.
    #[error("Rule '{rule}' phase '{phase}' uses unknown validator type '{validator_type}'")]
    UnknownValidator {
        /// Rule name.
        rule: String,
        /// Phase name.
        phase: String,
        /// Unregistered validator type.
        validator_type: String,
    },

    /// Unknown log level.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown log format.
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown rotation policy.
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    /// Any other invalid setting.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the project in the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .driftwatch/config.yaml (project config)
    /// 3. .driftwatch/local.yaml (local overrides, optional)
    /// 4. Environment variables (DRIFTWATCH_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Load configuration rooted at `project_dir`.
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Config> {
        let config_dir = project_dir.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_dir.join("config.yaml")))
            .merge(Yaml::file(config_dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        let config = Self::finalize(config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        let config = Self::finalize(config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Fill rule names from their map keys.
    fn finalize(mut config: Config) -> Config {
        config.rule_definitions = config.named_rules();
        config
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.default_group_name.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultGroup);
        }

        if !config.models.contains_key(&config.default_model) {
            return Err(ConfigError::UnknownModel {
                model: config.default_model.clone(),
                referenced_by: "default_model".to_string(),
            });
        }

        for (name, rule) in &config.rule_definitions {
            if rule.phases.is_empty() {
                return Err(ConfigError::NoPhases(name.clone()));
            }
            for phase in &rule.phases {
                if let PhaseKind::Prompt {
                    model: Some(model), ..
                } = &phase.kind
                {
                    if !config.models.contains_key(model) {
                        return Err(ConfigError::UnknownModel {
                            model: model.clone(),
                            referenced_by: format!("rule '{name}' phase '{}'", phase.name),
                        });
                    }
                }
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.anthropic.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "anthropic.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that every programmatic phase names a registered validator.
    pub fn validate_validator_types(config: &Config, known: &[&str]) -> Result<(), ConfigError> {
        for (name, rule) in &config.rule_definitions {
            for phase in &rule.phases {
                if let PhaseKind::Programmatic { validator_type, .. } = &phase.kind {
                    if !known.contains(&validator_type.as_str()) {
                        return Err(ConfigError::UnknownValidator {
                            rule: name.clone(),
                            phase: phase.name.clone(),
                            validator_type: validator_type.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
