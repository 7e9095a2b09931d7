use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{EngineConfig, InsertedPhaseConfig};
use crate::domain::models::PhaseType;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".review-phases";

/// Prefix of environment variable overrides, e.g. `REVIEW_PHASES_LOGGING__LEVEL`.
pub const ENV_PREFIX: &str = "REVIEW_PHASES_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Unknown phase type in fallback durations: {0}")]
    UnknownPhaseType(String),

    #[error("Invalid duration for {name}: {hours} hours. Must be positive")]
    InvalidDuration { name: String, hours: i64 },

    #[error("Invalid reviewer number for inserted {0} phases: {1}. Must be at least 1")]
    InvalidReviewerNumber(&'static str, i64),

    #[error("Scorecard id for inserted {0} phases cannot be empty")]
    EmptyScorecardId(&'static str),

    #[error("Invalid timestamp format: {0}")]
    InvalidTimestampFormat(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .review-phases/config.yaml
    /// 3. .review-phases/local.yaml (optional local overrides)
    /// 4. Environment variables (REVIEW_PHASES_* prefix, `__` separates nested keys)
    pub fn load() -> Result<EngineConfig> {
        let config: EngineConfig = Self::figment(None)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<EngineConfig> {
        let config: EngineConfig = Self::figment(Some(path.as_ref()))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(EngineConfig::default()));
        let figment = match file {
            Some(path) => figment.merge(Yaml::file(path)),
            None => figment
                .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
                .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml"))),
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
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

        for (name, hours) in &config.fallback_durations_hours {
            if PhaseType::from_str(name).is_none() {
                return Err(ConfigError::UnknownPhaseType(name.clone()));
            }
            if *hours <= 0 {
                return Err(ConfigError::InvalidDuration {
                    name: name.clone(),
                    hours: *hours,
                });
            }
        }

        Self::validate_inserted("Post-Mortem", &config.post_mortem)?;
        Self::validate_inserted("Approval", &config.approval)?;

        let format = &config.notifications.timestamp_format;
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidTimestampFormat(format.clone()));
        }

        for scheme in &config.notifications.schemes {
            if scheme.roles.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "email scheme '{}' must name at least one role",
                    scheme.name
                )));
            }
            let options = scheme.start.iter().chain(scheme.end.iter());
            if options.into_iter().any(|o| o.template_name.trim().is_empty()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "email scheme '{}' has an empty template name",
                    scheme.name
                )));
            }
        }

        Ok(())
    }

    fn validate_inserted(name: &'static str, inserted: &InsertedPhaseConfig) -> Result<(), ConfigError> {
        if inserted.duration_hours <= 0 {
            return Err(ConfigError::InvalidDuration {
                name: name.to_string(),
                hours: inserted.duration_hours,
            });
        }
        if inserted.reviewer_number < 1 {
            return Err(ConfigError::InvalidReviewerNumber(name, inserted.reviewer_number));
        }
        if inserted.scorecard_id.trim().is_empty() {
            return Err(ConfigError::EmptyScorecardId(name));
        }
        Ok(())
    }
}
