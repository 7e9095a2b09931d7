use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::models::LoggingConfig;

/// Logger settings resolved from the engine's [`LoggingConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Console output format
    pub format: LogFormat,

    /// Directory for rolling log files (console only when unset)
    pub log_dir: Option<PathBuf>,

    /// Mirror log events to stderr
    pub enable_console: bool,

    pub rotation: RotationPolicy,

    /// Rolled files kept on disk, one per rotation period
    pub retention_days: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => anyhow::bail!("Invalid log format: {s}"),
        }
    }
}

impl FromStr for RotationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            _ => anyhow::bail!("Invalid log rotation: {s}"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            log_dir: None,
            enable_console: true,
            rotation: RotationPolicy::default(),
            retention_days: 30,
        }
    }
}

impl TryFrom<&LoggingConfig> for LogConfig {
    type Error = anyhow::Error;

    fn try_from(config: &LoggingConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            level: config.level.clone(),
            format: config.format.parse()?,
            log_dir: config.log_dir.as_ref().map(PathBuf::from),
            enable_console: true,
            rotation: config.rotation.parse()?,
            retention_days: config.retention_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_engine_logging_config() {
        let engine = LoggingConfig {
            level: "debug".to_string(),
            format: "Pretty".to_string(),
            log_dir: Some("/var/log/review-phases".to_string()),
            rotation: "hourly".to_string(),
            retention_days: 7,
        };

        let config = LogConfig::try_from(&engine).unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.rotation, RotationPolicy::Hourly);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/review-phases")));
        assert_eq!(config.retention_days, 7);
    }

    #[test]
    fn test_rejects_unknown_format() {
        let engine = LoggingConfig {
            format: "xml".to_string(),
            ..LoggingConfig::default()
        };
        assert!(LogConfig::try_from(&engine).is_err());
    }
}
