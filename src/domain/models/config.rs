use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::phase::PhaseType;

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Main configuration structure for the phase engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Post-Mortem phases inserted after a contest produced nothing usable
    pub post_mortem: InsertedPhaseConfig,

    /// Approval phases inserted after an approved Final Review
    pub approval: InsertedPhaseConfig,

    /// Phase lengths, keyed by phase type name, used when splicing a type the
    /// project has never had
    pub fallback_durations_hours: BTreeMap<String, i64>,

    /// Timeline notification settings
    pub notifications: NotificationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let fallback_durations_hours = [
            (PhaseType::Aggregation, 24),
            (PhaseType::AggregationReview, 24),
            (PhaseType::FinalFix, 24),
            (PhaseType::FinalReview, 24),
            (PhaseType::Approval, 24),
            (PhaseType::PostMortem, 24),
            (PhaseType::SpecificationSubmission, 48),
            (PhaseType::SpecificationReview, 24),
        ]
        .into_iter()
        .map(|(phase_type, hours)| (phase_type.as_str().to_string(), hours))
        .collect();

        Self {
            post_mortem: InsertedPhaseConfig {
                duration_hours: 24,
                reviewer_number: 5,
                scorecard_id: "1".to_string(),
            },
            approval: InsertedPhaseConfig {
                duration_hours: 24,
                reviewer_number: 1,
                scorecard_id: "1".to_string(),
            },
            fallback_durations_hours,
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Fallback durations in milliseconds, as consumed by the phase graph mutator.
    ///
    /// Entries naming an unknown phase type are skipped; the config loader
    /// rejects them up front.
    pub fn fallback_durations_ms(&self) -> BTreeMap<PhaseType, i64> {
        self.fallback_durations_hours
            .iter()
            .filter_map(|(name, hours)| {
                PhaseType::from_str(name).map(|phase_type| (phase_type, hours.saturating_mul(MILLIS_PER_HOUR)))
            })
            .collect()
    }
}

/// Defaults for a phase the engine inserts on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InsertedPhaseConfig {
    pub duration_hours: i64,
    /// Written as the "Reviewer Number" attribute
    pub reviewer_number: i64,
    /// Written as the "Scorecard ID" attribute
    pub scorecard_id: String,
}

impl InsertedPhaseConfig {
    pub fn duration_ms(&self) -> i64 {
        self.duration_hours.saturating_mul(MILLIS_PER_HOUR)
    }
}

/// Timeline notification configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Base of the project details link; the project id is appended
    pub project_details_url: String,

    /// chrono format string for `PHASE_TIMESTAMP`
    pub timestamp_format: String,

    /// Email schemes mapping roles to start/end options
    pub schemes: Vec<EmailScheme>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            project_details_url: "https://software.example.com/review/actions/ViewProjectDetails?pid="
                .to_string(),
            timestamp_format: "%a, %b %d, %Y %I:%M %p".to_string(),
            schemes: Vec::new(),
        }
    }
}

/// Roles that share a pair of start/end email options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailScheme {
    pub name: String,

    /// Role names; `"*"` expands to every role the resource store knows
    pub roles: Vec<String>,

    #[serde(default)]
    pub start: Option<EmailOptions>,

    #[serde(default)]
    pub end: Option<EmailOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailOptions {
    pub template_name: String,

    #[serde(default = "default_template_source")]
    pub template_source: String,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub from: String,

    /// Accepts yes/true/no/false
    #[serde(default = "default_true", deserialize_with = "deserialize_send_flag")]
    pub send: bool,

    /// Higher priority wins when several schemes name the same role
    #[serde(default)]
    pub priority: i32,
}

fn default_template_source() -> String {
    "file".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Text(String),
}

fn deserialize_send_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match RawFlag::deserialize(deserializer)? {
        RawFlag::Bool(flag) => Ok(flag),
        RawFlag::Text(text) => parse_send_flag(&text).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid send flag '{text}', expected one of: yes, true, no, false"
            ))
        }),
    }
}

/// Parse the yes/true/no/false vocabulary of the send flag.
pub fn parse_send_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,

    /// Directory for rolling log files; console only when unset
    pub log_dir: Option<String>,

    /// Rotation (daily, hourly, never)
    pub rotation: String,

    /// Log retention in days
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            log_dir: None,
            rotation: "daily".to_string(),
            retention_days: 30,
        }
    }
}
