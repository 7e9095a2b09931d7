//! Phase domain model.
//!
//! A project's workflow is an ordered sequence of phases. Each phase carries
//! dependency edges to other phases of the same project, anchored either on
//! the start or the finish of both ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::errors::{PhaseHandlingError, PhaseResult};

/// Phase attribute keys read as phase-level configuration.
pub mod attributes {
    pub const REVIEWER_NUMBER: &str = "Reviewer Number";
    pub const MANUAL_SCREENING: &str = "Manual Screening";
    pub const SUBMISSION_NUMBER: &str = "Submission Number";
    pub const SCORECARD_ID: &str = "Scorecard ID";
}

/// The closed set of phase types a contest workflow is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseType {
    Registration,
    Submission,
    Screening,
    Review,
    Appeals,
    #[serde(rename = "Appeals Response")]
    AppealsResponse,
    Aggregation,
    #[serde(rename = "Aggregation Review")]
    AggregationReview,
    #[serde(rename = "Final Fix")]
    FinalFix,
    #[serde(rename = "Final Review")]
    FinalReview,
    Approval,
    #[serde(rename = "Post-Mortem")]
    PostMortem,
    #[serde(rename = "Specification Submission")]
    SpecificationSubmission,
    #[serde(rename = "Specification Review")]
    SpecificationReview,
}

impl PhaseType {
    pub const ALL: [Self; 14] = [
        Self::Registration,
        Self::Submission,
        Self::Screening,
        Self::Review,
        Self::Appeals,
        Self::AppealsResponse,
        Self::Aggregation,
        Self::AggregationReview,
        Self::FinalFix,
        Self::FinalReview,
        Self::Approval,
        Self::PostMortem,
        Self::SpecificationSubmission,
        Self::SpecificationReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "Registration",
            Self::Submission => "Submission",
            Self::Screening => "Screening",
            Self::Review => "Review",
            Self::Appeals => "Appeals",
            Self::AppealsResponse => "Appeals Response",
            Self::Aggregation => "Aggregation",
            Self::AggregationReview => "Aggregation Review",
            Self::FinalFix => "Final Fix",
            Self::FinalReview => "Final Review",
            Self::Approval => "Approval",
            Self::PostMortem => "Post-Mortem",
            Self::SpecificationSubmission => "Specification Submission",
            Self::SpecificationReview => "Specification Review",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a phase: `Scheduled` → `Open` → `Closed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Scheduled,
    Open,
    Closed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Open => "Open",
            Self::Closed => "Closed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// True once the phase has opened, whether or not it has closed since.
    pub fn has_started(&self) -> bool {
        matches!(self, Self::Open | Self::Closed)
    }

    /// Valid transitions from this status. No skipping.
    pub fn valid_transitions(&self) -> Vec<PhaseStatus> {
        match self {
            Self::Scheduled => vec![Self::Open],
            Self::Open => vec![Self::Closed],
            Self::Closed => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four anchor combinations of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    StartToStart,
    StartToFinish,
    FinishToStart,
    FinishToFinish,
}

/// A directed edge from the owning (dependent) phase to the phase it waits on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Id of the phase this edge waits on.
    pub dependency: Uuid,
    /// The edge watches the dependency's start instead of its finish.
    #[serde(default)]
    pub anchors_on_dependency_start: bool,
    /// The edge gates the dependent's start instead of its finish.
    #[serde(default = "default_true")]
    pub anchors_on_dependent_start: bool,
    #[serde(default)]
    pub lag_ms: i64,
}

fn default_true() -> bool {
    true
}

impl Dependency {
    /// The dependent starts once the dependency has finished, with no lag.
    pub fn finish_to_start(dependency: Uuid) -> Self {
        Self {
            dependency,
            anchors_on_dependency_start: false,
            anchors_on_dependent_start: true,
            lag_ms: 0,
        }
    }

    pub fn new(
        dependency: Uuid,
        anchors_on_dependency_start: bool,
        anchors_on_dependent_start: bool,
        lag_ms: i64,
    ) -> Self {
        Self {
            dependency,
            anchors_on_dependency_start,
            anchors_on_dependent_start,
            lag_ms,
        }
    }

    pub fn kind(&self) -> DependencyKind {
        match (self.anchors_on_dependency_start, self.anchors_on_dependent_start) {
            (true, true) => DependencyKind::StartToStart,
            (true, false) => DependencyKind::StartToFinish,
            (false, true) => DependencyKind::FinishToStart,
            (false, false) => DependencyKind::FinishToFinish,
        }
    }
}

/// A node in a project's workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: Uuid,
    pub phase_type: PhaseType,
    #[serde(default)]
    pub status: PhaseStatus,
    /// Nominal duration in milliseconds.
    #[serde(default)]
    pub length_ms: i64,
    /// Computed by the phase calendar; not authoritative.
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Phase {
    pub fn new(phase_type: PhaseType, length_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase_type,
            status: PhaseStatus::Scheduled,
            length_ms,
            scheduled_start: None,
            scheduled_end: None,
            attributes: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: PhaseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_schedule(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.scheduled_start = Some(start);
        self.scheduled_end = Some(end);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Read a numeric attribute. Absence is `None`; a non-numeric value is an error.
    pub fn int_attribute(&self, key: &str) -> PhaseResult<Option<i64>> {
        match self.attribute(key).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| PhaseHandlingError::InvalidAttribute {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    pub fn depends_on(&self, phase_id: Uuid) -> bool {
        self.dependencies.iter().any(|d| d.dependency == phase_id)
    }
}
