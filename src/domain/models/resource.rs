//! Resource domain model.
//!
//! A resource is one role assignment of a participant on a project,
//! optionally scoped to a single phase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Resource property keys.
pub mod properties {
    pub const EXTERNAL_REFERENCE_ID: &str = "External Reference ID";
    pub const HANDLE: &str = "Handle";
    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const EMAIL: &str = "Email";
    pub const PAYMENT: &str = "Payment";
    pub const PAYMENT_STATUS: &str = "Payment Status";
    pub const RATING: &str = "Rating";
    pub const RELIABILITY: &str = "Reliability";
    pub const REGISTRATION_DATE: &str = "Registration Date";
    pub const APPEALS_COMPLETED_EARLY: &str = "Appeals Completed Early";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceRole {
    Submitter,
    #[serde(rename = "Primary Screener")]
    PrimaryScreener,
    Screener,
    Reviewer,
    #[serde(rename = "Accuracy Reviewer")]
    AccuracyReviewer,
    #[serde(rename = "Failure Reviewer")]
    FailureReviewer,
    #[serde(rename = "Stress Reviewer")]
    StressReviewer,
    Aggregator,
    #[serde(rename = "Final Reviewer")]
    FinalReviewer,
    Approver,
    #[serde(rename = "Post-Mortem Reviewer")]
    PostMortemReviewer,
    #[serde(rename = "Specification Submitter")]
    SpecificationSubmitter,
    #[serde(rename = "Specification Reviewer")]
    SpecificationReviewer,
    Manager,
    Observer,
}

/// Roles whose scorecards make up the Review phase.
pub const REVIEWER_ROLES: [ResourceRole; 4] = [
    ResourceRole::Reviewer,
    ResourceRole::AccuracyReviewer,
    ResourceRole::FailureReviewer,
    ResourceRole::StressReviewer,
];

/// Reviewers that also have to upload a test case.
pub const TEST_CASE_REVIEWER_ROLES: [ResourceRole; 3] = [
    ResourceRole::AccuracyReviewer,
    ResourceRole::FailureReviewer,
    ResourceRole::StressReviewer,
];

/// Roles that screen submissions.
pub const SCREENER_ROLES: [ResourceRole; 2] = [ResourceRole::PrimaryScreener, ResourceRole::Screener];

impl ResourceRole {
    pub const ALL: [Self; 15] = [
        Self::Submitter,
        Self::PrimaryScreener,
        Self::Screener,
        Self::Reviewer,
        Self::AccuracyReviewer,
        Self::FailureReviewer,
        Self::StressReviewer,
        Self::Aggregator,
        Self::FinalReviewer,
        Self::Approver,
        Self::PostMortemReviewer,
        Self::SpecificationSubmitter,
        Self::SpecificationReviewer,
        Self::Manager,
        Self::Observer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitter => "Submitter",
            Self::PrimaryScreener => "Primary Screener",
            Self::Screener => "Screener",
            Self::Reviewer => "Reviewer",
            Self::AccuracyReviewer => "Accuracy Reviewer",
            Self::FailureReviewer => "Failure Reviewer",
            Self::StressReviewer => "Stress Reviewer",
            Self::Aggregator => "Aggregator",
            Self::FinalReviewer => "Final Reviewer",
            Self::Approver => "Approver",
            Self::PostMortemReviewer => "Post-Mortem Reviewer",
            Self::SpecificationSubmitter => "Specification Submitter",
            Self::SpecificationReviewer => "Specification Reviewer",
            Self::Manager => "Manager",
            Self::Observer => "Observer",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for ResourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(default)]
    pub phase_id: Option<Uuid>,
    pub role: ResourceRole,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Submissions owned by this resource.
    #[serde(default)]
    pub submissions: Vec<Uuid>,
}

impl Resource {
    pub fn new(project_id: Uuid, role: ResourceRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            phase_id: None,
            role,
            properties: BTreeMap::new(),
            submissions: Vec::new(),
        }
    }

    pub fn with_phase(mut self, phase_id: Uuid) -> Self {
        self.phase_id = Some(phase_id);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_submission(mut self, submission_id: Uuid) -> Self {
        self.submissions.push(submission_id);
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn external_id(&self) -> Option<&str> {
        self.property(properties::EXTERNAL_REFERENCE_ID)
    }

    pub fn handle(&self) -> Option<&str> {
        self.property(properties::HANDLE)
    }
}
