//! Submission and upload domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    Active,
    #[serde(rename = "Failed Screening")]
    FailedScreening,
    #[serde(rename = "Failed Review")]
    FailedReview,
    #[serde(rename = "Completed Without Win")]
    CompletedWithoutWin,
    Deleted,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::FailedScreening => "Failed Screening",
            Self::FailedReview => "Failed Review",
            Self::CompletedWithoutWin => "Completed Without Win",
            Self::Deleted => "Deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionType {
    #[default]
    #[serde(rename = "Contest Submission")]
    Contest,
    #[serde(rename = "Specification Submission")]
    Specification,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadStatus {
    #[default]
    Active,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadType {
    Submission,
    #[serde(rename = "Test Case")]
    TestCase,
    #[serde(rename = "Final Fix")]
    FinalFix,
    #[serde(rename = "Review Document")]
    ReviewDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Resource id of the uploader.
    pub owner: Uuid,
    pub upload_type: UploadType,
    #[serde(default)]
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
}

impl Upload {
    pub fn new(project_id: Uuid, owner: Uuid, upload_type: UploadType) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            owner,
            upload_type,
            status: UploadStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub upload: Upload,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub submission_type: SubmissionType,
    #[serde(default)]
    pub screening_score: Option<f64>,
    #[serde(default)]
    pub initial_score: Option<f64>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub placement: Option<u32>,
}

impl Submission {
    pub fn new(upload: Upload, submission_type: SubmissionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            upload,
            status: SubmissionStatus::Active,
            submission_type,
            screening_score: None,
            initial_score: None,
            final_score: None,
            placement: None,
        }
    }

    /// Resource id of the submitter.
    pub fn owner(&self) -> Uuid {
        self.upload.owner
    }

    pub fn is_active(&self) -> bool {
        self.status == SubmissionStatus::Active && self.upload.status == UploadStatus::Active
    }
}

/// Outcome of automated screening for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreeningStatus {
    Pending,
    Screening,
    Failed,
    Passed,
    #[serde(rename = "Passed with Warning")]
    PassedWithWarning,
}

impl ScreeningStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Passed | Self::PassedWithWarning)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub upload_id: Uuid,
    pub status: ScreeningStatus,
}
