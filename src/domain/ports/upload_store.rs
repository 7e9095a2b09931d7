use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::{
    ScreeningResult, Submission, SubmissionStatus, SubmissionType, Upload, UploadStatus, UploadType,
};
use crate::domain::ports::errors::StoreError;

/// Filters for querying submissions
#[derive(Default, Debug, Clone)]
pub struct SubmissionFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    pub submission_type: Option<SubmissionType>,
    pub owner: Option<Uuid>,
}

impl SubmissionFilter {
    /// Active submissions of one type on a project
    pub fn active(project_id: Uuid, submission_type: SubmissionType) -> Self {
        Self {
            project_id: Some(project_id),
            status: Some(SubmissionStatus::Active),
            submission_type: Some(submission_type),
            owner: None,
        }
    }
}

/// Filters for querying uploads
#[derive(Default, Debug, Clone)]
pub struct UploadFilter {
    pub project_id: Option<Uuid>,
    pub owner: Option<Uuid>,
    pub upload_type: Option<UploadType>,
    pub status: Option<UploadStatus>,
}

/// Persistence port for submissions, uploads and screening results
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn search_submissions(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>, StoreError>;

    async fn update_submission(&self, submission: &Submission, operator: &str) -> Result<(), StoreError>;

    async fn search_uploads(&self, filter: &UploadFilter) -> Result<Vec<Upload>, StoreError>;

    async fn update_upload(&self, upload: &Upload, operator: &str) -> Result<(), StoreError>;

    /// Automated screening outcome for each of the given uploads
    async fn screening_results(&self, upload_ids: &[Uuid]) -> Result<Vec<ScreeningResult>, StoreError>;
}
