//! In-memory implementation of every persistence port.
//!
//! Backs the command-line tool and the test suites. One lock guards the whole
//! workflow state, so each port call sees a consistent picture.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::snapshot::{LinkedProject, PendingTerms, WorkflowSnapshot};
use crate::domain::models::{
    PhaseStatus, PhaseType, Project, ProjectLink, Resource, ResourceRole, Review, ScreeningResult,
    Submission, Upload,
};
use crate::domain::ports::{
    PhaseStore, ProjectStore, ResourceFilter, ResourceStore, ReviewFilter, ReviewStore, ScorecardStore,
    StoreError, SubmissionFilter, TermsOfUseChecker, UploadFilter, UploadStore,
};

/// Shared in-memory workflow store.
pub struct InMemoryWorkflowStore {
    state: RwLock<WorkflowSnapshot>,
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new(WorkflowSnapshot::default())
    }
}

impl InMemoryWorkflowStore {
    pub fn new(snapshot: WorkflowSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.state.read().await.clone()
    }

    /// The stored project as last persisted through the phase or project store.
    pub async fn project(&self) -> Project {
        self.state.read().await.project.clone()
    }

    pub async fn insert_resource(&self, resource: Resource) {
        self.state.write().await.resources.push(resource);
    }

    pub async fn insert_review(&self, review: Review) {
        self.state.write().await.reviews.push(review);
    }

    pub async fn insert_submission(&self, submission: Submission) {
        self.state.write().await.submissions.push(submission);
    }

    pub async fn insert_upload(&self, upload: Upload) {
        self.state.write().await.uploads.push(upload);
    }

    pub async fn insert_screening_result(&self, result: ScreeningResult) {
        self.state.write().await.screening.push(result);
    }

    pub async fn insert_parent(&self, link: ProjectLink, project: Option<Project>) {
        self.state.write().await.parents.push(LinkedProject { link, project });
    }

    pub async fn set_minimum_score(&self, scorecard_id: impl Into<String>, score: f64) {
        self.state.write().await.scorecards.insert(scorecard_id.into(), score);
    }

    pub async fn subscribe(&self, external_id: impl Into<String>) {
        self.state.write().await.subscribers.push(external_id.into());
    }

    pub async fn add_pending_terms(&self, project_id: Uuid, external_id: impl Into<String>) {
        self.state.write().await.pending_terms.push(PendingTerms {
            project_id,
            external_id: external_id.into(),
        });
    }

    pub async fn reviews(&self) -> Vec<Review> {
        self.state.read().await.reviews.clone()
    }

    pub async fn resources(&self) -> Vec<Resource> {
        self.state.read().await.resources.clone()
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.state.read().await.submissions.clone()
    }

    pub async fn uploads(&self) -> Vec<Upload> {
        self.state.read().await.uploads.clone()
    }
}

fn matches_resource(resource: &Resource, filter: &ResourceFilter) -> bool {
    filter.project_id.is_none_or(|id| resource.project_id == id)
        && filter.phase_id.is_none_or(|id| resource.phase_id == Some(id))
        && (filter.roles.is_empty() || filter.roles.contains(&resource.role))
        && filter
            .external_id
            .as_deref()
            .is_none_or(|id| resource.external_id() == Some(id))
        && filter
            .property
            .as_ref()
            .is_none_or(|(key, value)| resource.property(key) == Some(value.as_str()))
}

fn matches_submission(submission: &Submission, filter: &SubmissionFilter) -> bool {
    filter.project_id.is_none_or(|id| submission.upload.project_id == id)
        && filter.status.is_none_or(|status| submission.status == status)
        && filter
            .submission_type
            .is_none_or(|t| submission.submission_type == t)
        && filter.owner.is_none_or(|owner| submission.owner() == owner)
}

fn matches_upload(upload: &Upload, filter: &UploadFilter) -> bool {
    filter.project_id.is_none_or(|id| upload.project_id == id)
        && filter.owner.is_none_or(|owner| upload.owner == owner)
        && filter.upload_type.is_none_or(|t| upload.upload_type == t)
        && filter.status.is_none_or(|status| upload.status == status)
}

#[async_trait]
impl PhaseStore for InMemoryWorkflowStore {
    async fn all_phase_types(&self) -> Result<Vec<PhaseType>, StoreError> {
        Ok(PhaseType::ALL.to_vec())
    }

    async fn all_phase_statuses(&self) -> Result<Vec<PhaseStatus>, StoreError> {
        Ok(vec![PhaseStatus::Scheduled, PhaseStatus::Open, PhaseStatus::Closed])
    }

    async fn update_phases(&self, project: &Project, operator: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.project.id != project.id {
            return Err(StoreError::not_found("project", project.id));
        }
        state.project.phases.clone_from(&project.phases);
        debug!(project_id = %project.id, phases = project.phases.len(), operator, "stored phases");
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for InMemoryWorkflowStore {
    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let state = self.state.read().await;
        if state.project.id == id {
            return Ok(Some(state.project.clone()));
        }
        Ok(state
            .parents
            .iter()
            .filter_map(|p| p.project.as_ref())
            .find(|p| p.id == id)
            .cloned())
    }

    async fn update_properties(
        &self,
        project_id: Uuid,
        properties: &BTreeMap<String, String>,
        reason: &str,
        operator: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.project.id != project_id {
            return Err(StoreError::not_found("project", project_id));
        }
        state.project.properties.clone_from(properties);
        debug!(%project_id, reason, operator, "stored project properties");
        Ok(())
    }

    async fn parent_links(&self, project_id: Uuid) -> Result<Vec<ProjectLink>, StoreError> {
        let state = self.state.read().await;
        if state.project.id != project_id {
            return Ok(Vec::new());
        }
        Ok(state.parents.iter().map(|p| p.link.clone()).collect())
    }
}

#[async_trait]
impl ResourceStore for InMemoryWorkflowStore {
    async fn search_resources(&self, filter: &ResourceFilter) -> Result<Vec<Resource>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .resources
            .iter()
            .filter(|r| matches_resource(r, filter))
            .cloned()
            .collect())
    }

    async fn get_resource(&self, id: Uuid) -> Result<Option<Resource>, StoreError> {
        let state = self.state.read().await;
        Ok(state.resources.iter().find(|r| r.id == id).cloned())
    }

    async fn create_resource(&self, resource: &Resource, _operator: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.resources.iter().any(|r| r.id == resource.id) {
            return Err(StoreError::ConstraintViolation(format!(
                "resource {} already exists",
                resource.id
            )));
        }
        state.resources.push(resource.clone());
        Ok(())
    }

    async fn all_roles(&self) -> Result<Vec<ResourceRole>, StoreError> {
        Ok(ResourceRole::ALL.to_vec())
    }

    async fn timeline_subscribers(&self, project_id: Uuid) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        if state.project.id != project_id {
            return Ok(Vec::new());
        }
        Ok(state.subscribers.clone())
    }
}

#[async_trait]
impl ReviewStore for InMemoryWorkflowStore {
    async fn search_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .filter(|r| filter.reviewers.contains(&r.author))
            .filter(|r| filter.submission.is_none_or(|s| r.submission == Some(s)))
            .filter(|r| filter.committed.is_none_or(|c| r.committed == c))
            .cloned()
            .collect())
    }

    async fn create_review(&self, review: &Review, _operator: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.reviews.iter().any(|r| r.id == review.id) {
            return Err(StoreError::ConstraintViolation(format!(
                "review {} already exists",
                review.id
            )));
        }
        state.reviews.push(review.clone());
        Ok(())
    }

    async fn update_review(&self, review: &Review, _operator: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .reviews
            .iter_mut()
            .find(|r| r.id == review.id)
            .ok_or_else(|| StoreError::not_found("review", review.id))?;
        *stored = review.clone();
        Ok(())
    }
}

#[async_trait]
impl UploadStore for InMemoryWorkflowStore {
    async fn search_submissions(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .submissions
            .iter()
            .filter(|s| matches_submission(s, filter))
            .cloned()
            .collect())
    }

    async fn update_submission(&self, submission: &Submission, _operator: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .submissions
            .iter_mut()
            .find(|s| s.id == submission.id)
            .ok_or_else(|| StoreError::not_found("submission", submission.id))?;
        *stored = submission.clone();
        Ok(())
    }

    async fn search_uploads(&self, filter: &UploadFilter) -> Result<Vec<Upload>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .uploads
            .iter()
            .filter(|u| matches_upload(u, filter))
            .cloned()
            .collect())
    }

    async fn update_upload(&self, upload: &Upload, _operator: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .uploads
            .iter_mut()
            .find(|u| u.id == upload.id)
            .ok_or_else(|| StoreError::not_found("upload", upload.id))?;
        *stored = upload.clone();
        Ok(())
    }

    async fn screening_results(&self, upload_ids: &[Uuid]) -> Result<Vec<ScreeningResult>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .screening
            .iter()
            .filter(|r| upload_ids.contains(&r.upload_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScorecardStore for InMemoryWorkflowStore {
    async fn minimum_score(&self, scorecard_id: &str) -> Result<f64, StoreError> {
        let state = self.state.read().await;
        state
            .scorecards
            .get(scorecard_id)
            .copied()
            .ok_or_else(|| StoreError::not_found("scorecard", scorecard_id))
    }
}

#[async_trait]
impl TermsOfUseChecker for InMemoryWorkflowStore {
    async fn has_pending_terms(&self, project_id: Uuid, external_id: &str) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .pending_terms
            .iter()
            .any(|t| t.project_id == project_id && t.external_id == external_id))
    }
}
