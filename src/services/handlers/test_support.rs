//! Fixtures shared by the handler unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::engine::{PhaseEngine, Transition};
use crate::adapters::calendar::DependencyCalendar;
use crate::adapters::memory::{InMemoryWorkflowStore, WorkflowSnapshot};
use crate::adapters::notifier::RecordingNotifier;
use crate::adapters::scoring::AverageScoreAggregator;
use crate::domain::errors::PhaseResult;
use crate::domain::models::{
    Dependency, EngineConfig, Phase, PhaseStatus, PhaseType, Project, Resource, ResourceRole, Review,
    Submission, SubmissionType, Upload, UploadType,
};
use crate::services::managers::Managers;

pub const OPERATOR: &str = "phase-bot";
pub const SCORECARD: &str = "scorecard-1";
pub const DAY_MS: i64 = 86_400_000;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

pub fn day(n: i64) -> DateTime<Utc> {
    base_time() + Duration::days(n)
}

/// Phases chained finish-to-start, one day each, starting at [`base_time`].
pub fn chain(phases: &[(PhaseType, PhaseStatus)]) -> Project {
    let mut project = Project::new();
    let mut previous: Option<Uuid> = None;
    for (i, (phase_type, status)) in phases.iter().enumerate() {
        let mut phase = Phase::new(*phase_type, DAY_MS)
            .with_status(*status)
            .with_schedule(day(i as i64), day(i as i64 + 1));
        if let Some(prev) = previous {
            phase = phase.with_dependency(Dependency::finish_to_start(prev));
        }
        previous = Some(phase.id);
        project.phases.push(phase);
    }
    project
}

pub struct Harness {
    pub store: Arc<InMemoryWorkflowStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: PhaseEngine,
    pub project: Project,
}

impl Harness {
    pub fn new(project: Project) -> Self {
        Self::with_config(project, EngineConfig::default())
    }

    pub fn with_config(project: Project, config: EngineConfig) -> Self {
        let store = Arc::new(InMemoryWorkflowStore::new(WorkflowSnapshot {
            project: project.clone(),
            ..WorkflowSnapshot::default()
        }));
        let notifier = Arc::new(RecordingNotifier::new());
        let managers = Managers {
            phases: store.clone(),
            projects: store.clone(),
            resources: store.clone(),
            reviews: store.clone(),
            uploads: store.clone(),
            scorecards: store.clone(),
            aggregator: Arc::new(AverageScoreAggregator),
            calendar: Arc::new(DependencyCalendar),
            terms: store.clone(),
            notifier: notifier.clone(),
        };
        Self {
            store,
            notifier,
            engine: PhaseEngine::new(managers, config),
            project,
        }
    }

    pub fn phase_id(&self, index: usize) -> Uuid {
        self.project.phases[index].id
    }

    pub fn set_status(&mut self, index: usize, status: PhaseStatus) {
        self.project.phases[index].status = status;
    }

    pub async fn can_perform(&self, index: usize, now: DateTime<Utc>) -> PhaseResult<bool> {
        self.engine.can_perform_at(&self.project, self.phase_id(index), now).await
    }

    pub async fn perform(&mut self, index: usize, now: DateTime<Utc>) -> PhaseResult<Transition> {
        let phase_id = self.phase_id(index);
        self.engine.perform_at(&mut self.project, phase_id, OPERATOR, now).await
    }

    /// A resource on the project, optionally bound to the phase at `phase_index`.
    pub async fn resource(&self, role: ResourceRole, phase_index: Option<usize>, handle: &str) -> Resource {
        let mut resource = Resource::new(self.project.id, role)
            .with_property("Handle", handle)
            .with_property("External Reference ID", format!("ext-{handle}"));
        if let Some(index) = phase_index {
            resource = resource.with_phase(self.phase_id(index));
        }
        self.store.insert_resource(resource.clone()).await;
        resource
    }

    /// An active contest submission owned by `owner`, uploaded at `uploaded`.
    pub async fn submission(&self, owner: &Resource, uploaded: DateTime<Utc>) -> Submission {
        self.typed_submission(owner, uploaded, SubmissionType::Contest).await
    }

    pub async fn typed_submission(
        &self,
        owner: &Resource,
        uploaded: DateTime<Utc>,
        submission_type: SubmissionType,
    ) -> Submission {
        let upload = Upload::new(self.project.id, owner.id, UploadType::Submission).created_at(uploaded);
        let submission = Submission::new(upload, submission_type);
        self.store.insert_submission(submission.clone()).await;
        submission
    }

    pub async fn review(&self, review: Review) -> Review {
        self.store.insert_review(review.clone()).await;
        review
    }
}
