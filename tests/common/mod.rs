//! Common test utilities for integration tests
//!
//! Provides a project builder and an engine wired to the in-memory store,
//! shared across the integration test files.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use review_phases::adapters::{
    AverageScoreAggregator, DependencyCalendar, InMemoryWorkflowStore, RecordingNotifier, WorkflowSnapshot,
};
use review_phases::domain::models::{
    Dependency, EngineConfig, Phase, PhaseStatus, PhaseType, Project, Resource, ResourceRole, Review,
    Submission, SubmissionType, Upload, UploadType,
};
use review_phases::{Managers, PhaseEngine, PhaseResult, Transition};

pub const OPERATOR: &str = "integration";
pub const DAY_MS: i64 = 86_400_000;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap() + Duration::days(n)
}

/// Phases chained finish-to-start, one day each, the first starting at `day(0)`.
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

/// An engine over an in-memory store seeded with one project.
pub struct World {
    pub store: Arc<InMemoryWorkflowStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: PhaseEngine,
    pub project: Project,
}

impl World {
    pub fn new(project: Project) -> Self {
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
            aggregator: Arc::new(AverageScoreAggregator::new()),
            calendar: Arc::new(DependencyCalendar::new()),
            terms: store.clone(),
            notifier: notifier.clone(),
        };
        Self {
            store,
            notifier,
            engine: PhaseEngine::new(managers, EngineConfig::default()),
            project,
        }
    }

    pub fn phase_id(&self, index: usize) -> Uuid {
        self.project.phases[index].id
    }

    pub fn phase_ids(&self) -> Vec<Uuid> {
        self.project.phases.iter().map(|p| p.id).collect()
    }

    pub async fn can_perform(&self, index: usize, now: DateTime<Utc>) -> PhaseResult<bool> {
        self.engine.can_perform_at(&self.project, self.phase_id(index), now).await
    }

    pub async fn perform(&mut self, index: usize, now: DateTime<Utc>) -> PhaseResult<Transition> {
        let phase_id = self.phase_id(index);
        self.engine.perform_at(&mut self.project, phase_id, OPERATOR, now).await
    }

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

    pub async fn submission(&self, owner: &Resource, submission_type: SubmissionType) -> Submission {
        let upload = Upload::new(self.project.id, owner.id, UploadType::Submission).created_at(day(0));
        let submission = Submission::new(upload, submission_type);
        self.store.insert_submission(submission.clone()).await;
        submission
    }

    pub async fn review(&self, review: Review) -> Review {
        self.store.insert_review(review.clone()).await;
        review
    }
}
