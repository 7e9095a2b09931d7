//! Specification Submission phase.

use async_trait::async_trait;
use tracing::{debug, error};

use super::{PhaseContext, PhaseHandler};
use crate::domain::errors::{PhaseHandlingError, PhaseResult};
use crate::domain::models::{PhaseType, Submission, SubmissionType};
use crate::services::phase_graph::is_first_phase;

pub struct SpecificationSubmissionHandler;

/// The project's active specification submission. More than one is a data error.
pub(crate) async fn sole_specification_submission(ctx: &PhaseContext<'_>) -> PhaseResult<Option<Submission>> {
    let mut submissions = ctx.active_submissions(SubmissionType::Specification).await?;
    if submissions.len() > 1 {
        error!(project_id = %ctx.project.id, count = submissions.len(), "multiple specification submissions exist");
        return Err(PhaseHandlingError::DataIntegrity(
            "Multiple specification submissions exist.".to_string(),
        ));
    }
    Ok(submissions.pop())
}

#[async_trait]
impl PhaseHandler for SpecificationSubmissionHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::SpecificationSubmission
    }

    /// A project that opens with this phase waits for its parent projects.
    async fn start_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        if !is_first_phase(ctx.project, ctx.phase.id, ctx.managers.calendar.as_ref())? {
            return Ok(true);
        }
        let completed = ctx.parent_projects_completed().await?;
        if !completed {
            debug!(project_id = %ctx.project.id, "parent projects are not completed");
        }
        Ok(completed)
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        Ok(sole_specification_submission(ctx).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Phase, PhaseStatus, Project, ProjectLink, ProjectStatus, ResourceRole};
    use crate::services::handlers::test_support::{chain, day, Harness};

    fn spec_project() -> Harness {
        Harness::new(chain(&[
            (PhaseType::SpecificationSubmission, PhaseStatus::Scheduled),
            (PhaseType::SpecificationReview, PhaseStatus::Scheduled),
        ]))
    }

    #[tokio::test]
    async fn test_first_phase_waits_for_parent_projects() {
        let harness = spec_project();
        assert!(harness.can_perform(0, day(0)).await.unwrap());

        let mut parent = Project::new().with_phase(Phase::new(PhaseType::Review, 1).with_status(PhaseStatus::Open));
        parent.status = ProjectStatus::Active;
        harness
            .store
            .insert_parent(
                ProjectLink {
                    parent_id: parent.id,
                    allow_overlap: false,
                },
                Some(parent.clone()),
            )
            .await;
        assert!(!harness.can_perform(0, day(0)).await.unwrap());

        let overlapping = Project::new();
        harness
            .store
            .insert_parent(
                ProjectLink {
                    parent_id: overlapping.id,
                    allow_overlap: true,
                },
                Some(overlapping),
            )
            .await;
        assert!(!harness.can_perform(0, day(0)).await.unwrap());
    }

    #[tokio::test]
    async fn test_completed_parent_lets_first_phase_start() {
        let harness = spec_project();
        let mut parent = Project::new();
        parent.status = ProjectStatus::Completed;
        harness
            .store
            .insert_parent(
                ProjectLink {
                    parent_id: parent.id,
                    allow_overlap: false,
                },
                Some(parent),
            )
            .await;
        assert!(harness.can_perform(0, day(0)).await.unwrap());
    }

    #[tokio::test]
    async fn test_later_phase_with_stale_stored_start_skips_parent_gate() {
        let mut harness = Harness::new(chain(&[
            (PhaseType::Registration, PhaseStatus::Closed),
            (PhaseType::SpecificationSubmission, PhaseStatus::Scheduled),
        ]));
        // left over from before a splice; the computed start is day(1)
        harness.project.phases[1].scheduled_start = Some(day(0));

        let mut parent = Project::new().with_phase(Phase::new(PhaseType::Review, 1).with_status(PhaseStatus::Open));
        parent.status = ProjectStatus::Active;
        harness
            .store
            .insert_parent(
                ProjectLink {
                    parent_id: parent.id,
                    allow_overlap: false,
                },
                Some(parent),
            )
            .await;

        assert!(!harness.can_perform(1, day(0)).await.unwrap());
        assert!(harness.can_perform(1, day(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_end_needs_exactly_one_specification_submission() {
        let mut harness = spec_project();
        harness.set_status(0, PhaseStatus::Open);
        assert!(!harness.can_perform(0, day(1)).await.unwrap());

        let writer = harness.resource(ResourceRole::SpecificationSubmitter, None, "sam").await;
        harness
            .typed_submission(&writer, day(0), SubmissionType::Specification)
            .await;
        assert!(harness.can_perform(0, day(1)).await.unwrap());

        harness
            .typed_submission(&writer, day(0), SubmissionType::Specification)
            .await;
        let err = harness.can_perform(0, day(1)).await.unwrap_err();
        assert!(matches!(err, PhaseHandlingError::DataIntegrity(_)));
    }
}
