//! Specification Review phase.
//!
//! A single specification reviewer approves or rejects the specification
//! submission. A rejection fails the submission and schedules another
//! Specification Submission / Specification Review pair that inherits this
//! phase's attributes.

use async_trait::async_trait;
use tracing::{error, info};

use super::specification_submission::sole_specification_submission;
use super::{PhaseContext, PhaseHandler, TransitionContext, RESULT_APPROVED, RESULT_REJECTED};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::{
    CommentType, FieldBag, PhaseType, ResourceRole, Review, Submission, SubmissionStatus, Verdict,
};

pub struct SpecificationReviewHandler;

impl SpecificationReviewHandler {
    /// The specification reviewer's worksheet for `submission` on this phase.
    async fn specification_review(ctx: &PhaseContext<'_>, submission: &Submission) -> PhaseResult<Option<Review>> {
        let reviewers = ctx
            .phase_resources(ctx.phase.id, &[ResourceRole::SpecificationReviewer])
            .await?;
        let mut reviews = ctx.reviews_by(&reviewers, Some(submission.id)).await?;
        if reviews.len() > 1 {
            error!(phase_id = %ctx.phase.id, "multiple specification reviews exist");
            return Err(PhaseHandlingError::DataIntegrity(
                "Multiple specification reviews.".to_string(),
            ));
        }
        Ok(reviews.pop())
    }

    async fn schedule_rework(
        ctx: &mut TransitionContext<'_>,
        mut submission: Submission,
        mut review: Review,
    ) -> PhaseResult<()> {
        for comment in review
            .comments
            .iter_mut()
            .filter(|c| c.comment_type == CommentType::SpecificationReviewComment)
        {
            comment.extra_info = None;
        }
        ctx.managers
            .reviews
            .update_review(&review, ctx.operator)
            .await
            .context("Problem when updating review")?;

        submission.status = SubmissionStatus::FailedReview;
        ctx.managers
            .uploads
            .update_submission(&submission, ctx.operator)
            .await
            .context("Fails to update submission.")?;

        let index = ctx
            .splice(
                &[PhaseType::SpecificationSubmission, PhaseType::SpecificationReview],
                true,
                true,
            )
            .await?;
        let new_review = ctx.phase_id_at(index + 2)?;
        ctx.create_rework_resource(ctx.phase_id, ResourceRole::SpecificationReviewer, new_review)
            .await?;
        info!(project_id = %ctx.project.id, "specification rejected, new specification cycle scheduled");
        Ok(())
    }
}

#[async_trait]
impl PhaseHandler for SpecificationReviewHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::SpecificationReview
    }

    async fn start_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        Ok(sole_specification_submission(ctx).await?.is_some())
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let Some(submission) = sole_specification_submission(ctx).await? else {
            return Ok(false);
        };
        let review = Self::specification_review(ctx, &submission).await?;
        Ok(review.is_some_and(|r| r.committed))
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let view = ctx.view()?;
        let reviewers = view
            .phase_resources(view.phase.id, &[ResourceRole::SpecificationReviewer])
            .await?;
        Ok(FieldBag::new().with(fields::N_SPECIFICATION_REVIEWERS, reviewers.len()))
    }

    async fn on_end(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let (submission, review) = {
            let view = ctx.view()?;
            let submission = sole_specification_submission(&view)
                .await?
                .ok_or_else(|| PhaseHandlingError::MissingEntity("No specification submission exists.".to_string()))?;
            let review = Self::specification_review(&view, &submission)
                .await?
                .ok_or_else(|| {
                    PhaseHandlingError::MissingEntity("The review for the specification does not exist.".to_string())
                })?;
            (submission, review)
        };

        if !review.committed {
            return Err(PhaseHandlingError::DataIntegrity("The review is not committed.".to_string()));
        }
        let verdict = review
            .comments_of_type(CommentType::SpecificationReviewComment)
            .next()
            .ok_or_else(|| {
                PhaseHandlingError::MissingEntity("No comment with [Specification Review Comment] type.".to_string())
            })?
            .require_verdict()?;

        let rejected = verdict == Verdict::Rejected;
        if rejected {
            Self::schedule_rework(ctx, submission, review).await?;
        }

        Ok(FieldBag::new().with(
            fields::RESULT,
            if rejected { RESULT_REJECTED } else { RESULT_APPROVED },
        ))
    }
}
