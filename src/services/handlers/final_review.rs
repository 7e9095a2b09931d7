//! Final Review phase.
//!
//! The final reviewer approves or rejects the winner's final fixes. Rejection
//! schedules another Final Fix / Final Review pair; approval may add an
//! Approval phase when the project asks for one.

use async_trait::async_trait;
use tracing::info;

use super::{PhaseContext, PhaseHandler, TransitionContext, RESULT_APPROVED, RESULT_REJECTED};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::phase::attributes;
use crate::domain::models::project::properties;
use crate::domain::models::{CommentType, FieldBag, PhaseType, ResourceRole, Review, Verdict};
use crate::services::worksheets;

pub struct FinalReviewHandler;

impl FinalReviewHandler {
    /// Whether any Final Review Comment on the worksheet rejects the fixes.
    fn is_rejected(worksheet: &Review) -> PhaseResult<bool> {
        for comment in worksheet.comments_of_type(CommentType::FinalReviewComment) {
            if comment.require_verdict()? == Verdict::Rejected {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn schedule_rework(ctx: &mut TransitionContext<'_>, worksheet: &Review) -> PhaseResult<()> {
        let reset = worksheets::reset_verdicts(worksheet, &[CommentType::FinalReviewComment]);
        ctx.managers
            .reviews
            .update_review(&reset, ctx.operator)
            .await
            .context("Problem when updating review")?;

        let index = ctx.splice(&[PhaseType::FinalFix, PhaseType::FinalReview], true, false).await?;
        let new_final_review = ctx.phase_id_at(index + 2)?;
        ctx.create_rework_resource(ctx.phase_id, ResourceRole::FinalReviewer, new_final_review)
            .await?;
        info!(project_id = %ctx.project.id, "final review rejected, new final fix cycle scheduled");
        Ok(())
    }
}

#[async_trait]
impl PhaseHandler for FinalReviewHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::FinalReview
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let worksheet = ctx.single_worksheet(ctx.phase.id, ResourceRole::FinalReviewer).await?;
        Ok(worksheet.is_some_and(|w| w.committed))
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let view = ctx.view()?;
        let final_reviewers = view
            .phase_resources(view.phase.id, &[ResourceRole::FinalReviewer])
            .await?;
        Ok(FieldBag::new().with(fields::N_FINAL_REVIEWERS, final_reviewers.len()))
    }

    async fn on_end(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let worksheet = {
            let view = ctx.view()?;
            view.single_worksheet(view.phase.id, ResourceRole::FinalReviewer)
                .await?
                .ok_or_else(|| PhaseHandlingError::MissingEntity("final review worksheet".to_string()))?
        };

        let rejected = Self::is_rejected(&worksheet)?;
        if rejected {
            Self::schedule_rework(ctx, &worksheet).await?;
        } else {
            let has_approval = ctx.view()?.locate(PhaseType::Approval, true, false)?.is_some();
            if !has_approval && ctx.project.property_is_true(properties::APPROVAL_REQUIRED) {
                ctx.insert_approval().await?;
            }
        }

        let mut values = FieldBag::new().with(
            fields::RESULT,
            if rejected { RESULT_REJECTED } else { RESULT_APPROVED },
        );

        let view = ctx.view()?;
        match view.locate(PhaseType::Approval, true, false)? {
            Some(approval) => {
                let approvers = view.project_resources(&[ResourceRole::Approver]).await?.len() as i64;
                let required = approval.int_attribute(attributes::REVIEWER_NUMBER)?.unwrap_or(1);
                values.insert(fields::N_APPROVERS, approvers);
                values.insert(fields::N_REQUIRED_APPROVERS, required);
                values.insert(fields::NEED_APPROVER, i64::from(required > approvers));
            }
            None => values.insert(fields::NEED_APPROVER, 0_i64),
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Comment, FieldValue, PhaseStatus};
    use crate::services::handlers::test_support::{chain, day, Harness};

    fn final_review_project() -> Harness {
        Harness::new(chain(&[
            (PhaseType::FinalFix, PhaseStatus::Closed),
            (PhaseType::FinalReview, PhaseStatus::Open),
        ]))
    }

    async fn worksheet(harness: &Harness, verdict: &str) -> Review {
        let reviewer = harness.resource(ResourceRole::FinalReviewer, Some(1), "fin").await;
        harness
            .review(
                Review::new(reviewer.id, None, None)
                    .committed()
                    .with_comment(
                        Comment::new(reviewer.id, CommentType::FinalReviewComment, "looks good").with_extra_info(verdict),
                    ),
            )
            .await
    }

    #[tokio::test]
    async fn test_end_waits_for_committed_worksheet() {
        let harness = final_review_project();
        assert!(!harness.can_perform(1, day(2)).await.unwrap());

        worksheet(&harness, "Approved").await;
        assert!(harness.can_perform(1, day(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_accepted_counts_as_approval() {
        let mut harness = final_review_project();
        worksheet(&harness, "Accepted").await;

        let transition = harness.perform(1, day(2)).await.unwrap();
        assert_eq!(
            transition.values.get(fields::RESULT).and_then(FieldValue::as_text),
            Some(RESULT_APPROVED)
        );
        assert_eq!(transition.values.get(fields::NEED_APPROVER).and_then(FieldValue::as_integer), Some(0));
        assert_eq!(harness.project.phases.len(), 2);
    }

    #[tokio::test]
    async fn test_approval_inserts_required_approval_phase() {
        let mut harness = final_review_project();
        harness.project.set_property(properties::APPROVAL_REQUIRED, "true");
        harness.resource(ResourceRole::Approver, None, "amy").await;
        worksheet(&harness, "Approved").await;

        let transition = harness.perform(1, day(2)).await.unwrap();

        assert_eq!(harness.project.phases[2].phase_type, PhaseType::Approval);
        assert_eq!(harness.project.phases[2].attribute(attributes::REVIEWER_NUMBER), Some("1"));
        assert_eq!(transition.values.get(fields::N_APPROVERS).and_then(FieldValue::as_integer), Some(1));
        assert_eq!(
            transition.values.get(fields::N_REQUIRED_APPROVERS).and_then(FieldValue::as_integer),
            Some(1)
        );
        assert_eq!(transition.values.get(fields::NEED_APPROVER).and_then(FieldValue::as_integer), Some(0));
    }

    #[tokio::test]
    async fn test_rejection_schedules_final_fix_cycle() {
        let mut harness = final_review_project();
        let sheet = worksheet(&harness, "Rejected").await;

        let transition = harness.perform(1, day(2)).await.unwrap();

        assert_eq!(
            harness.project.phase_types(),
            vec![
                PhaseType::FinalFix,
                PhaseType::FinalReview,
                PhaseType::FinalFix,
                PhaseType::FinalReview
            ]
        );
        assert_eq!(
            transition.values.get(fields::RESULT).and_then(FieldValue::as_text),
            Some(RESULT_REJECTED)
        );
        let new_review = harness.phase_id(3);
        let resources = harness.store.resources().await;
        assert!(resources
            .iter()
            .any(|r| r.phase_id == Some(new_review) && r.role == ResourceRole::FinalReviewer));

        let stored = harness.store.reviews().await;
        let reset = stored.iter().find(|r| r.id == sheet.id).unwrap();
        assert!(reset.comments[0].extra_info.is_none());
    }

    #[tokio::test]
    async fn test_unknown_verdict_is_rejected_as_invalid() {
        let mut harness = final_review_project();
        worksheet(&harness, "Fine by me").await;

        let err = harness.perform(1, day(2)).await.unwrap_err();
        assert!(matches!(err, PhaseHandlingError::InvalidVerdict { .. }));
    }
}
