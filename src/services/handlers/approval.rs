//! Approval phase.
//!
//! Approvers sign off on the final fixes. A rejection schedules another
//! Final Fix / Final Review pair; an approval may still flag the project as
//! needing other fixes.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{PhaseContext, PhaseHandler, TransitionContext, RESULT_APPROVED, RESULT_REJECTED};
use crate::domain::errors::PhaseResult;
use crate::domain::models::notification::fields;
use crate::domain::models::phase::attributes;
use crate::domain::models::project::properties;
use crate::domain::models::review::OTHER_FIXES_REQUIRED;
use crate::domain::models::{CommentType, FieldBag, Phase, PhaseType, ResourceRole, Review, Verdict};

pub struct ApprovalHandler;

/// Approvers an Approval phase asks for; one when unset.
fn required_approvers(phase: &Phase) -> PhaseResult<i64> {
    Ok(phase.int_attribute(attributes::REVIEWER_NUMBER)?.unwrap_or(1))
}

impl ApprovalHandler {
    /// The approver reviews that belong to this Approval phase.
    ///
    /// Approver reviews are ordered oldest first and every Approval phase owns
    /// as many of them as its reviewer number, in phase order.
    async fn cycle_reviews(ctx: &PhaseContext<'_>) -> PhaseResult<Vec<Review>> {
        let reviews = ctx.project_reviews(&[ResourceRole::Approver]).await?;

        let mut skip = 0usize;
        for phase in ctx.project.phases.iter().filter(|p| p.phase_type == PhaseType::Approval) {
            let owned = usize::try_from(required_approvers(phase)?).unwrap_or(0);
            if phase.id == ctx.phase.id {
                return Ok(reviews.into_iter().skip(skip).take(owned).collect());
            }
            skip += owned;
        }
        Ok(Vec::new())
    }

    async fn approver_count(ctx: &PhaseContext<'_>) -> PhaseResult<i64> {
        Ok(ctx.project_resources(&[ResourceRole::Approver]).await?.len() as i64)
    }

    fn is_rejected(reviews: &[Review]) -> PhaseResult<bool> {
        for review in reviews.iter().filter(|r| r.committed) {
            for comment in review.comments_of_type(CommentType::ApprovalReviewComment) {
                if comment.require_verdict()? == Verdict::Rejected {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn other_fixes_required(reviews: &[Review]) -> bool {
        reviews.iter().filter(|r| r.committed).any(|review| {
            review
                .comments_of_type(CommentType::ApprovalOtherFixes)
                .any(|c| c.extra_info().is_some_and(|v| v.eq_ignore_ascii_case(OTHER_FIXES_REQUIRED)))
        })
    }

    async fn schedule_rework(ctx: &mut TransitionContext<'_>) -> PhaseResult<()> {
        let previous_final_review = ctx.view()?.require(PhaseType::FinalReview, false)?.id;
        let index = ctx.splice(&[PhaseType::FinalFix, PhaseType::FinalReview], true, false).await?;
        let new_final_review = ctx.phase_id_at(index + 2)?;
        ctx.create_rework_resource(previous_final_review, ResourceRole::FinalReviewer, new_final_review)
            .await?;
        info!(project_id = %ctx.project.id, "approval rejected, new final fix cycle scheduled");
        Ok(())
    }
}

#[async_trait]
impl PhaseHandler for ApprovalHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::Approval
    }

    async fn start_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let approvers = Self::approver_count(ctx).await?;
        let required = required_approvers(ctx.phase)?;
        debug!(phase_id = %ctx.phase.id, approvers, required, "checking approver count");
        Ok(approvers >= required)
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        if ctx.reached_end_time()? {
            return Ok(true);
        }

        let reviews = Self::cycle_reviews(ctx).await?;
        if reviews.is_empty() {
            return Ok(false);
        }
        let committed = reviews.iter().filter(|r| r.committed).count() as i64;
        Ok(committed >= required_approvers(ctx.phase)?)
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let view = ctx.view()?;
        let approvers = Self::approver_count(&view).await?;
        let required = required_approvers(view.phase)?;
        Ok(FieldBag::new()
            .with(fields::N_APPROVERS, approvers)
            .with(fields::N_REQUIRED_APPROVERS, required)
            .with(fields::NEED_APPROVER, i64::from(required > approvers)))
    }

    async fn on_end(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let reviews = Self::cycle_reviews(&ctx.view()?).await?;
        let rejected = Self::is_rejected(&reviews)?;

        if rejected {
            Self::schedule_rework(ctx).await?;
        } else if Self::other_fixes_required(&reviews) {
            ctx.project.set_property(properties::REQUIRES_OTHER_FIXES, "true");
            ctx.update_project_properties("Approval requires other fixes.").await?;
            info!(project_id = %ctx.project.id, "approvers require other fixes");
        }

        Ok(FieldBag::new().with(
            fields::RESULT,
            if rejected { RESULT_REJECTED } else { RESULT_APPROVED },
        ))
    }
}
