//! Aggregation Review phase.
//!
//! Reviewers and the winning submitter put a verdict on the aggregation
//! worksheet. A single rejection sends the project through another
//! Aggregation / Aggregation Review cycle with a fresh aggregator.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::resource::REVIEWER_ROLES;
use crate::domain::models::{CommentType, FieldBag, PhaseType, Review, ResourceRole, Verdict};
use crate::services::worksheets;

const VERDICT_COMMENT_TYPES: [CommentType; 2] = [CommentType::AggregationReviewComment, CommentType::SubmitterComment];

/// Operator recorded when pending verdicts are approved automatically.
const SYSTEM_OPERATOR: &str = "System";

pub struct AggregationReviewHandler;

impl AggregationReviewHandler {
    /// The worksheet of the nearest earlier Aggregation phase.
    async fn worksheet(ctx: &PhaseContext<'_>) -> PhaseResult<Review> {
        let aggregation = ctx.require(PhaseType::Aggregation, false)?;
        ctx.single_worksheet(aggregation.id, ResourceRole::Aggregator)
            .await?
            .ok_or_else(|| PhaseHandlingError::MissingEntity("aggregation worksheet does not exist".to_string()))
    }

    fn has_verdict_from(worksheet: &Review, author: uuid::Uuid, comment_type: CommentType) -> bool {
        worksheet.comments.iter().any(|c| {
            c.comment_type == comment_type
                && c.author == author
                && c.extra_info().and_then(Verdict::from_str).is_some()
        })
    }

    /// Every reviewer other than the aggregator and the winning submitter has
    /// left a verdict.
    async fn review_done(&self, ctx: &PhaseContext<'_>, worksheet: &Review) -> PhaseResult<bool> {
        let (Some(review_phase), Some(aggregation)) = (
            ctx.locate(PhaseType::Review, false, false)?,
            ctx.locate(PhaseType::Aggregation, false, false)?,
        ) else {
            info!(phase_id = %ctx.phase.id, "no review or aggregation phase before aggregation review");
            return Ok(false);
        };

        let reviewers = ctx.phase_resources(review_phase.id, &REVIEWER_ROLES).await?;
        let aggregators = ctx.phase_resources(aggregation.id, &[ResourceRole::Aggregator]).await?;
        let aggregator = aggregators.first().ok_or_else(|| {
            PhaseHandlingError::MissingEntity(format!("Aggregator resource for phase {}", aggregation.id))
        })?;

        for reviewer in &reviewers {
            let Some(external) = reviewer.external_id() else {
                continue;
            };
            if Some(external) == aggregator.external_id() {
                continue;
            }
            if !Self::has_verdict_from(worksheet, reviewer.id, CommentType::AggregationReviewComment) {
                info!(resource_id = %reviewer.id, "reviewer has not reviewed the aggregation");
                return Ok(false);
            }
        }

        let Some(winner) = ctx.winning_submitter().await? else {
            info!(project_id = %ctx.project.id, "no winning submitter recorded");
            return Ok(false);
        };
        let done = Self::has_verdict_from(worksheet, winner.id, CommentType::SubmitterComment);
        if !done {
            info!(resource_id = %winner.id, "winning submitter has not reviewed the aggregation");
        }
        Ok(done)
    }

    /// Approve every verdict comment that is neither approved nor rejected.
    async fn approve_pending(ctx: &PhaseContext<'_>, worksheet: &Review) -> PhaseResult<()> {
        let mut approved = worksheet.clone();
        for comment in &mut approved.comments {
            let pending = !matches!(
                comment.extra_info(),
                Some(v) if v == Verdict::Approved.as_str() || v == Verdict::Rejected.as_str()
            );
            if VERDICT_COMMENT_TYPES.contains(&comment.comment_type) && pending {
                comment.extra_info = Some(Verdict::Approved.as_str().to_string());
            }
        }
        ctx.managers
            .reviews
            .update_review(&approved, SYSTEM_OPERATOR)
            .await
            .context("There were problems while approving pending aggregation reviews")
    }
}

#[async_trait]
impl PhaseHandler for AggregationReviewHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::AggregationReview
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let worksheet = Self::worksheet(ctx).await?;
        if self.review_done(ctx, &worksheet).await? {
            return Ok(true);
        }
        if !ctx.reached_end_time()? {
            return Ok(false);
        }

        info!(phase_id = %ctx.phase.id, "automatically approving pending aggregation reviews");
        match Self::approve_pending(ctx, &worksheet).await {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(phase_id = %ctx.phase.id, error = %err, "was not able to approve pending aggregation reviews");
                Ok(false)
            }
        }
    }

    async fn on_end(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let worksheet = Self::worksheet(&ctx.view()?).await?;

        let mut rejected = false;
        for comment in worksheet
            .comments
            .iter()
            .filter(|c| VERDICT_COMMENT_TYPES.contains(&c.comment_type))
        {
            if comment.require_verdict()? == Verdict::Rejected {
                rejected = true;
                break;
            }
        }

        if rejected {
            let reset = worksheets::reset_verdicts(&worksheet, &VERDICT_COMMENT_TYPES);
            ctx.managers
                .reviews
                .update_review(&reset, ctx.operator)
                .await
                .context("Problem when updating review")?;

            let index = ctx
                .splice(&[PhaseType::Aggregation, PhaseType::AggregationReview], true, false)
                .await?;
            let old_aggregation = ctx.phase_id_at(index.checked_sub(1).ok_or_else(|| {
                PhaseHandlingError::DataIntegrity("aggregation review is the first phase".to_string())
            })?)?;
            let new_aggregation = ctx.phase_id_at(index + 1)?;
            ctx.create_rework_resource(old_aggregation, ResourceRole::Aggregator, new_aggregation)
                .await?;
            info!(project_id = %ctx.project.id, "aggregation rejected, new aggregation cycle scheduled");
        }

        let view = ctx.view()?;
        let final_review = view.require(PhaseType::FinalReview, true)?;
        let final_reviewers = view
            .phase_resources(final_review.id, &[ResourceRole::FinalReviewer])
            .await?;
        Ok(FieldBag::new().with(fields::N_FINAL_REVIEWERS, final_reviewers.len()))
    }
}
