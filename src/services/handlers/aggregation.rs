//! Aggregation phase.
//!
//! Opening the phase prepares the aggregation worksheet: the previous cycle's
//! worksheet when there is one, otherwise a fresh sheet built from the
//! winner's review scorecards.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::resource::REVIEWER_ROLES;
use crate::domain::models::review::{AGGREGATION_COMMENT_TYPES, APPROVING_MARKER};
use crate::domain::models::{Comment, CommentType, FieldBag, PhaseType, Resource, ResourceRole, Review, Verdict};
use crate::services::worksheets;

pub struct AggregationHandler;

impl AggregationHandler {
    /// Recycle a prior worksheet for the new aggregator: uncommitted, positive
    /// verdicts marked as approving, rejections cleared.
    fn recycle(previous: &Review, aggregator: &Resource) -> Review {
        let mut worksheet = worksheets::duplicate(previous);
        worksheet.author = aggregator.id;
        worksheet.committed = false;
        for comment in &mut worksheet.comments {
            match comment.extra_info().and_then(Verdict::from_str) {
                Some(verdict) if verdict.is_positive() => {
                    comment.extra_info = Some(APPROVING_MARKER.to_string());
                }
                Some(Verdict::Rejected) => comment.extra_info = None,
                _ => {}
            }
        }
        worksheet
    }

    /// A new worksheet seeded from the winner's reviews of the last Review phase.
    async fn build(ctx: &PhaseContext<'_>, aggregator: &Resource) -> PhaseResult<Review> {
        let review_phase = ctx.require(PhaseType::Review, false)?;
        let reviewers = ctx.phase_resources(review_phase.id, &REVIEWER_ROLES).await?;
        let winner = ctx.winning_submitter().await?.ok_or_else(|| {
            PhaseHandlingError::MissingEntity(format!("winner for project {} (winner id not set)", ctx.project.id))
        })?;
        let winning_submission = ctx.winning_submission(&winner).await?;

        let mut worksheet = Review::new(aggregator.id, None, None);
        for review in ctx.reviews_by(&reviewers, Some(winning_submission.id)).await? {
            worksheet.scorecard.clone_from(&review.scorecard);
            worksheet.submission = review.submission;
            worksheet
                .comments
                .extend(worksheets::copy_comments(&review, &AGGREGATION_COMMENT_TYPES, None));
            worksheet
                .items
                .extend(worksheets::copy_review_items(&review, &AGGREGATION_COMMENT_TYPES));
        }

        let aggregator_external = aggregator.external_id();
        for reviewer in &reviewers {
            match reviewer.external_id() {
                Some(external) if Some(external) != aggregator_external => {
                    worksheet
                        .comments
                        .push(Comment::new(reviewer.id, CommentType::AggregationReviewComment, ""));
                }
                _ => {}
            }
        }
        worksheet
            .comments
            .push(Comment::new(winner.id, CommentType::SubmitterComment, ""));
        Ok(worksheet)
    }
}

#[async_trait]
impl PhaseHandler for AggregationHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::Aggregation
    }

    async fn start_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let winner = ctx.winning_submitter().await?;
        let aggregators = ctx.phase_resources(ctx.phase.id, &[ResourceRole::Aggregator]).await?;
        if winner.is_none() {
            warn!(project_id = %ctx.project.id, "can't open aggregation because there is no winner");
        }
        if aggregators.len() != 1 {
            warn!(
                project_id = %ctx.project.id,
                aggregators = aggregators.len(),
                "can't open aggregation without exactly one aggregator"
            );
        }
        Ok(winner.is_some() && aggregators.len() == 1)
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let worksheet = ctx.single_worksheet(ctx.phase.id, ResourceRole::Aggregator).await?;
        Ok(worksheet.is_some_and(|w| w.committed))
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let view = ctx.view()?;
        let aggregators = view.phase_resources(view.phase.id, &[ResourceRole::Aggregator]).await?;
        let aggregator = aggregators.first().ok_or_else(|| {
            PhaseHandlingError::MissingEntity(format!("Aggregator resource for phase {}", view.phase.id))
        })?;

        let previous = match view.locate(PhaseType::Aggregation, false, false)? {
            Some(phase) => view.single_worksheet(phase.id, ResourceRole::Aggregator).await?,
            None => None,
        };
        let worksheet = match &previous {
            Some(previous) => Self::recycle(previous, aggregator),
            None => Self::build(&view, aggregator).await?,
        };

        view.managers
            .reviews
            .create_review(&worksheet, ctx.operator)
            .await
            .context("Problem when persisting review")?;
        info!(
            phase_id = %view.phase.id,
            worksheet_id = %worksheet.id,
            recycled = previous.is_some(),
            "created aggregation worksheet"
        );

        Ok(FieldBag::new().with(fields::N_AGGREGATOR, aggregators.len()))
    }
}
