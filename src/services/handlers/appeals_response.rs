//! Appeals Response phase.
//!
//! Closing this phase settles the contest: aggregated review scores become
//! final scores and placements, failing submissions drop out, and the winner
//! and runner-up are recorded on the project.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::project::properties;
use crate::domain::models::resource::REVIEWER_ROLES;
use crate::domain::models::{
    CommentType, FieldBag, FieldValue, PhaseType, Resource, ResourceRole, SubmissionStatus, SubmissionType,
};
use crate::domain::ports::{RankedSubmission, SubmissionScores};

/// Push tied submissions apart by upload time.
///
/// Every submission sharing a rank moves down one place for each submission of
/// that rank uploaded strictly earlier, so the earliest upload keeps the rank.
/// Submissions without a known upload time never move and never push others.
pub fn break_ties(
    placements: &[RankedSubmission],
    uploaded_at: &HashMap<Uuid, DateTime<Utc>>,
) -> Vec<RankedSubmission> {
    placements
        .iter()
        .map(|ranked| {
            let Some(own) = uploaded_at.get(&ranked.submission_id) else {
                return *ranked;
            };
            let earlier = placements
                .iter()
                .filter(|other| other.rank == ranked.rank)
                .filter_map(|other| uploaded_at.get(&other.submission_id))
                .filter(|other| *other < own)
                .count();
            RankedSubmission {
                rank: ranked.rank + earlier as u32,
                ..*ranked
            }
        })
        .collect()
}

pub struct AppealsResponseHandler;

impl AppealsResponseHandler {
    /// Every review of the previous Review phase has as many appeal responses
    /// as appeals, counting review-level and item comments alike.
    async fn all_appeals_resolved(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let Some(review_phase) = ctx.locate(PhaseType::Review, false, false)? else {
            return Ok(false);
        };

        let reviews = ctx.phase_reviews(review_phase.id, &REVIEWER_ROLES).await?;
        for review in &reviews {
            let (appeals, responses) = review.all_comments().fold((0, 0), |(a, r), c| match c.comment_type {
                CommentType::Appeal => (a + 1, r),
                CommentType::AppealResponse => (a, r + 1),
                _ => (a, r),
            });
            if appeals != responses {
                debug!(review_id = %review.id, appeals, responses, "unresolved appeals");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Compute final scores and placements. Returns the notification entries
    /// and whether any submission passed review.
    async fn settle_submissions(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<(Vec<FieldBag>, bool)> {
        let (mut submissions, winner, runner_up, any_passed) = {
            let view = ctx.view()?;
            let mut submissions = view.active_submissions(SubmissionType::Contest).await?;
            let review_phase = view.require(PhaseType::Review, false)?;
            let reviews = view.phase_reviews(review_phase.id, &REVIEWER_ROLES).await?;
            let Some(first) = reviews.first() else {
                return Err(PhaseHandlingError::MissingEntity(format!(
                    "reviews for phase {}",
                    review_phase.id
                )));
            };
            let minimum = view.minimum_score(first).await?;

            let raw: Vec<SubmissionScores> = submissions
                .iter()
                .map(|submission| SubmissionScores {
                    submission_id: submission.id,
                    scores: reviews
                        .iter()
                        .filter(|r| r.submission == Some(submission.id))
                        .map(|r| r.score.unwrap_or(0.0))
                        .collect(),
                })
                .collect();

            let aggregator = &view.managers.aggregator;
            let aggregated = aggregator.aggregate(&raw).context("Problem when aggregating scores")?;
            let placements = aggregator.rank(&aggregated).context("Problem when aggregating scores")?;
            let uploaded_at: HashMap<Uuid, DateTime<Utc>> =
                submissions.iter().map(|s| (s.id, s.upload.created_at)).collect();

            let mut winner: Option<Resource> = None;
            let mut runner_up: Option<Resource> = None;
            let mut any_passed = false;
            for ranked in break_ties(&placements, &uploaded_at) {
                let submission = submissions
                    .iter_mut()
                    .find(|s| s.id == ranked.submission_id)
                    .ok_or_else(|| {
                        PhaseHandlingError::MissingEntity(format!("submission {}", ranked.submission_id))
                    })?;
                let submitter = view.resource(submission.owner()).await?;

                submission.final_score = Some(ranked.score);
                submission.placement = Some(ranked.rank);
                if ranked.score < minimum && submission.status == SubmissionStatus::Active {
                    submission.status = SubmissionStatus::FailedReview;
                    info!(submission_id = %submission.id, score = ranked.score, "submission failed review");
                } else {
                    any_passed = true;
                    if ranked.rank == 1 {
                        winner = Some(submitter);
                    } else {
                        if ranked.rank == 2 {
                            runner_up = Some(submitter);
                        }
                        submission.status = SubmissionStatus::CompletedWithoutWin;
                    }
                }

                view.managers
                    .uploads
                    .update_submission(submission, ctx.operator)
                    .await
                    .context("Problem with upload persistence")?;
            }

            (submissions, winner, runner_up, any_passed)
        };

        match (&winner, &runner_up) {
            (None, Some(_)) => {
                return Err(PhaseHandlingError::DataIntegrity(format!(
                    "Runner up present, but no winner for project {}",
                    ctx.project.id
                )));
            }
            (Some(winner), runner_up) => {
                if let Some(id) = winner.external_id() {
                    ctx.project.set_property(properties::WINNER_EXTERNAL_REFERENCE_ID, id);
                }
                if let Some(id) = runner_up.as_ref().and_then(Resource::external_id) {
                    ctx.project.set_property(properties::RUNNER_UP_EXTERNAL_REFERENCE_ID, id);
                }
                ctx.update_project_properties("Update the winner and runner up.").await?;
                info!(project_id = %ctx.project.id, winner = ?winner.handle(), "recorded contest winner");
            }
            (None, None) => {}
        }

        let view = ctx.view()?;
        let mut entries = Vec::with_capacity(submissions.len());
        for submission in submissions.drain(..) {
            let submitter = view.resource(submission.owner()).await?;
            let score = |value: Option<f64>| value.map_or_else(|| FieldValue::text_or_na(None), FieldValue::Decimal);
            entries.push(
                FieldBag::new()
                    .with(fields::SUBMITTER_HANDLE, FieldValue::text_or_na(submitter.handle()))
                    .with(fields::SUBMITTER_PRE_APPEALS_SCORE, score(submission.initial_score))
                    .with(fields::SUBMITTER_POST_APPEALS_SCORE, score(submission.final_score))
                    .with(
                        fields::SUBMITTER_RESULT,
                        submission
                            .placement
                            .map_or_else(|| FieldValue::text_or_na(None), |p| FieldValue::Integer(i64::from(p))),
                    ),
            );
        }
        Ok((entries, any_passed))
    }
}

#[async_trait]
impl PhaseHandler for AppealsResponseHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::AppealsResponse
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        self.all_appeals_resolved(ctx).await
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let submitters = ctx
            .view()?
            .initial_score_values(fields::SUBMITTER_PRE_APPEALS_SCORE)
            .await?;
        Ok(FieldBag::new().with(fields::SUBMITTER, FieldValue::List(submitters)))
    }

    async fn on_end(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let (submitters, any_passed) = self.settle_submissions(ctx).await?;
        if !any_passed {
            ctx.insert_post_mortem().await?;
        }

        let view = ctx.view()?;
        let aggregation = view.require(PhaseType::Aggregation, true)?;
        let aggregators = view.phase_resources(aggregation.id, &[ResourceRole::Aggregator]).await?;

        Ok(FieldBag::new()
            .with(fields::SUBMITTER, FieldValue::List(submitters))
            .with(fields::N_AGGREGATOR, aggregators.len()))
    }
}
