//! Review phase.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info};

use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::phase::attributes;
use crate::domain::models::resource::{REVIEWER_ROLES, TEST_CASE_REVIEWER_ROLES};
use crate::domain::models::{FieldBag, FieldValue, PhaseType, SubmissionType, UploadType};
use crate::domain::ports::{SubmissionScores, UploadFilter};

pub struct ReviewHandler;

impl ReviewHandler {
    /// Every active submission carries one review from each assigned reviewer,
    /// and every review on the phase is committed.
    async fn all_reviews_done(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let reviewers = ctx.phase_resources(ctx.phase.id, &REVIEWER_ROLES).await?;
        if reviewers.is_empty() {
            info!(project_id = %ctx.project.id, "no reviewers assigned to review phase");
            return Ok(false);
        }
        if let Some(required) = ctx.phase.int_attribute(attributes::REVIEWER_NUMBER)? {
            if (reviewers.len() as i64) < required {
                info!(
                    project_id = %ctx.project.id,
                    assigned = reviewers.len(),
                    required,
                    "not enough reviewers to close review phase"
                );
                return Ok(false);
            }
        }

        let reviews = ctx.reviews_by(&reviewers, None).await?;
        if reviews.iter().any(|r| !r.committed) {
            return Ok(false);
        }

        let reviewer_ids: HashSet<_> = reviewers.iter().map(|r| r.id).collect();
        let submissions = ctx.active_submissions(SubmissionType::Contest).await?;
        for submission in &submissions {
            let count = reviews
                .iter()
                .filter(|r| r.submission == Some(submission.id) && reviewer_ids.contains(&r.author))
                .count();
            if count != reviewers.len() {
                debug!(submission_id = %submission.id, count, "submission is missing reviews");
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn all_test_cases_uploaded(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let reviewers = ctx.phase_resources(ctx.phase.id, &TEST_CASE_REVIEWER_ROLES).await?;
        for reviewer in &reviewers {
            let filter = UploadFilter {
                project_id: Some(ctx.project.id),
                owner: Some(reviewer.id),
                upload_type: Some(UploadType::TestCase),
                ..UploadFilter::default()
            };
            let uploads = ctx
                .managers
                .uploads
                .search_uploads(&filter)
                .await
                .context("Problem retrieving uploads")?;
            if uploads.is_empty() {
                info!(resource_id = %reviewer.id, role = %reviewer.role, "test cases not uploaded");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl PhaseHandler for ReviewHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::Review
    }

    async fn start_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        Ok(!ctx.active_submissions(SubmissionType::Contest).await?.is_empty())
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        Ok(self.all_reviews_done(ctx).await? && self.all_test_cases_uploaded(ctx).await?)
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let view = ctx.view()?;
        let submissions = view.active_submissions(SubmissionType::Contest).await?;
        let submitters = view.submitter_values(&submissions, false).await?;
        let reviewers = view.phase_resources(view.phase.id, &REVIEWER_ROLES).await?;
        let required = view.int_attribute_or(attributes::REVIEWER_NUMBER, 0)?;

        Ok(FieldBag::new()
            .with(fields::SUBMITTER, FieldValue::List(submitters))
            .with(fields::N_REQUIRED_REVIEWERS, required)
            .with(fields::N_REVIEWERS, reviewers.len())
            .with(fields::NEED_REVIEWER, i64::from((reviewers.len() as i64) < required)))
    }

    /// Aggregate the raw review scores into each submission's initial score.
    async fn on_end(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let view = ctx.view()?;
        let mut submissions = view.active_submissions(SubmissionType::Contest).await?;
        let reviewers = view.phase_resources(view.phase.id, &REVIEWER_ROLES).await?;
        let reviews = view.reviews_by(&reviewers, None).await?;

        let mut raw = Vec::with_capacity(submissions.len());
        for submission in &submissions {
            let scores: Vec<f64> = reviews
                .iter()
                .filter(|r| r.submission == Some(submission.id))
                .map(|r| r.score.unwrap_or(0.0))
                .collect();
            if scores.len() != reviewers.len() {
                return Err(PhaseHandlingError::DataIntegrity(format!(
                    "number of reviews for submission {} does not match number of reviewers",
                    submission.id
                )));
            }
            raw.push(SubmissionScores {
                submission_id: submission.id,
                scores,
            });
        }

        let aggregated = view
            .managers
            .aggregator
            .aggregate(&raw)
            .context("Problem when aggregating scores")?;

        let mut entries = Vec::with_capacity(submissions.len());
        for submission in &mut submissions {
            let score = aggregated
                .iter()
                .find(|a| a.submission_id == submission.id)
                .map(|a| a.score)
                .ok_or_else(|| {
                    PhaseHandlingError::DataIntegrity(format!("no aggregated score for submission {}", submission.id))
                })?;
            submission.initial_score = Some(score);
            view.managers
                .uploads
                .update_submission(submission, ctx.operator)
                .await
                .context("Problem when updating submission")?;

            let submitter = view.resource(submission.owner()).await?;
            entries.push(
                FieldBag::new()
                    .with(fields::SUBMITTER_HANDLE, FieldValue::text_or_na(submitter.handle()))
                    .with(fields::SUBMITTER_SCORE, score),
            );
        }

        Ok(FieldBag::new().with(fields::SUBMITTER, FieldValue::List(entries)))
    }
}
