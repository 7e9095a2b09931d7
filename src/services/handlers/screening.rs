//! Screening phase.
//!
//! Two modes, decided by who is assigned to the phase: primary screening,
//! where one Primary Screener scores every submission, and individual
//! screening, where a single Screener scores the only submission.

use async_trait::async_trait;
use tracing::info;

use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::resource::SCREENER_ROLES;
use crate::domain::models::{FieldBag, FieldValue, PhaseType, ResourceRole, SubmissionStatus, SubmissionType};
use crate::domain::ports::SubmissionFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScreeningMode {
    Primary,
    Individual,
}

pub struct ScreeningHandler;

impl ScreeningHandler {
    async fn mode(&self, ctx: &PhaseContext<'_>) -> PhaseResult<Option<ScreeningMode>> {
        let primary = ctx.phase_resources(ctx.phase.id, &[ResourceRole::PrimaryScreener]).await?;
        if !primary.is_empty() {
            return Ok(Some(ScreeningMode::Primary));
        }
        let screeners = ctx.phase_resources(ctx.phase.id, &[ResourceRole::Screener]).await?;
        Ok((!screeners.is_empty()).then_some(ScreeningMode::Individual))
    }

    /// One committed primary screening per active submission.
    async fn primary_committed(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let reviews = ctx.phase_reviews(ctx.phase.id, &[ResourceRole::PrimaryScreener]).await?;
        let submissions = ctx.active_submissions(SubmissionType::Contest).await?;
        if reviews.len() != submissions.len() {
            return Ok(false);
        }

        Ok(submissions.iter().all(|submission| {
            reviews
                .iter()
                .find(|r| r.submission == Some(submission.id))
                .is_some_and(|r| r.committed)
        }))
    }

    /// The single screening review, matched to the single submitter.
    async fn individual_committed(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let submitters = ctx.phase_resources(ctx.phase.id, &[ResourceRole::Submitter]).await?;
        let [submitter] = submitters.as_slice() else {
            return Err(PhaseHandlingError::DataIntegrity(format!(
                "expected one submitter on screening phase, found {}",
                submitters.len()
            )));
        };

        let filter = SubmissionFilter {
            project_id: Some(ctx.project.id),
            submission_type: Some(SubmissionType::Contest),
            owner: Some(submitter.id),
            ..SubmissionFilter::default()
        };
        let submissions = ctx
            .managers
            .uploads
            .search_submissions(&filter)
            .await
            .context("There was a submission retrieval error")?;
        let [submission] = submissions.as_slice() else {
            return Err(PhaseHandlingError::DataIntegrity(format!(
                "expected one submission for the screened submitter, found {}",
                submissions.len()
            )));
        };

        let reviews = ctx.phase_reviews(ctx.phase.id, &[ResourceRole::Screener]).await?;
        let [review] = reviews.as_slice() else {
            return Err(PhaseHandlingError::DataIntegrity(format!(
                "expected one screening review, found {}",
                reviews.len()
            )));
        };

        Ok(review.submission == Some(submission.id) && review.committed)
    }
}

#[async_trait]
impl PhaseHandler for ScreeningHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::Screening
    }

    async fn start_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        Ok(!ctx.active_submissions(SubmissionType::Contest).await?.is_empty())
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        match self.mode(ctx).await? {
            None => Ok(false),
            Some(ScreeningMode::Primary) => self.primary_committed(ctx).await,
            Some(ScreeningMode::Individual) => self.individual_committed(ctx).await,
        }
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let view = ctx.view()?;
        let screeners = view.phase_resources(view.phase.id, &SCREENER_ROLES).await?;
        let submissions = view.active_submissions(SubmissionType::Contest).await?;
        let submitters = view.submitter_values(&submissions, false).await?;

        Ok(FieldBag::new()
            .with(fields::NEED_PRIMARY_SCREENER, i64::from(screeners.is_empty()))
            .with(fields::SUBMITTER, FieldValue::List(submitters)))
    }

    async fn on_end(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let (no_pass, submitters) = {
            let view = ctx.view()?;
            let mut submissions = view.active_submissions(SubmissionType::Contest).await?;
            let reviews = view.phase_reviews(view.phase.id, &SCREENER_ROLES).await?;
            if submissions.len() != reviews.len() {
                return Err(PhaseHandlingError::DataIntegrity(format!(
                    "submission count does not match screening count for project {}",
                    view.project.id
                )));
            }

            let mut no_pass = false;
            if let Some(first) = reviews.first() {
                let minimum = view.minimum_score(first).await?;
                no_pass = true;
                for submission in &mut submissions {
                    let review = reviews
                        .iter()
                        .find(|r| r.submission == Some(submission.id))
                        .ok_or_else(|| {
                            PhaseHandlingError::DataIntegrity(format!(
                                "no screening review for submission {}",
                                submission.id
                            ))
                        })?;

                    submission.screening_score = review.score;
                    if review.score.unwrap_or(0.0) < minimum {
                        submission.status = SubmissionStatus::FailedScreening;
                        info!(submission_id = %submission.id, "submission failed screening");
                    } else {
                        no_pass = false;
                    }
                    view.managers
                        .uploads
                        .update_submission(submission, ctx.operator)
                        .await
                        .context("There was a upload persistence error")?;
                }
            }

            (no_pass, view.submitter_values(&submissions, true).await?)
        };

        if no_pass {
            ctx.insert_post_mortem().await?;
        }

        Ok(FieldBag::new()
            .with(fields::SUBMITTER, FieldValue::List(submitters))
            .with(fields::NO_SCREENING_PASS, i64::from(no_pass)))
    }
}
