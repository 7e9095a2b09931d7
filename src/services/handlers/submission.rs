//! Submission phase.
//!
//! Closes once its end time has passed and either nobody submitted or enough
//! submissions passed screening. A submission phase that ends empty-handed
//! gets a Post-Mortem phase.

use async_trait::async_trait;

use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::phase::attributes;
use crate::domain::models::resource::SCREENER_ROLES;
use crate::domain::models::{FieldBag, FieldValue, PhaseType, SubmissionType};

pub struct SubmissionHandler;

impl SubmissionHandler {
    /// Submissions that passed screening: reviewed ones at or above the scorecard
    /// minimum in manual mode, automated passes otherwise.
    async fn passed_screening(&self, ctx: &PhaseContext<'_>) -> PhaseResult<usize> {
        let manual = ctx.phase.attribute(attributes::MANUAL_SCREENING) == Some("Yes");
        if manual {
            let Some(screening) = ctx.locate(PhaseType::Screening, true, false)? else {
                return Ok(0);
            };
            let reviews = ctx.phase_reviews(screening.id, &SCREENER_ROLES).await?;
            let Some(first) = reviews.first() else {
                return Ok(0);
            };
            let minimum = ctx.minimum_score(first).await?;
            return Ok(reviews
                .iter()
                .filter(|r| r.score.is_some_and(|score| score >= minimum))
                .count());
        }

        let submissions = ctx.active_submissions(SubmissionType::Contest).await?;
        if submissions.is_empty() {
            return Ok(0);
        }
        let uploads: Vec<_> = submissions.iter().map(|s| s.upload.id).collect();
        let results = ctx
            .managers
            .uploads
            .screening_results(&uploads)
            .await
            .context("Problem when getting screening tasks")?;
        Ok(results.iter().filter(|r| r.status.is_pass()).count())
    }

    async fn enough_passed(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let Some(required) = ctx.phase.int_attribute(attributes::SUBMISSION_NUMBER)? else {
            return Ok(true);
        };
        Ok(self.passed_screening(ctx).await? as i64 >= required)
    }
}

#[async_trait]
impl PhaseHandler for SubmissionHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::Submission
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        if !ctx.reached_end_time()? {
            return Ok(false);
        }
        let submissions = ctx.active_submissions(SubmissionType::Contest).await?;
        Ok(submissions.is_empty() || self.enough_passed(ctx).await?)
    }

    async fn on_end(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let (count, submitters) = {
            let view = ctx.view()?;
            let submissions = view.active_submissions(SubmissionType::Contest).await?;
            let submitters = view.submitter_values(&submissions, false).await?;
            (submissions.len(), submitters)
        };

        if count == 0 {
            ctx.insert_post_mortem().await?;
        }

        Ok(FieldBag::new()
            .with(fields::N_SUBMITTERS, count)
            .with(fields::SUBMITTER, FieldValue::List(submitters)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::project::properties;
    use crate::domain::models::{PhaseStatus, Review, ResourceRole, ScreeningResult, ScreeningStatus};
    use crate::services::handlers::test_support::{chain, day, Harness, SCORECARD};

    fn submission_project() -> Harness {
        Harness::new(chain(&[
            (PhaseType::Submission, PhaseStatus::Open),
            (PhaseType::Screening, PhaseStatus::Scheduled),
            (PhaseType::Review, PhaseStatus::Scheduled),
        ]))
    }

    #[tokio::test]
    async fn test_not_ready_before_end_time() {
        let harness = submission_project();
        assert!(!harness.can_perform(0, day(0)).await.unwrap());
        assert!(harness.can_perform(0, day(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_auto_screening_counts_passes() {
        let mut harness = submission_project();
        harness.project.phases[0]
            .attributes
            .insert(attributes::SUBMISSION_NUMBER.to_string(), "2".to_string());
        let alice = harness.resource(ResourceRole::Submitter, None, "alice").await;
        let bob = harness.resource(ResourceRole::Submitter, None, "bob").await;
        let first = harness.submission(&alice, day(0)).await;
        let second = harness.submission(&bob, day(0)).await;

        harness
            .store
            .insert_screening_result(ScreeningResult {
                upload_id: first.upload.id,
                status: ScreeningStatus::Passed,
            })
            .await;
        harness
            .store
            .insert_screening_result(ScreeningResult {
                upload_id: second.upload.id,
                status: ScreeningStatus::Failed,
            })
            .await;
        assert!(!harness.can_perform(0, day(1)).await.unwrap());

        harness
            .store
            .insert_screening_result(ScreeningResult {
                upload_id: second.upload.id,
                status: ScreeningStatus::PassedWithWarning,
            })
            .await;
        assert!(harness.can_perform(0, day(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_manual_screening_counts_reviews_above_minimum() {
        let mut harness = submission_project();
        harness.project.phases[0] = harness.project.phases[0]
            .clone()
            .with_attribute(attributes::SUBMISSION_NUMBER, "1")
            .with_attribute(attributes::MANUAL_SCREENING, "Yes");
        harness.store.set_minimum_score(SCORECARD, 75.0).await;
        let alice = harness.resource(ResourceRole::Submitter, None, "alice").await;
        let submission = harness.submission(&alice, day(0)).await;
        let screener = harness.resource(ResourceRole::PrimaryScreener, Some(1), "sam").await;

        harness
            .review(
                Review::new(screener.id, Some(submission.id), Some(SCORECARD.to_string()))
                    .committed()
                    .with_score(60.0),
            )
            .await;
        assert!(!harness.can_perform(0, day(1)).await.unwrap());

        harness
            .review(
                Review::new(screener.id, Some(submission.id), Some(SCORECARD.to_string()))
                    .committed()
                    .with_score(80.0),
            )
            .await;
        assert!(harness.can_perform(0, day(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_submission_phase_inserts_post_mortem() {
        let mut harness = submission_project();
        harness.project.set_property(properties::POST_MORTEM_REQUIRED, "true");

        let transition = harness.perform(0, day(1)).await.unwrap();

        assert_eq!(transition.values.get(fields::N_SUBMITTERS).and_then(FieldValue::as_integer), Some(0));
        assert_eq!(harness.project.phases[1].phase_type, PhaseType::PostMortem);
        assert_eq!(harness.project.phases[1].attribute(attributes::REVIEWER_NUMBER), Some("5"));
        assert_eq!(harness.store.project().await.phases.len(), 4);
    }

    #[tokio::test]
    async fn test_post_mortem_skipped_when_not_required() {
        let mut harness = submission_project();
        harness.perform(0, day(1)).await.unwrap();
        assert_eq!(harness.project.phases.len(), 3);
    }

    #[tokio::test]
    async fn test_end_values_list_submitters() {
        let mut harness = submission_project();
        let alice = harness.resource(ResourceRole::Submitter, None, "alice").await;
        harness.submission(&alice, day(0)).await;

        let transition = harness.perform(0, day(1)).await.unwrap();
        let Some(FieldValue::List(entries)) = transition.values.get(fields::SUBMITTER) else {
            panic!("submitter list missing");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].get(fields::SUBMITTER_HANDLE).and_then(FieldValue::as_text),
            Some("alice")
        );
        assert_eq!(
            entries[0].get(fields::SUBMITTER_RATING).and_then(FieldValue::as_text),
            Some("N/A")
        );
        assert_eq!(harness.project.phases.len(), 3);
    }
}
