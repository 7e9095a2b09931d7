//! Final Fix phase.

use async_trait::async_trait;
use tracing::info;

use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::resource::REVIEWER_ROLES;
use crate::domain::models::review::FINAL_REVIEW_COMMENT_TYPES;
use crate::domain::models::{
    FieldBag, PhaseType, Resource, ResourceRole, Review, SubmissionType, Upload, UploadStatus, UploadType,
};
use crate::domain::ports::{SubmissionFilter, UploadFilter};
use crate::services::worksheets;

pub struct FinalFixHandler;

impl FinalFixHandler {
    /// The winner's active final-fix upload, if there is one.
    async fn final_fix_upload(ctx: &PhaseContext<'_>) -> PhaseResult<Option<Upload>> {
        let Some(winner) = ctx.winning_submitter().await? else {
            return Ok(None);
        };

        let filter = UploadFilter {
            project_id: Some(ctx.project.id),
            owner: Some(winner.id),
            upload_type: Some(UploadType::FinalFix),
            status: Some(UploadStatus::Active),
        };
        let mut uploads = ctx
            .managers
            .uploads
            .search_uploads(&filter)
            .await
            .context("Problem when retrieving upload")?;
        match uploads.len() {
            0 | 1 => Ok(uploads.pop()),
            _ => Err(PhaseHandlingError::DataIntegrity(
                "There cannot be multiple final fix uploads".to_string(),
            )),
        }
    }

    /// Seed a new final review worksheet from the aggregation worksheet, or
    /// from the winner's review scorecards when the project has no aggregation.
    async fn build_worksheet(ctx: &PhaseContext<'_>, final_reviewer: &Resource) -> PhaseResult<Review> {
        let mut worksheet = Review::new(final_reviewer.id, None, None);

        if let Some(aggregation) = ctx.locate(PhaseType::Aggregation, false, false)? {
            let source = ctx
                .single_worksheet(aggregation.id, ResourceRole::Aggregator)
                .await?
                .ok_or_else(|| PhaseHandlingError::MissingEntity("aggregation worksheet does not exist".to_string()))?;
            worksheet.comments = worksheets::copy_comments(&source, &FINAL_REVIEW_COMMENT_TYPES, None);
            worksheet.items = worksheets::copy_final_review_items(&source);
            worksheet.scorecard = source.scorecard;
            worksheet.submission = source.submission;
            return Ok(worksheet);
        }

        let review_phase = ctx.require(PhaseType::Review, false)?;
        let winner = ctx
            .winning_submitter()
            .await?
            .ok_or_else(|| PhaseHandlingError::MissingEntity(format!("winner for project {}", ctx.project.id)))?;
        let filter = SubmissionFilter {
            project_id: Some(ctx.project.id),
            submission_type: Some(SubmissionType::Contest),
            owner: Some(winner.id),
            ..SubmissionFilter::default()
        };
        let submissions = ctx
            .managers
            .uploads
            .search_submissions(&filter)
            .await
            .context("Problem when retrieving winning submission.")?;
        let [submission] = submissions.as_slice() else {
            return Err(PhaseHandlingError::MissingEntity(format!(
                "winning submission for project {}",
                ctx.project.id
            )));
        };

        let reviewers = ctx.phase_resources(review_phase.id, &REVIEWER_ROLES).await?;
        for review in ctx.reviews_by(&reviewers, Some(submission.id)).await? {
            worksheet.scorecard.clone_from(&review.scorecard);
            worksheet.submission = review.submission;
            worksheet
                .comments
                .extend(worksheets::copy_comments(&review, &FINAL_REVIEW_COMMENT_TYPES, None));
            worksheet
                .items
                .extend(worksheets::copy_review_items(&review, &FINAL_REVIEW_COMMENT_TYPES));
        }
        Ok(worksheet)
    }
}

#[async_trait]
impl PhaseHandler for FinalFixHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::FinalFix
    }

    async fn start_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let Some(final_review) = ctx.locate(PhaseType::FinalReview, true, false)? else {
            return Ok(false);
        };
        let final_reviewers = ctx
            .phase_resources(final_review.id, &[ResourceRole::FinalReviewer])
            .await?;
        Ok(final_reviewers.len() == 1)
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        Ok(Self::final_fix_upload(ctx).await?.is_some())
    }

    /// Prepare the final review worksheet and clear any stale final fix.
    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let view = ctx.view()?;
        let final_review = view.require(PhaseType::FinalReview, true)?;
        let final_reviewers = view
            .phase_resources(final_review.id, &[ResourceRole::FinalReviewer])
            .await?;
        let final_reviewer = final_reviewers.first().ok_or_else(|| {
            PhaseHandlingError::MissingEntity(format!("Final Reviewer for phase {}", final_review.id))
        })?;

        let previous = match view.locate(PhaseType::FinalReview, false, false)? {
            Some(phase) => view.single_worksheet(phase.id, ResourceRole::FinalReviewer).await?,
            None => None,
        };
        let worksheet = match &previous {
            Some(previous) => {
                let mut recycled = worksheets::duplicate(previous);
                recycled.author = final_reviewer.id;
                recycled.committed = false;
                recycled
            }
            None => Self::build_worksheet(&view, final_reviewer).await?,
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
            "created final review worksheet"
        );

        if let Some(mut upload) = Self::final_fix_upload(&view).await? {
            upload.status = UploadStatus::Deleted;
            view.managers
                .uploads
                .update_upload(&upload, ctx.operator)
                .await
                .context("Problem when persisting upload")?;
            info!(upload_id = %upload.id, "deleted previous final fix upload");
        }

        Ok(FieldBag::new())
    }
}
