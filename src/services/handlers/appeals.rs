//! Appeals phase.
//!
//! Closes at its end time, or earlier once every submitter still in the
//! contest has agreed to finish appeals early.

use async_trait::async_trait;
use std::collections::HashSet;

use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::resource::properties;
use crate::domain::models::{FieldBag, FieldValue, PhaseType, ResourceRole, SubmissionType};
use crate::domain::ports::ResourceFilter;

const EARLY_COMPLETION_AGREED: &str = "Yes";

pub struct AppealsHandler;

impl AppealsHandler {
    async fn can_close_early(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        let filter = ResourceFilter {
            project_id: Some(ctx.project.id),
            roles: vec![ResourceRole::Submitter],
            property: Some((
                properties::APPEALS_COMPLETED_EARLY.to_string(),
                EARLY_COMPLETION_AGREED.to_string(),
            )),
            ..ResourceFilter::default()
        };
        let agreed: HashSet<_> = ctx
            .managers
            .resources
            .search_resources(&filter)
            .await
            .context("Problem when retrieving resource")?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let submissions = ctx.active_submissions(SubmissionType::Contest).await?;
        Ok(submissions.iter().all(|s| agreed.contains(&s.owner())))
    }
}

#[async_trait]
impl PhaseHandler for AppealsHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::Appeals
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        Ok(ctx.reached_end_time()? || self.can_close_early(ctx).await?)
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let submitters = ctx.view()?.initial_score_values(fields::SUBMITTER_SCORE).await?;
        Ok(FieldBag::new().with(fields::SUBMITTER, FieldValue::List(submitters)))
    }
}
