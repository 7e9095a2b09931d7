//! Post-Mortem phase.
//!
//! Opening the phase enrolls the project's submitters (those that submitted)
//! and reviewers as Post-Mortem Reviewers, unless they still have terms of use
//! to accept. The phase closes at its end time once enough post-mortem
//! scorecards are committed.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{info, warn};

use super::context::external_ids;
use super::{PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::phase::attributes;
use crate::domain::models::resource::{properties, REVIEWER_ROLES};
use crate::domain::models::{FieldBag, PhaseType, Resource, ResourceRole};

/// Format of the `Registration Date` property, e.g. `06.03.2024 09:00 AM`.
const REGISTRATION_DATE_FORMAT: &str = "%m.%d.%Y %I:%M %p";

pub struct PostMortemHandler;

impl PostMortemHandler {
    fn is_candidate(resource: &Resource) -> bool {
        match resource.role {
            ResourceRole::Submitter => !resource.submissions.is_empty(),
            _ => true,
        }
    }

    fn enrollment(ctx: &TransitionContext<'_>, candidate: &Resource, external_id: &str) -> Resource {
        let mut resource =
            Resource::new(ctx.project.id, ResourceRole::PostMortemReviewer).with_phase(ctx.phase_id);
        resource
            .properties
            .insert(properties::EXTERNAL_REFERENCE_ID.to_string(), external_id.to_string());
        for key in [properties::HANDLE, properties::EMAIL, properties::RATING] {
            if let Some(value) = candidate.property(key) {
                resource.properties.insert(key.to_string(), value.to_string());
            }
        }
        resource
            .properties
            .insert(properties::PAYMENT.to_string(), "0.00".to_string());
        resource
            .properties
            .insert(properties::PAYMENT_STATUS.to_string(), "No".to_string());
        resource.properties.insert(
            properties::REGISTRATION_DATE.to_string(),
            ctx.now.format(REGISTRATION_DATE_FORMAT).to_string(),
        );
        resource
    }

    /// Enroll eligible participants; returns how many were added.
    async fn enroll_reviewers(ctx: &TransitionContext<'_>) -> PhaseResult<usize> {
        let roles = ctx
            .managers
            .resources
            .all_roles()
            .await
            .context("Failed to add new Post-Mortem Reviewer resource")?;
        if !roles.contains(&ResourceRole::PostMortemReviewer) {
            return Err(PhaseHandlingError::MissingEntity(
                "resource role Post-Mortem Reviewer".to_string(),
            ));
        }

        let view = ctx.view()?;
        let mut enrolled: HashSet<String> =
            external_ids(&view.project_resources(&[ResourceRole::PostMortemReviewer]).await?);

        let mut candidate_roles = vec![ResourceRole::Submitter];
        candidate_roles.extend(REVIEWER_ROLES);
        let candidates = view.project_resources(&candidate_roles).await?;

        let mut added = 0;
        for candidate in candidates.iter().filter(|r| Self::is_candidate(r)) {
            let Some(external_id) = candidate.external_id() else {
                continue;
            };
            if enrolled.contains(external_id) {
                continue;
            }

            let pending = ctx
                .managers
                .terms
                .has_pending_terms(ctx.project.id, external_id)
                .await
                .context("Failed to add new Post-Mortem Reviewer resource")?;
            if pending {
                warn!(
                    project_id = %ctx.project.id,
                    handle = candidate.handle().unwrap_or("N/A"),
                    external_id,
                    "can not assign Post-Mortem Reviewer role, terms of use not accepted"
                );
                continue;
            }

            let resource = Self::enrollment(ctx, candidate, external_id);
            ctx.managers
                .resources
                .create_resource(&resource, ctx.operator)
                .await
                .context("Failed to add new Post-Mortem Reviewer resource")?;
            enrolled.insert(external_id.to_string());
            added += 1;
        }
        Ok(added)
    }
}

#[async_trait]
impl PhaseHandler for PostMortemHandler {
    fn phase_type(&self) -> PhaseType {
        PhaseType::PostMortem
    }

    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        if !ctx.reached_end_time()? {
            return Ok(false);
        }
        let Some(required) = ctx.phase.int_attribute(attributes::REVIEWER_NUMBER)? else {
            return Ok(true);
        };
        let reviews = ctx.project_reviews(&[ResourceRole::PostMortemReviewer]).await?;
        let committed = reviews.iter().filter(|r| r.committed).count() as i64;
        Ok(committed >= required)
    }

    async fn on_start(&self, ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        let added = Self::enroll_reviewers(ctx).await?;
        info!(project_id = %ctx.project.id, added, "enrolled post-mortem reviewers");

        let view = ctx.view()?;
        let reviewers = view
            .project_resources(&[ResourceRole::PostMortemReviewer])
            .await?
            .len() as i64;
        let required = view.int_attribute_or(attributes::REVIEWER_NUMBER, 0)?;
        Ok(FieldBag::new()
            .with(fields::N_REQUIRED_POST_MORTEM_REVIEWERS, required)
            .with(fields::N_POST_MORTEM_REVIEWERS, reviewers)
            .with(fields::NEED_POST_MORTEM_REVIEWERS, i64::from(required > reviewers)))
    }
}
