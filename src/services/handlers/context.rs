//! Shared state and helpers for phase handlers.
//!
//! [`PhaseContext`] is the read-only view used by readiness checks;
//! [`TransitionContext`] owns the mutable project during `perform` and adds
//! the graph and persistence helpers rework cycles need.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::phase::attributes;
use crate::domain::models::project::properties as project_properties;
use crate::domain::models::resource::properties as resource_properties;
use crate::domain::models::{
    EngineConfig, FieldBag, FieldValue, Phase, PhaseStatus, PhaseType, Project, ProjectStatus, Resource,
    ResourceRole, Review, Submission, SubmissionStatus, SubmissionType,
};
use crate::domain::ports::{ResourceFilter, ReviewFilter, SubmissionFilter};
use crate::services::managers::Managers;
use crate::services::phase_graph::{locate_phase, PhaseGraphMutator, PhaseInsertion};

/// Read-only view of one phase inside its project.
pub struct PhaseContext<'a> {
    pub managers: &'a Managers,
    pub config: &'a EngineConfig,
    pub project: &'a Project,
    pub phase: &'a Phase,
    pub now: DateTime<Utc>,
}

impl<'a> PhaseContext<'a> {
    /// A phase without a computed start date may start at any time.
    pub fn reached_start_time(&self) -> PhaseResult<bool> {
        Ok(self
            .managers
            .calendar
            .start_date(self.project, self.phase)?
            .is_none_or(|start| self.now >= start))
    }

    pub fn reached_end_time(&self) -> PhaseResult<bool> {
        Ok(self
            .managers
            .calendar
            .end_date(self.project, self.phase)?
            .is_some_and(|end| self.now >= end))
    }

    /// Numeric phase attribute with a per-call-site default for absence.
    pub fn int_attribute_or(&self, key: &str, default: i64) -> PhaseResult<i64> {
        Ok(self.phase.int_attribute(key)?.unwrap_or(default))
    }

    pub fn locate(&self, phase_type: PhaseType, forward: bool, required: bool) -> PhaseResult<Option<&'a Phase>> {
        locate_phase(self.project, self.phase.id, phase_type, forward, required)
    }

    /// Like [`Self::locate`] with `required`, returning the phase directly.
    pub fn require(&self, phase_type: PhaseType, forward: bool) -> PhaseResult<&'a Phase> {
        self.locate(phase_type, forward, true)?
            .ok_or(PhaseHandlingError::PhaseTypeNotFound { phase_type })
    }

    pub async fn active_submissions(&self, submission_type: SubmissionType) -> PhaseResult<Vec<Submission>> {
        let submissions = self
            .managers
            .uploads
            .search_submissions(&SubmissionFilter::active(self.project.id, submission_type))
            .await
            .context("Problem when searching submissions")?;
        Ok(submissions.into_iter().filter(Submission::is_active).collect())
    }

    pub async fn phase_resources(&self, phase_id: Uuid, roles: &[ResourceRole]) -> PhaseResult<Vec<Resource>> {
        self.managers
            .resources
            .search_resources(&ResourceFilter::on_phase(phase_id, roles))
            .await
            .context("Problem when retrieving resources for phase")
    }

    pub async fn project_resources(&self, roles: &[ResourceRole]) -> PhaseResult<Vec<Resource>> {
        self.managers
            .resources
            .search_resources(&ResourceFilter::on_project(self.project.id, roles))
            .await
            .context("Problem when retrieving resources for project")
    }

    pub async fn resource(&self, id: Uuid) -> PhaseResult<Resource> {
        self.managers
            .resources
            .get_resource(id)
            .await
            .context("Problem when looking up resource")?
            .ok_or_else(|| PhaseHandlingError::MissingEntity(format!("resource {id}")))
    }

    /// Reviews authored by any of `reviewers`, oldest first.
    pub async fn reviews_by(&self, reviewers: &[Resource], submission: Option<Uuid>) -> PhaseResult<Vec<Review>> {
        if reviewers.is_empty() {
            return Ok(Vec::new());
        }

        let mut filter = ReviewFilter::by_reviewers(reviewers.iter().map(|r| r.id));
        filter.submission = submission;
        let mut reviews = self
            .managers
            .reviews
            .search_reviews(&filter)
            .await
            .context("Problem with review retrieval")?;
        reviews.sort_by_key(|r| r.created_at);
        Ok(reviews)
    }

    /// Reviews by resources holding `roles` on the given phase.
    pub async fn phase_reviews(&self, phase_id: Uuid, roles: &[ResourceRole]) -> PhaseResult<Vec<Review>> {
        let reviewers = self.phase_resources(phase_id, roles).await?;
        self.reviews_by(&reviewers, None).await
    }

    /// Reviews by resources holding `roles` anywhere on the project.
    pub async fn project_reviews(&self, roles: &[ResourceRole]) -> PhaseResult<Vec<Review>> {
        let reviewers = self.project_resources(roles).await?;
        self.reviews_by(&reviewers, None).await
    }

    /// The one worksheet written by the `role` resource of a phase, if any.
    /// More than one is a data error.
    pub async fn single_worksheet(&self, phase_id: Uuid, role: ResourceRole) -> PhaseResult<Option<Review>> {
        let mut reviews = self.phase_reviews(phase_id, &[role]).await?;
        match reviews.len() {
            0 => Ok(None),
            1 => Ok(reviews.pop()),
            n => Err(PhaseHandlingError::DataIntegrity(format!(
                "Cannot have multiple {role} worksheets on phase {phase_id} (found {n})"
            ))),
        }
    }

    pub async fn minimum_score(&self, review: &Review) -> PhaseResult<f64> {
        let scorecard = review.scorecard.as_deref().ok_or_else(|| {
            PhaseHandlingError::MissingEntity(format!("scorecard for review {}", review.id))
        })?;
        self.managers
            .scorecards
            .minimum_score(scorecard)
            .await
            .context("Problem with scorecard retrieval")
    }

    /// The Submitter whose external id is recorded as the project winner.
    pub async fn winning_submitter(&self) -> PhaseResult<Option<Resource>> {
        let Some(winner_id) = self.project.property(project_properties::WINNER_EXTERNAL_REFERENCE_ID) else {
            return Ok(None);
        };

        let filter = ResourceFilter {
            project_id: Some(self.project.id),
            roles: vec![ResourceRole::Submitter],
            external_id: Some(winner_id.to_string()),
            ..ResourceFilter::default()
        };
        let submitters = self
            .managers
            .resources
            .search_resources(&filter)
            .await
            .context("Problem when retrieving resource")?;
        Ok(submitters.into_iter().next())
    }

    /// The winner's submission, which must hold placement 1.
    pub async fn winning_submission(&self, winner: &Resource) -> PhaseResult<Submission> {
        let filter = SubmissionFilter {
            project_id: Some(self.project.id),
            submission_type: Some(SubmissionType::Contest),
            owner: Some(winner.id),
            ..SubmissionFilter::default()
        };
        let submissions = self
            .managers
            .uploads
            .search_submissions(&filter)
            .await
            .context("Problem when searching submissions")?;

        submissions
            .into_iter()
            .find(|s| s.placement == Some(1))
            .ok_or_else(|| {
                PhaseHandlingError::MissingEntity(format!(
                    "winning submission for project {} (winner does not have placement 1)",
                    self.project.id
                ))
            })
    }

    /// Parents linked without overlap must be completed, or active with every phase closed.
    pub async fn parent_projects_completed(&self) -> PhaseResult<bool> {
        let links = self
            .managers
            .projects
            .parent_links(self.project.id)
            .await
            .context("Problem when retrieving parent project links")?;

        for link in links.iter().filter(|l| !l.allow_overlap) {
            let parent = self
                .managers
                .projects
                .get_project(link.parent_id)
                .await
                .context("Problem when retrieving parent project")?
                .ok_or_else(|| PhaseHandlingError::MissingEntity(format!("parent project {}", link.parent_id)))?;

            match parent.status {
                ProjectStatus::Completed => {}
                ProjectStatus::Active => {
                    if parent.phases.iter().any(|p| p.status != PhaseStatus::Closed) {
                        debug!(parent_id = %parent.id, "parent project still has open phases");
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }
        }

        Ok(true)
    }

    /// Handle and initial review score of every active contest submission,
    /// with the score stored under `score_key`.
    pub async fn initial_score_values(&self, score_key: &str) -> PhaseResult<Vec<FieldBag>> {
        let submissions = self.active_submissions(SubmissionType::Contest).await?;
        let mut values = Vec::with_capacity(submissions.len());
        for submission in &submissions {
            let submitter = self.resource(submission.owner()).await?;
            values.push(
                FieldBag::new()
                    .with(fields::SUBMITTER_HANDLE, FieldValue::text_or_na(submitter.handle()))
                    .with(
                        score_key,
                        submission
                            .initial_score
                            .map_or_else(|| FieldValue::text_or_na(None), FieldValue::Decimal),
                    ),
            );
        }
        Ok(values)
    }

    /// Per-submission `SUBMITTER` entries: reliability and rating, or the
    /// screening score and result at the end of screening.
    pub async fn submitter_values(&self, submissions: &[Submission], screening_end: bool) -> PhaseResult<Vec<FieldBag>> {
        let mut values = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let submitter = self.resource(submission.owner()).await?;
            let mut entry = FieldBag::new()
                .with(fields::SUBMITTER_HANDLE, FieldValue::text_or_na(submitter.handle()));

            if screening_end {
                entry.insert(
                    fields::SUBMITTER_SCORE,
                    submission
                        .screening_score
                        .map_or_else(|| FieldValue::text_or_na(None), FieldValue::Decimal),
                );
                let result = if submission.status == SubmissionStatus::FailedScreening {
                    "Failed Screening"
                } else {
                    "Pass Screening"
                };
                entry.insert(fields::SUBMITTER_RESULT, result);
            } else {
                entry.insert(
                    fields::SUBMITTER_RELIABILITY,
                    FieldValue::text_or_na(submitter.property(resource_properties::RELIABILITY)),
                );
                entry.insert(
                    fields::SUBMITTER_RATING,
                    FieldValue::text_or_na(submitter.property(resource_properties::RATING)),
                );
            }
            values.push(entry);
        }
        Ok(values)
    }
}

/// Mutable state of one `perform` call.
pub struct TransitionContext<'a> {
    pub managers: &'a Managers,
    pub config: &'a EngineConfig,
    pub graph: &'a PhaseGraphMutator,
    pub project: &'a mut Project,
    pub phase_id: Uuid,
    pub operator: &'a str,
    pub now: DateTime<Utc>,
}

impl TransitionContext<'_> {
    pub fn phase(&self) -> PhaseResult<&Phase> {
        self.project
            .phase(self.phase_id)
            .ok_or(PhaseHandlingError::PhaseNotFound(self.phase_id))
    }

    /// Read-only view for the shared query helpers.
    pub fn view(&self) -> PhaseResult<PhaseContext<'_>> {
        Ok(PhaseContext {
            managers: self.managers,
            config: self.config,
            project: &*self.project,
            phase: self.phase()?,
            now: self.now,
        })
    }

    pub fn phase_id_at(&self, index: usize) -> PhaseResult<Uuid> {
        self.project
            .phases
            .get(index)
            .map(|p| p.id)
            .ok_or_else(|| PhaseHandlingError::DataIntegrity(format!("no phase at index {index}")))
    }

    pub async fn persist_phases(&self) -> PhaseResult<()> {
        self.managers
            .phases
            .update_phases(&*self.project, self.operator)
            .await
            .context("Problem when persisting phases")
    }

    /// Splice phases after the current one and persist the whole phase set.
    pub async fn splice(&mut self, new_types: &[PhaseType], rewire: bool, copy_attributes: bool) -> PhaseResult<usize> {
        let mut insertion = PhaseInsertion::after(self.phase_id, new_types.iter().copied());
        insertion.rewire_following = rewire;
        insertion.copy_anchor_attributes = copy_attributes;

        let index = self.graph.insert_phases(self.project, &insertion)?;
        self.persist_phases().await?;
        Ok(index)
    }

    pub async fn update_project_properties(&self, reason: &str) -> PhaseResult<()> {
        self.managers
            .projects
            .update_properties(self.project.id, &self.project.properties, reason, self.operator)
            .await
            .context("Problem when updating project")
    }

    /// Assign a fresh copy of the `role` resource of `old_phase` to `new_phase`.
    ///
    /// Payment is not carried over and the payment status is reset to `N/A`.
    pub async fn create_rework_resource(
        &self,
        old_phase: Uuid,
        role: ResourceRole,
        new_phase: Uuid,
    ) -> PhaseResult<Resource> {
        let view = self.view()?;
        let previous = view
            .phase_resources(old_phase, &[role])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PhaseHandlingError::MissingEntity(format!("unable to find resource for role - {role}")))?;

        let mut resource = Resource::new(previous.project_id, role).with_phase(new_phase);
        resource.submissions.clone_from(&previous.submissions);
        resource.properties = previous
            .properties
            .iter()
            .filter(|(key, _)| key.as_str() != resource_properties::PAYMENT)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        resource
            .properties
            .insert(resource_properties::PAYMENT_STATUS.to_string(), "N/A".to_string());

        self.managers
            .resources
            .create_resource(&resource, self.operator)
            .await
            .context(format!("Problem when persisting resource with role: {role}"))?;

        info!(resource_id = %resource.id, %role, phase_id = %new_phase, "assigned rework resource");
        Ok(resource)
    }

    /// Insert a Post-Mortem phase after the current one when the project asks
    /// for it and has none yet. Returns whether a phase was inserted.
    pub async fn insert_post_mortem(&mut self) -> PhaseResult<bool> {
        if self.project.has_phase_of_type(PhaseType::PostMortem)
            || !self.project.property_is_true(project_properties::POST_MORTEM_REQUIRED)
        {
            return Ok(false);
        }

        let settings = self.config.post_mortem.clone();
        let insertion = PhaseInsertion::after(self.phase_id, [PhaseType::PostMortem]);
        let index = self
            .graph
            .insert_phases_with_lengths(self.project, &insertion, &[settings.duration_ms()])?;

        if let Some(phase) = self.project.phases.get_mut(index + 1) {
            phase
                .attributes
                .insert(attributes::REVIEWER_NUMBER.to_string(), settings.reviewer_number.to_string());
            phase
                .attributes
                .insert(attributes::SCORECARD_ID.to_string(), settings.scorecard_id.clone());
        }
        self.persist_phases().await?;
        info!(project_id = %self.project.id, "inserted Post-Mortem phase");
        Ok(true)
    }

    /// Insert an Approval phase after the current one, inheriting the settings
    /// of the latest earlier Approval phase when there is one.
    pub async fn insert_approval(&mut self) -> PhaseResult<()> {
        let previous = locate_phase(&*self.project, self.phase_id, PhaseType::Approval, false, false)?
            .map(|p| p.attributes.clone());

        let settings = self.config.approval.clone();
        let insertion = PhaseInsertion::after(self.phase_id, [PhaseType::Approval]);
        let index = self
            .graph
            .insert_phases_with_lengths(self.project, &insertion, &[settings.duration_ms()])?;

        let (reviewer_number, scorecard_id) = match &previous {
            Some(attrs) => (
                attrs.get(attributes::REVIEWER_NUMBER).cloned(),
                attrs.get(attributes::SCORECARD_ID).cloned(),
            ),
            None => (
                Some(settings.reviewer_number.to_string()),
                Some(settings.scorecard_id.clone()),
            ),
        };

        if let Some(phase) = self.project.phases.get_mut(index + 1) {
            if let Some(number) = reviewer_number {
                phase.attributes.insert(attributes::REVIEWER_NUMBER.to_string(), number);
            }
            if let Some(scorecard) = scorecard_id {
                phase.attributes.insert(attributes::SCORECARD_ID.to_string(), scorecard);
            }
        }
        self.persist_phases().await?;
        info!(project_id = %self.project.id, "inserted Approval phase");
        Ok(())
    }
}

/// External ids of a set of resources, skipping resources without one.
pub fn external_ids(resources: &[Resource]) -> HashSet<String> {
    resources
        .iter()
        .filter_map(|r| r.external_id().map(str::to_string))
        .collect()
}
