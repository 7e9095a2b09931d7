//! Timeline notification dispatch.
//!
//! Email options are configured per role through schemes. When several schemes
//! name the same role, the one with the higher priority wins. Each subscribed
//! user gets at most one message per transition, chosen through the role that
//! carries the best options among the user's assignments.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{PhaseResult, StoreResultExt};
use crate::domain::models::notification::fields;
use crate::domain::models::project::properties as project_properties;
use crate::domain::models::resource::properties as resource_properties;
use crate::domain::models::{
    EmailOptions, FieldBag, FieldValue, NotificationConfig, Phase, PhaseOperation, Project, Resource,
    ResourceRole,
};
use crate::domain::ports::{Notification, Notifier, ResourceFilter, ResourceStore};

/// Wildcard role name in a scheme.
pub const ALL_ROLES: &str = "*";

pub struct NotificationDispatcher {
    config: NotificationConfig,
    resources: Arc<dyn ResourceStore>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(config: NotificationConfig, resources: Arc<dyn ResourceStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            resources,
            notifier,
        }
    }

    /// Resolve the email options of every configured role for one operation.
    ///
    /// A failing all-roles lookup for `"*"` degrades to no roles.
    pub async fn role_options(&self, operation: PhaseOperation) -> HashMap<ResourceRole, EmailOptions> {
        let mut resolved: HashMap<ResourceRole, EmailOptions> = HashMap::new();
        let mut all_roles: Option<Vec<ResourceRole>> = None;

        for scheme in &self.config.schemes {
            let options = match operation {
                PhaseOperation::Start => scheme.start.as_ref(),
                PhaseOperation::End => scheme.end.as_ref(),
            };
            let Some(options) = options else {
                continue;
            };

            let mut roles = Vec::new();
            for name in &scheme.roles {
                if name.trim() == ALL_ROLES {
                    if all_roles.is_none() {
                        all_roles = Some(self.resources.all_roles().await.unwrap_or_else(|err| {
                            warn!(error = %err, scheme = %scheme.name, "could not look up all resource roles");
                            Vec::new()
                        }));
                    }
                    roles.extend(all_roles.iter().flatten().copied());
                } else if let Some(role) = ResourceRole::from_str(name) {
                    roles.push(role);
                } else {
                    warn!(role = %name, scheme = %scheme.name, "unknown role in notification scheme");
                }
            }

            for role in roles {
                let replace = resolved
                    .get(&role)
                    .is_none_or(|current| options.priority > current.priority);
                if replace {
                    resolved.insert(role, options.clone());
                }
            }
        }

        resolved
    }

    /// Notify every subscribed participant of a phase transition.
    ///
    /// Returns the number of notifications handed to the sink.
    pub async fn dispatch(
        &self,
        project: &Project,
        phase: &Phase,
        operation: PhaseOperation,
        values: &FieldBag,
    ) -> PhaseResult<usize> {
        if phase.length_ms <= 0 {
            debug!(phase_id = %phase.id, "skipping notification for zero-length phase");
            return Ok(0);
        }
        if let (Some(start), Some(end)) = (phase.scheduled_start, phase.scheduled_end) {
            if start >= end {
                debug!(phase_id = %phase.id, "skipping notification for phase without duration");
                return Ok(0);
            }
        }

        let role_options = self.role_options(operation).await;
        if role_options.is_empty() {
            return Ok(0);
        }

        let subscribers: HashSet<String> = self
            .resources
            .timeline_subscribers(project.id)
            .await
            .context("Problem when retrieving notification subscribers")?
            .into_iter()
            .collect();
        let resources = self
            .resources
            .search_resources(&ResourceFilter {
                project_id: Some(project.id),
                ..ResourceFilter::default()
            })
            .await
            .context("Problem when retrieving resources for notification")?;

        // one resource per user, through the role with the highest-priority options
        let mut recipients: HashMap<String, (&Resource, &EmailOptions)> = HashMap::new();
        for resource in &resources {
            let Some(external_id) = resource.external_id() else {
                continue;
            };
            if !subscribers.contains(external_id) {
                continue;
            }
            let Some(options) = role_options.get(&resource.role) else {
                continue;
            };
            let better = recipients
                .get(external_id)
                .is_none_or(|(_, current)| options.priority > current.priority);
            if better {
                recipients.insert(external_id.to_string(), (resource, options));
            }
        }

        let mut sent = 0;
        for (external_id, (resource, options)) in recipients {
            if !options.send {
                continue;
            }

            let mut bag = self.standard_fields(project, phase, operation, resource);
            bag.extend(values.clone());

            let notification = Notification {
                project_id: project.id,
                phase_id: phase.id,
                phase_type: phase.phase_type,
                operation,
                recipient_external_id: external_id,
                recipient_email: resource.property(resource_properties::EMAIL).map(str::to_string),
                template_name: options.template_name.clone(),
                template_source: options.template_source.clone(),
                subject: options.subject.clone(),
                from: options.from.clone(),
                fields: bag,
            };
            self.notifier
                .notify(&notification)
                .await
                .context("Problem when sending notification")?;
            sent += 1;
        }

        debug!(phase_id = %phase.id, operation = operation.as_str(), sent, "dispatched phase notifications");
        Ok(sent)
    }

    fn standard_fields(&self, project: &Project, phase: &Phase, operation: PhaseOperation, user: &Resource) -> FieldBag {
        let timestamp = match operation {
            PhaseOperation::Start => phase.scheduled_start,
            PhaseOperation::End => phase.scheduled_end,
        }
        .map(|t| t.format(&self.config.timestamp_format).to_string());

        FieldBag::new()
            .with(fields::PHASE_TIMESTAMP, FieldValue::text_or_na(timestamp.as_deref()))
            .with(
                fields::USER_FIRST_NAME,
                FieldValue::text_or_na(user.property(resource_properties::FIRST_NAME)),
            )
            .with(
                fields::USER_LAST_NAME,
                FieldValue::text_or_na(user.property(resource_properties::LAST_NAME)),
            )
            .with(fields::USER_HANDLE, FieldValue::text_or_na(user.handle()))
            .with(
                fields::PROJECT_NAME,
                FieldValue::text_or_na(project.property(project_properties::PROJECT_NAME)),
            )
            .with(
                fields::PROJECT_VERSION,
                FieldValue::text_or_na(project.property(project_properties::PROJECT_VERSION)),
            )
            .with(
                fields::PROJECT_CATEGORY,
                FieldValue::text_or_na(project.property(project_properties::PROJECT_CATEGORY)),
            )
            .with(fields::PHASE_OPERATION, operation.as_str())
            .with(fields::PHASE_TYPE, phase.phase_type.as_str())
            .with(
                fields::OR_LINK,
                format!("{}{}", self.config.project_details_url, project.id),
            )
    }
}
