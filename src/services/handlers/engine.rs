//! Phase engine: handler registry plus the shared lifecycle driver.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{builtin_handlers, PhaseContext, PhaseHandler, TransitionContext};
use crate::domain::errors::{PhaseHandlingError, PhaseResult, StoreResultExt};
use crate::domain::models::{EngineConfig, FieldBag, Phase, PhaseOperation, PhaseStatus, PhaseType, Project};
use crate::services::dependency_evaluator::DependencyEvaluator;
use crate::services::managers::Managers;
use crate::services::notification::NotificationDispatcher;
use crate::services::phase_graph::PhaseGraphMutator;

/// What one `perform` call did.
#[derive(Debug, Clone)]
pub struct Transition {
    pub phase_id: Uuid,
    pub phase_type: PhaseType,
    pub operation: PhaseOperation,
    /// Type-specific notification fields.
    pub values: FieldBag,
    /// Number of notifications handed to the sink.
    pub notified: usize,
}

/// Dispatches lifecycle checks and transitions to the handler of each phase type.
pub struct PhaseEngine {
    managers: Managers,
    config: EngineConfig,
    graph: PhaseGraphMutator,
    evaluator: DependencyEvaluator,
    notifications: NotificationDispatcher,
    handlers: HashMap<PhaseType, Arc<dyn PhaseHandler>>,
}

impl PhaseEngine {
    /// Engine with every built-in handler registered.
    pub fn new(managers: Managers, config: EngineConfig) -> Self {
        let graph = PhaseGraphMutator::new(managers.calendar.clone())
            .with_fallback_durations(config.fallback_durations_ms());
        let notifications = NotificationDispatcher::new(
            config.notifications.clone(),
            managers.resources.clone(),
            managers.notifier.clone(),
        );

        let mut engine = Self {
            managers,
            config,
            graph,
            evaluator: DependencyEvaluator::new(),
            notifications,
            handlers: HashMap::new(),
        };
        for handler in builtin_handlers() {
            engine.register(handler);
        }
        engine
    }

    /// Register a handler, replacing any previous one for the same type.
    pub fn register(&mut self, handler: Arc<dyn PhaseHandler>) {
        let phase_type = handler.phase_type();
        if self.handlers.insert(phase_type, handler).is_some() {
            debug!(%phase_type, "replaced phase handler");
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn managers(&self) -> &Managers {
        &self.managers
    }

    pub fn handler(&self, phase_type: PhaseType) -> PhaseResult<&Arc<dyn PhaseHandler>> {
        self.handlers
            .get(&phase_type)
            .ok_or(PhaseHandlingError::NoHandler(phase_type))
    }

    /// Phase types known to the phase store that have no registered handler.
    pub async fn unsupported_store_types(&self) -> PhaseResult<Vec<PhaseType>> {
        let types = self
            .managers
            .phases
            .all_phase_types()
            .await
            .context("Problem when retrieving phase types")?;
        Ok(types
            .into_iter()
            .filter(|t| !self.handlers.contains_key(t))
            .collect())
    }

    pub async fn can_perform(&self, project: &Project, phase_id: Uuid) -> PhaseResult<bool> {
        self.can_perform_at(project, phase_id, Utc::now()).await
    }

    /// Whether the phase may open (when `Scheduled`) or close (when `Open`) at `now`.
    pub async fn can_perform_at(&self, project: &Project, phase_id: Uuid, now: DateTime<Utc>) -> PhaseResult<bool> {
        self.check(project, phase_id, None, now).await
    }

    /// Like [`Self::can_perform_at`], for a caller that only handles `expected` phases.
    pub async fn can_perform_as(
        &self,
        expected: PhaseType,
        project: &Project,
        phase_id: Uuid,
        now: DateTime<Utc>,
    ) -> PhaseResult<bool> {
        self.check(project, phase_id, Some(expected), now).await
    }

    #[instrument(skip(self, project), fields(project_id = %project.id))]
    async fn check(
        &self,
        project: &Project,
        phase_id: Uuid,
        expected: Option<PhaseType>,
        now: DateTime<Utc>,
    ) -> PhaseResult<bool> {
        let phase = project.phase(phase_id).ok_or(PhaseHandlingError::PhaseNotFound(phase_id))?;
        check_type(phase, expected)?;
        let handler = self.handler(phase.phase_type)?;
        let ctx = PhaseContext {
            managers: &self.managers,
            config: &self.config,
            project,
            phase,
            now,
        };

        match phase.status {
            PhaseStatus::Closed => Err(PhaseHandlingError::InvalidPhaseStatus {
                phase_id,
                status: phase.status,
            }),
            PhaseStatus::Scheduled => {
                if !self.evaluator.dependencies_satisfied(project, phase, true) {
                    debug!(%phase_id, "start dependencies not met");
                    return Ok(false);
                }
                if !ctx.reached_start_time()? {
                    debug!(%phase_id, "start time not reached");
                    return Ok(false);
                }
                handler.start_ready(&ctx).await
            }
            PhaseStatus::Open => {
                if !self.evaluator.dependencies_satisfied(project, phase, false) {
                    debug!(%phase_id, "end dependencies not met");
                    return Ok(false);
                }
                handler.end_ready(&ctx).await
            }
        }
    }

    pub async fn perform(&self, project: &mut Project, phase_id: Uuid, operator: &str) -> PhaseResult<Transition> {
        self.perform_at(project, phase_id, operator, Utc::now()).await
    }

    /// Run the start or end side effects of the phase and notify subscribers.
    ///
    /// The phase status itself is left to the caller.
    pub async fn perform_at(
        &self,
        project: &mut Project,
        phase_id: Uuid,
        operator: &str,
        now: DateTime<Utc>,
    ) -> PhaseResult<Transition> {
        self.transition(project, phase_id, None, operator, now).await
    }

    /// Like [`Self::perform_at`], for a caller that only handles `expected` phases.
    pub async fn perform_as(
        &self,
        expected: PhaseType,
        project: &mut Project,
        phase_id: Uuid,
        operator: &str,
        now: DateTime<Utc>,
    ) -> PhaseResult<Transition> {
        self.transition(project, phase_id, Some(expected), operator, now).await
    }

    #[instrument(skip(self, project), fields(project_id = %project.id))]
    async fn transition(
        &self,
        project: &mut Project,
        phase_id: Uuid,
        expected: Option<PhaseType>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> PhaseResult<Transition> {
        if operator.trim().is_empty() {
            return Err(PhaseHandlingError::EmptyOperator);
        }

        let phase = project.phase(phase_id).ok_or(PhaseHandlingError::PhaseNotFound(phase_id))?;
        check_type(phase, expected)?;
        let (phase_type, status) = (phase.phase_type, phase.status);
        let handler = self.handler(phase_type)?.clone();

        let operation = match status {
            PhaseStatus::Scheduled => PhaseOperation::Start,
            PhaseStatus::Open => PhaseOperation::End,
            PhaseStatus::Closed => {
                return Err(PhaseHandlingError::InvalidPhaseStatus { phase_id, status });
            }
        };

        let values = {
            let mut ctx = TransitionContext {
                managers: &self.managers,
                config: &self.config,
                graph: &self.graph,
                project: &mut *project,
                phase_id,
                operator,
                now,
            };
            match operation {
                PhaseOperation::Start => handler.on_start(&mut ctx).await?,
                PhaseOperation::End => handler.on_end(&mut ctx).await?,
            }
        };

        let phase = project.phase(phase_id).ok_or(PhaseHandlingError::PhaseNotFound(phase_id))?;
        let notified = self
            .notifications
            .dispatch(project, phase, operation, &values)
            .await?;

        info!(
            project_id = %project.id,
            %phase_id,
            %phase_type,
            operation = operation.as_str(),
            operator,
            "performed phase transition"
        );

        Ok(Transition {
            phase_id,
            phase_type,
            operation,
            values,
            notified,
        })
    }
}

/// Rejects a phase whose type differs from the one the caller handles.
fn check_type(phase: &Phase, expected: Option<PhaseType>) -> PhaseResult<()> {
    match expected {
        Some(expected) if expected != phase.phase_type => Err(PhaseHandlingError::PhaseNotSupported {
            expected,
            actual: phase.phase_type,
        }),
        _ => Ok(()),
    }
}
