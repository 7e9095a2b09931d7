//! `advance` command: drive every ready phase forward.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

use super::Workspace;
use crate::cli::output::{colorize_status, list_table, CommandOutput};
use crate::domain::errors::PhaseHandlingError;
use crate::domain::models::{FieldBag, PhaseOperation, PhaseStatus, PhaseType};
use crate::services::Transition;

/// Upper bound on sweeps over the phase list; each sweep must move at least one phase.
const MAX_SWEEPS: usize = 64;

#[derive(Debug, Serialize)]
pub struct AdvancedPhase {
    pub phase_id: Uuid,
    pub phase_type: PhaseType,
    pub operation: PhaseOperation,
    pub status: PhaseStatus,
    pub notified: usize,
    pub values: FieldBag,
}

#[derive(Debug, Serialize)]
pub struct AdvanceOutput {
    pub project_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub advanced: Vec<AdvancedPhase>,
    pub written: bool,
}

impl CommandOutput for AdvanceOutput {
    fn to_human(&self) -> String {
        if self.advanced.is_empty() {
            return "No phase is ready to transition.".to_string();
        }
        let mut table = list_table(&["phase", "operation", "now", "notified"]);
        for phase in &self.advanced {
            table.add_row(vec![
                Cell::new(phase.phase_type),
                Cell::new(phase.operation.as_str()),
                Cell::new(colorize_status(phase.status)),
                Cell::new(phase.notified),
            ]);
        }
        let mut rendered = format!("{} transition(s):\n{table}", self.advanced.len());
        if self.written {
            rendered.push_str("\nSnapshot updated.");
        }
        rendered
    }
}

/// Open or close phases until none is ready, persisting each status change.
///
/// Phases whose type has no handler are skipped. Any other handling failure
/// aborts the run; transitions already made stay in the workspace.
pub async fn execute(workspace: &mut Workspace, operator: &str, now: DateTime<Utc>) -> Result<AdvanceOutput> {
    let mut advanced = Vec::new();
    let mut unhandled: HashSet<PhaseType> = HashSet::new();

    for _ in 0..MAX_SWEEPS {
        let pending: Vec<Uuid> = workspace
            .project
            .phases
            .iter()
            .filter(|p| p.status != PhaseStatus::Closed)
            .map(|p| p.id)
            .collect();

        let mut moved = false;
        for phase_id in pending {
            let ready = match workspace.engine.can_perform_at(&workspace.project, phase_id, now).await {
                Ok(ready) => ready,
                Err(PhaseHandlingError::NoHandler(phase_type)) => {
                    if unhandled.insert(phase_type) {
                        warn!(%phase_type, "no handler registered, skipping phase");
                    }
                    continue;
                }
                Err(err) => return Err(err).with_context(|| format!("Failed to check phase {phase_id}")),
            };
            if !ready {
                continue;
            }

            let transition = workspace
                .engine
                .perform_at(&mut workspace.project, phase_id, operator, now)
                .await
                .with_context(|| format!("Failed to transition phase {phase_id}"))?;

            let status = commit(workspace, phase_id, &transition, operator).await?;
            info!(%phase_id, phase_type = %transition.phase_type, status = %status, "phase advanced");
            advanced.push(AdvancedPhase {
                phase_id,
                phase_type: transition.phase_type,
                operation: transition.operation,
                status,
                notified: transition.notified,
                values: transition.values,
            });
            moved = true;
        }

        if !moved {
            break;
        }
    }

    Ok(AdvanceOutput {
        project_id: workspace.project.id,
        evaluated_at: now,
        advanced,
        written: false,
    })
}

/// Flip the phase status for a completed transition and persist the phase set.
pub(super) async fn commit(
    workspace: &mut Workspace,
    phase_id: Uuid,
    transition: &Transition,
    operator: &str,
) -> Result<PhaseStatus> {
    let status = match transition.operation {
        PhaseOperation::Start => PhaseStatus::Open,
        PhaseOperation::End => PhaseStatus::Closed,
    };
    if let Some(phase) = workspace.project.phase_mut(phase_id) {
        phase.status = status;
    }
    workspace
        .engine
        .managers()
        .phases
        .update_phases(&workspace.project, operator)
        .await
        .context("Failed to persist phase status")?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::WorkflowSnapshot;
    use crate::domain::models::{Dependency, EngineConfig, Phase, Project};
    use chrono::TimeZone;

    const HOUR_MS: i64 = 3_600_000;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap()
    }

    fn workspace(phases: Vec<Phase>) -> Workspace {
        let mut project = Project::new();
        project.phases = phases;
        Workspace::from_snapshot(
            WorkflowSnapshot {
                project,
                ..WorkflowSnapshot::default()
            },
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_advance_opens_ready_phases_and_persists() {
        let submission = Phase::new(PhaseType::Submission, HOUR_MS).with_schedule(at(9), at(10));
        let review = Phase::new(PhaseType::Review, HOUR_MS)
            .with_schedule(at(10), at(11))
            .with_dependency(Dependency::finish_to_start(submission.id));
        let mut workspace = workspace(vec![submission, review]);

        let output = execute(&mut workspace, "ops", at(9)).await.unwrap();

        assert_eq!(output.advanced.len(), 1);
        assert_eq!(output.advanced[0].phase_type, PhaseType::Submission);
        assert_eq!(output.advanced[0].operation, PhaseOperation::Start);
        assert_eq!(workspace.project.phases[0].status, PhaseStatus::Open);
        assert_eq!(workspace.project.phases[1].status, PhaseStatus::Scheduled);

        let stored = workspace.store.project().await;
        assert_eq!(stored.phases[0].status, PhaseStatus::Open);
    }

    #[tokio::test]
    async fn test_advance_skips_phases_without_handler() {
        let registration = Phase::new(PhaseType::Registration, HOUR_MS).with_schedule(at(8), at(9));
        let mut workspace = workspace(vec![registration]);

        let output = execute(&mut workspace, "ops", at(9)).await.unwrap();
        assert!(output.advanced.is_empty());
        assert_eq!(output.to_human(), "No phase is ready to transition.");
    }

    #[tokio::test]
    async fn test_advance_rejects_blank_operator() {
        let submission = Phase::new(PhaseType::Submission, HOUR_MS).with_schedule(at(9), at(10));
        let mut workspace = workspace(vec![submission]);

        let err = execute(&mut workspace, " ", at(9)).await.unwrap_err();
        assert!(err.chain().any(|cause| cause.to_string().contains("Operator")));
        assert_eq!(workspace.project.phases[0].status, PhaseStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_advanced_snapshot_round_trips_through_file() {
        let submission = Phase::new(PhaseType::Submission, HOUR_MS).with_schedule(at(9), at(10));
        let mut workspace = workspace(vec![submission]);
        execute(&mut workspace, "ops", at(9)).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.yaml");
        workspace.save(&path).await.unwrap();

        let reloaded = WorkflowSnapshot::load(&path).unwrap();
        assert_eq!(reloaded.project.phases[0].status, PhaseStatus::Open);
    }
}
