//! `perform` command: transition one phase of a known type.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::advance::{commit, AdvancedPhase};
use super::Workspace;
use crate::cli::output::{colorize_status, CommandOutput};
use crate::domain::models::PhaseType;

#[derive(Debug, Serialize)]
pub struct PerformOutput {
    pub project_id: Uuid,
    pub phase_id: Uuid,
    pub phase_type: PhaseType,
    pub evaluated_at: DateTime<Utc>,
    /// `None` when the phase was not ready.
    pub performed: Option<AdvancedPhase>,
    pub written: bool,
}

impl CommandOutput for PerformOutput {
    fn to_human(&self) -> String {
        let Some(performed) = &self.performed else {
            return format!("{} phase {} is not ready to transition.", self.phase_type, self.phase_id);
        };
        let mut rendered = format!(
            "{} phase {}: {} ({} notified), now {}",
            self.phase_type,
            self.phase_id,
            performed.operation.as_str(),
            performed.notified,
            colorize_status(performed.status)
        );
        if self.written {
            rendered.push_str("\nSnapshot updated.");
        }
        rendered
    }
}

/// Open or close `phase_id` if it is ready, refusing phases that are not of `phase_type`.
pub async fn execute(
    workspace: &mut Workspace,
    phase_id: Uuid,
    phase_type: PhaseType,
    operator: &str,
    now: DateTime<Utc>,
) -> Result<PerformOutput> {
    let ready = workspace
        .engine
        .can_perform_as(phase_type, &workspace.project, phase_id, now)
        .await
        .with_context(|| format!("Failed to check phase {phase_id}"))?;

    let performed = if ready {
        let transition = workspace
            .engine
            .perform_as(phase_type, &mut workspace.project, phase_id, operator, now)
            .await
            .with_context(|| format!("Failed to transition phase {phase_id}"))?;
        let status = commit(workspace, phase_id, &transition, operator).await?;
        info!(%phase_id, %phase_type, status = %status, "phase performed");
        Some(AdvancedPhase {
            phase_id,
            phase_type: transition.phase_type,
            operation: transition.operation,
            status,
            notified: transition.notified,
            values: transition.values,
        })
    } else {
        None
    };

    Ok(PerformOutput {
        project_id: workspace.project.id,
        phase_id,
        phase_type,
        evaluated_at: now,
        performed,
        written: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::WorkflowSnapshot;
    use crate::domain::errors::PhaseHandlingError;
    use crate::domain::models::{EngineConfig, Phase, PhaseOperation, PhaseStatus, Project};
    use chrono::TimeZone;

    const HOUR_MS: i64 = 3_600_000;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap()
    }

    fn workspace(phase: Phase) -> Workspace {
        let mut project = Project::new();
        project.phases = vec![phase];
        Workspace::from_snapshot(
            WorkflowSnapshot {
                project,
                ..WorkflowSnapshot::default()
            },
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_perform_opens_phase_of_expected_type() {
        let submission = Phase::new(PhaseType::Submission, HOUR_MS).with_schedule(at(9), at(10));
        let phase_id = submission.id;
        let mut workspace = workspace(submission);

        let output = execute(&mut workspace, phase_id, PhaseType::Submission, "ops", at(9))
            .await
            .unwrap();

        let performed = output.performed.unwrap();
        assert_eq!(performed.operation, PhaseOperation::Start);
        assert_eq!(performed.status, PhaseStatus::Open);
        assert_eq!(workspace.store.project().await.phases[0].status, PhaseStatus::Open);
    }

    #[tokio::test]
    async fn test_perform_reports_phase_not_ready() {
        let submission = Phase::new(PhaseType::Submission, HOUR_MS).with_schedule(at(9), at(10));
        let phase_id = submission.id;
        let mut workspace = workspace(submission);

        let output = execute(&mut workspace, phase_id, PhaseType::Submission, "ops", at(8))
            .await
            .unwrap();

        assert!(output.performed.is_none());
        assert!(output.to_human().contains("is not ready"));
        assert_eq!(workspace.project.phases[0].status, PhaseStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_perform_rejects_phase_of_other_type() {
        let review = Phase::new(PhaseType::Review, HOUR_MS).with_schedule(at(9), at(10));
        let phase_id = review.id;
        let mut workspace = workspace(review);

        let err = execute(&mut workspace, phase_id, PhaseType::Screening, "ops", at(9))
            .await
            .unwrap_err();

        let cause = err.downcast_ref::<PhaseHandlingError>();
        assert!(matches!(
            cause,
            Some(PhaseHandlingError::PhaseNotSupported {
                expected: PhaseType::Screening,
                actual: PhaseType::Review,
            })
        ));
        assert_eq!(workspace.project.phases[0].status, PhaseStatus::Scheduled);
    }
}
