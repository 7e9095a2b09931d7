//! `status` command: per-phase readiness report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use serde::Serialize;
use uuid::Uuid;

use super::Workspace;
use crate::cli::output::{colorize_status, list_table, truncate, CommandOutput};
use crate::domain::models::{PhaseStatus, PhaseType};

#[derive(Debug, Serialize)]
pub struct PhaseLine {
    pub id: Uuid,
    pub phase_type: PhaseType,
    pub status: PhaseStatus,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    /// `None` for closed phases and when the check failed.
    pub can_transition: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub project_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub phases: Vec<PhaseLine>,
    /// Phase types the store knows that no handler drives.
    pub unhandled_types: Vec<PhaseType>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        if self.phases.is_empty() {
            return format!("Project {} has no phases.", self.project_id);
        }
        let mut table = list_table(&["#", "phase", "status", "start", "end", "ready"]);
        for (index, line) in self.phases.iter().enumerate() {
            let ready = match (&line.error, line.can_transition) {
                (Some(error), _) => format!("error: {}", truncate(error, 60)),
                (None, Some(true)) => "yes".to_string(),
                (None, Some(false)) => "no".to_string(),
                (None, None) => "-".to_string(),
            };
            table.add_row(vec![
                Cell::new(index),
                Cell::new(line.phase_type),
                Cell::new(colorize_status(line.status)),
                Cell::new(format_time(line.scheduled_start)),
                Cell::new(format_time(line.scheduled_end)),
                Cell::new(ready),
            ]);
        }
        let mut rendered = format!(
            "Project {} at {}\n{table}",
            self.project_id,
            self.evaluated_at.format("%Y-%m-%d %H:%M")
        );
        if !self.unhandled_types.is_empty() {
            let names: Vec<&str> = self.unhandled_types.iter().map(PhaseType::as_str).collect();
            rendered.push_str(&format!("\nNo handler for: {}", names.join(", ")));
        }
        rendered
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

/// Evaluate every phase. Handler failures are reported per phase rather than aborting.
pub async fn execute(workspace: &Workspace, now: DateTime<Utc>) -> Result<StatusOutput> {
    let project = &workspace.project;
    let mut phases = Vec::with_capacity(project.phases.len());
    for phase in &project.phases {
        let (can_transition, error) = if phase.status == PhaseStatus::Closed {
            (None, None)
        } else {
            match workspace.engine.can_perform_at(project, phase.id, now).await {
                Ok(ready) => (Some(ready), None),
                Err(err) => (None, Some(err.to_string())),
            }
        };
        phases.push(PhaseLine {
            id: phase.id,
            phase_type: phase.phase_type,
            status: phase.status,
            scheduled_start: phase.scheduled_start,
            scheduled_end: phase.scheduled_end,
            can_transition,
            error,
        });
    }
    let unhandled_types = workspace
        .engine
        .unsupported_store_types()
        .await
        .context("Failed to list phase types")?;
    Ok(StatusOutput {
        project_id: project.id,
        evaluated_at: now,
        phases,
        unhandled_types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::WorkflowSnapshot;
    use crate::domain::models::{Dependency, EngineConfig, Phase, Project};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap()
    }

    fn workspace() -> Workspace {
        let registration = Phase::new(PhaseType::Registration, 3_600_000)
            .with_status(PhaseStatus::Closed)
            .with_schedule(at(8), at(9));
        let submission = Phase::new(PhaseType::Submission, 3_600_000)
            .with_schedule(at(9), at(10))
            .with_dependency(Dependency::finish_to_start(registration.id));
        let project = Project::new().with_phase(registration).with_phase(submission);
        Workspace::from_snapshot(
            WorkflowSnapshot {
                project,
                ..WorkflowSnapshot::default()
            },
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_status_reports_each_phase() {
        let workspace = workspace();
        let status = execute(&workspace, at(9)).await.unwrap();

        assert_eq!(status.phases.len(), 2);
        assert_eq!(status.phases[0].can_transition, None);
        assert_eq!(status.phases[1].can_transition, Some(true));

        assert_eq!(status.unhandled_types, vec![PhaseType::Registration]);

        let early = execute(&workspace, at(8)).await.unwrap();
        assert_eq!(early.phases[1].can_transition, Some(false));
    }

    #[tokio::test]
    async fn test_status_renders_table_and_json() {
        let workspace = workspace();
        let status = execute(&workspace, at(9)).await.unwrap();

        let human = status.to_human();
        assert!(human.contains("Registration"));
        assert!(human.contains("yes"));

        assert!(human.contains("No handler for: Registration"));

        let json = status.to_json();
        assert_eq!(json["phases"][1]["phase_type"], "Submission");
        assert_eq!(json["phases"][1]["can_transition"], true);
    }
}
