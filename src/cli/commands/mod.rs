//! CLI command implementations.

pub mod advance;
pub mod perform;
pub mod status;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::adapters::{AverageScoreAggregator, DependencyCalendar, InMemoryWorkflowStore, TracingNotifier, WorkflowSnapshot};
use crate::domain::models::{EngineConfig, Project};
use crate::services::{Managers, PhaseEngine};

/// A loaded snapshot wired to an engine over the in-memory store.
pub struct Workspace {
    pub store: Arc<InMemoryWorkflowStore>,
    pub engine: PhaseEngine,
    /// Working copy of the project; the engine mutates it in place.
    pub project: Project,
}

impl Workspace {
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        let snapshot = WorkflowSnapshot::load(path)?;
        Ok(Self::from_snapshot(snapshot, config))
    }

    pub fn from_snapshot(snapshot: WorkflowSnapshot, config: EngineConfig) -> Self {
        let project = snapshot.project.clone();
        let store = Arc::new(InMemoryWorkflowStore::new(snapshot));
        let managers = Managers {
            phases: store.clone(),
            projects: store.clone(),
            resources: store.clone(),
            reviews: store.clone(),
            uploads: store.clone(),
            scorecards: store.clone(),
            aggregator: Arc::new(AverageScoreAggregator::new()),
            calendar: Arc::new(DependencyCalendar::new()),
            terms: store.clone(),
            notifier: Arc::new(TracingNotifier),
        };
        Self {
            store,
            engine: PhaseEngine::new(managers, config),
            project,
        }
    }

    /// Current store contents with the working project.
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let mut snapshot = self.store.snapshot().await;
        snapshot.project = self.project.clone();
        snapshot
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        self.snapshot()
            .await
            .save(path)
            .with_context(|| format!("Failed to save snapshot to {}", path.display()))
    }
}
