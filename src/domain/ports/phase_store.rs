use async_trait::async_trait;

use crate::domain::models::{PhaseStatus, PhaseType, Project};
use crate::domain::ports::errors::StoreError;

/// Persistence port for a project's phase sequence
#[async_trait]
pub trait PhaseStore: Send + Sync {
    /// Every phase type the store knows about
    async fn all_phase_types(&self) -> Result<Vec<PhaseType>, StoreError>;

    /// Every phase status the store knows about
    async fn all_phase_statuses(&self) -> Result<Vec<PhaseStatus>, StoreError>;

    /// Replace the stored phase set of `project` (phases, dependencies,
    /// attributes and schedule) in one update
    async fn update_phases(&self, project: &Project, operator: &str) -> Result<(), StoreError>;
}
