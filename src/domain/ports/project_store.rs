use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::models::{Project, ProjectLink};
use crate::domain::ports::errors::StoreError;

/// Persistence port for projects and their properties
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load a project with its phases and properties
    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    /// Overwrite the property bag of a project
    async fn update_properties(
        &self,
        project_id: Uuid,
        properties: &BTreeMap<String, String>,
        reason: &str,
        operator: &str,
    ) -> Result<(), StoreError>;

    /// Links from `project_id` to its parent projects
    async fn parent_links(&self, project_id: Uuid) -> Result<Vec<ProjectLink>, StoreError>;
}
