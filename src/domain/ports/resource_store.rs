use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::{Resource, ResourceRole};
use crate::domain::ports::errors::StoreError;

/// Filters for querying resources
#[derive(Default, Debug, Clone)]
pub struct ResourceFilter {
    pub project_id: Option<Uuid>,
    pub phase_id: Option<Uuid>,
    /// Empty means any role
    pub roles: Vec<ResourceRole>,
    pub external_id: Option<String>,
    /// Resource property that must be present with the given value
    pub property: Option<(String, String)>,
}

impl ResourceFilter {
    pub fn on_phase(phase_id: Uuid, roles: &[ResourceRole]) -> Self {
        Self {
            phase_id: Some(phase_id),
            roles: roles.to_vec(),
            ..Self::default()
        }
    }

    pub fn on_project(project_id: Uuid, roles: &[ResourceRole]) -> Self {
        Self {
            project_id: Some(project_id),
            roles: roles.to_vec(),
            ..Self::default()
        }
    }
}

/// Persistence port for resources
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn search_resources(&self, filter: &ResourceFilter) -> Result<Vec<Resource>, StoreError>;

    async fn get_resource(&self, id: Uuid) -> Result<Option<Resource>, StoreError>;

    async fn create_resource(&self, resource: &Resource, operator: &str) -> Result<(), StoreError>;

    /// Every role the store knows about
    async fn all_roles(&self) -> Result<Vec<ResourceRole>, StoreError>;

    /// External ids subscribed to timeline notifications of a project
    async fn timeline_subscribers(&self, project_id: Uuid) -> Result<Vec<String>, StoreError>;
}
