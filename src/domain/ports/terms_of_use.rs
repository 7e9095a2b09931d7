use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::errors::StoreError;

/// Terms-of-use lookup
#[async_trait]
pub trait TermsOfUseChecker: Send + Sync {
    /// Whether the user still has terms to accept before joining the project
    async fn has_pending_terms(&self, project_id: Uuid, external_id: &str) -> Result<bool, StoreError>;
}
