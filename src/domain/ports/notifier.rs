use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::models::{FieldBag, PhaseOperation, PhaseType};
use crate::domain::ports::errors::StoreError;

/// One rendered-elsewhere message for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub project_id: Uuid,
    pub phase_id: Uuid,
    pub phase_type: PhaseType,
    pub operation: PhaseOperation,
    pub recipient_external_id: String,
    pub recipient_email: Option<String>,
    pub template_name: String,
    pub template_source: String,
    pub subject: String,
    pub from: String,
    pub fields: FieldBag,
}

/// Notification sink; template rendering and delivery live behind it
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), StoreError>;
}
