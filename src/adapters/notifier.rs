//! Notification sinks.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

use crate::domain::ports::{Notification, Notifier, StoreError};

/// Writes every notification to the log instead of sending mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), StoreError> {
        let fields = serde_json::to_string(&notification.fields)?;
        info!(
            project_id = %notification.project_id,
            phase_id = %notification.phase_id,
            phase_type = %notification.phase_type,
            operation = notification.operation.as_str(),
            recipient = %notification.recipient_external_id,
            template = %notification.template_name,
            subject = %notification.subject,
            fields = %fields,
            "phase notification"
        );
        Ok(())
    }
}

/// Keeps notifications in memory so callers can inspect them afterwards.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), StoreError> {
        self.sent
            .lock()
            .map_err(|_| StoreError::Backend("notification log poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}
