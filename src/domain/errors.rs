//! Domain errors for the phase lifecycle engine.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::{PhaseStatus, PhaseType};
use crate::domain::ports::StoreError;

/// The single error kind surfaced by phase handlers.
///
/// Contract violations (wrong phase type, terminal status, malformed verdicts,
/// broken count invariants) and wrapped collaborator failures both end up
/// here. A "not ready" phase is never an error; it is a `false` readiness.
#[derive(Debug, Error)]
pub enum PhaseHandlingError {
    #[error("Phase must be of type {expected}. It is of type {actual}")]
    PhaseNotSupported { expected: PhaseType, actual: PhaseType },

    #[error("No handler registered for phase type {0}")]
    NoHandler(PhaseType),

    #[error("Phase status '{status}' is not valid for phase {phase_id}")]
    InvalidPhaseStatus { phase_id: Uuid, status: PhaseStatus },

    #[error("Phase not found in project: {0}")]
    PhaseNotFound(Uuid),

    #[error("Could not find nearest phase of type {phase_type}")]
    PhaseTypeNotFound { phase_type: PhaseType },

    #[error("Comment of type '{comment_type}' carries an unrecognized verdict '{value}'")]
    InvalidVerdict { comment_type: String, value: String },

    #[error("Attribute '{key}' has a non-numeric value '{value}'")]
    InvalidAttribute { key: String, value: String },

    #[error("Inconsistent data: {0}")]
    DataIntegrity(String),

    #[error("Missing entity: {0}")]
    MissingEntity(String),

    #[error("{context}")]
    Collaborator {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("Operator must be a non-empty string")]
    EmptyOperator,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type PhaseResult<T> = Result<T, PhaseHandlingError>;

/// Attach a readable context to a store failure, in the spirit of `anyhow::Context`.
pub trait StoreResultExt<T> {
    fn context(self, context: impl Into<String>) -> PhaseResult<T>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn context(self, context: impl Into<String>) -> PhaseResult<T> {
        self.map_err(|source| PhaseHandlingError::Collaborator {
            context: context.into(),
            source,
        })
    }
}
