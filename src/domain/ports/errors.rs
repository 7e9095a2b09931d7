use thiserror::Error;

/// Failure reported by an external collaborator (store, aggregator, sink).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Computation failed: {0}")]
    Computation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
