use async_trait::async_trait;

use crate::domain::ports::errors::StoreError;

/// Lookup port for scorecard definitions
#[async_trait]
pub trait ScorecardStore: Send + Sync {
    /// Minimum passing score of a scorecard
    async fn minimum_score(&self, scorecard_id: &str) -> Result<f64, StoreError>;
}
