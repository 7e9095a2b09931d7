use uuid::Uuid;

use crate::domain::ports::errors::StoreError;

/// Raw review scores of one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionScores {
    pub submission_id: Uuid,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedScore {
    pub submission_id: Uuid,
    pub score: f64,
}

/// Placement produced by ranking; equal scores share a rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedSubmission {
    pub submission_id: Uuid,
    pub score: f64,
    pub rank: u32,
}

/// Score aggregation arithmetic
pub trait ScoreAggregator: Send + Sync {
    /// One aggregated score per input entry, in input order
    fn aggregate(&self, scores: &[SubmissionScores]) -> Result<Vec<AggregatedScore>, StoreError>;

    /// Order aggregated scores into placements
    fn rank(&self, scores: &[AggregatedScore]) -> Result<Vec<RankedSubmission>, StoreError>;
}
