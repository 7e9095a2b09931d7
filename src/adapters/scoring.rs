//! Arithmetic-mean score aggregation with competition ranking.

use std::cmp::Ordering;

use crate::domain::ports::{AggregatedScore, RankedSubmission, ScoreAggregator, StoreError, SubmissionScores};

/// Averages review scores; equal averages share a rank and the next rank is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageScoreAggregator;

impl AverageScoreAggregator {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreAggregator for AverageScoreAggregator {
    fn aggregate(&self, scores: &[SubmissionScores]) -> Result<Vec<AggregatedScore>, StoreError> {
        scores
            .iter()
            .map(|entry| {
                if entry.scores.is_empty() {
                    return Err(StoreError::Computation(format!(
                        "submission {} has no scores to aggregate",
                        entry.submission_id
                    )));
                }
                let sum: f64 = entry.scores.iter().sum();
                Ok(AggregatedScore {
                    submission_id: entry.submission_id,
                    score: sum / entry.scores.len() as f64,
                })
            })
            .collect()
    }

    fn rank(&self, scores: &[AggregatedScore]) -> Result<Vec<RankedSubmission>, StoreError> {
        if let Some(bad) = scores.iter().find(|s| s.score.is_nan()) {
            return Err(StoreError::Computation(format!(
                "submission {} has a non-numeric score",
                bad.submission_id
            )));
        }

        let mut ordered = scores.to_vec();
        ordered.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let mut ranked: Vec<RankedSubmission> = Vec::with_capacity(ordered.len());
        for (position, entry) in ordered.iter().enumerate() {
            let rank = match ranked.last() {
                Some(previous) if previous.score == entry.score => previous.rank,
                _ => position as u32 + 1,
            };
            ranked.push(RankedSubmission {
                submission_id: entry.submission_id,
                score: entry.score,
                rank,
            });
        }
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scored(score: f64) -> AggregatedScore {
        AggregatedScore {
            submission_id: Uuid::new_v4(),
            score,
        }
    }

    #[test]
    fn test_aggregate_averages_scores() {
        let id = Uuid::new_v4();
        let aggregated = AverageScoreAggregator
            .aggregate(&[SubmissionScores {
                submission_id: id,
                scores: vec![80.0, 90.0, 100.0],
            }])
            .unwrap();

        assert_eq!(aggregated[0].submission_id, id);
        assert!((aggregated[0].score - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_rejects_submission_without_scores() {
        let result = AverageScoreAggregator.aggregate(&[SubmissionScores {
            submission_id: Uuid::new_v4(),
            scores: vec![],
        }]);
        assert!(matches!(result, Err(StoreError::Computation(_))));
    }

    #[test]
    fn test_rank_shares_rank_on_ties_and_skips() {
        let ranked = AverageScoreAggregator
            .rank(&[scored(70.0), scored(95.0), scored(95.0), scored(60.0)])
            .unwrap();

        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3, 4]);
        assert_eq!(ranked[2].score, 70.0);
    }
}
