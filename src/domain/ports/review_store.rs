use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::Review;
use crate::domain::ports::errors::StoreError;

/// Filters for querying reviews
#[derive(Default, Debug, Clone)]
pub struct ReviewFilter {
    /// Resource ids of the authors; empty matches nothing
    pub reviewers: Vec<Uuid>,
    pub submission: Option<Uuid>,
    pub committed: Option<bool>,
}

impl ReviewFilter {
    pub fn by_reviewers(reviewers: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            reviewers: reviewers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn for_submission(mut self, submission: Uuid) -> Self {
        self.submission = Some(submission);
        self
    }

    pub fn committed_only(mut self) -> Self {
        self.committed = Some(true);
        self
    }
}

/// Persistence port for reviews (worksheets), loaded with comments and items
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn search_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError>;

    async fn create_review(&self, review: &Review, operator: &str) -> Result<(), StoreError>;

    async fn update_review(&self, review: &Review, operator: &str) -> Result<(), StoreError>;
}
