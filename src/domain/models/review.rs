//! Review (worksheet) domain model.
//!
//! A review is authored by a resource and holds typed comments. The comment
//! "extra info" doubles as an approve/reject verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::errors::{PhaseHandlingError, PhaseResult};

/// Type tag of a review comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommentType {
    Comment,
    Required,
    Recommended,
    Appeal,
    #[serde(rename = "Appeal Response")]
    AppealResponse,
    #[serde(rename = "Aggregation Comment")]
    AggregationComment,
    #[serde(rename = "Aggregation Review Comment")]
    AggregationReviewComment,
    #[serde(rename = "Submitter Comment")]
    SubmitterComment,
    #[serde(rename = "Manager Comment")]
    ManagerComment,
    #[serde(rename = "Final Fix Comment")]
    FinalFixComment,
    #[serde(rename = "Final Review Comment")]
    FinalReviewComment,
    #[serde(rename = "Approval Review Comment")]
    ApprovalReviewComment,
    #[serde(rename = "Approval Review Comment - Other Fixes")]
    ApprovalOtherFixes,
    #[serde(rename = "Specification Review Comment")]
    SpecificationReviewComment,
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "Comment",
            Self::Required => "Required",
            Self::Recommended => "Recommended",
            Self::Appeal => "Appeal",
            Self::AppealResponse => "Appeal Response",
            Self::AggregationComment => "Aggregation Comment",
            Self::AggregationReviewComment => "Aggregation Review Comment",
            Self::SubmitterComment => "Submitter Comment",
            Self::ManagerComment => "Manager Comment",
            Self::FinalFixComment => "Final Fix Comment",
            Self::FinalReviewComment => "Final Review Comment",
            Self::ApprovalReviewComment => "Approval Review Comment",
            Self::ApprovalOtherFixes => "Approval Review Comment - Other Fixes",
            Self::SpecificationReviewComment => "Specification Review Comment",
        }
    }
}

impl fmt::Display for CommentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comment types written by reviewers during the Review phase.
pub const REVIEWER_COMMENT_TYPES: [CommentType; 3] = [
    CommentType::Comment,
    CommentType::Required,
    CommentType::Recommended,
];

/// Comment types carried from review scorecards into an aggregation worksheet.
pub const AGGREGATION_COMMENT_TYPES: [CommentType; 9] = [
    CommentType::Comment,
    CommentType::Required,
    CommentType::Recommended,
    CommentType::Appeal,
    CommentType::AppealResponse,
    CommentType::AggregationComment,
    CommentType::AggregationReviewComment,
    CommentType::SubmitterComment,
    CommentType::ManagerComment,
];

/// Comment types carried from an aggregation worksheet into a final review worksheet.
pub const FINAL_REVIEW_COMMENT_TYPES: [CommentType; 11] = [
    CommentType::Comment,
    CommentType::Required,
    CommentType::Recommended,
    CommentType::Appeal,
    CommentType::AppealResponse,
    CommentType::AggregationComment,
    CommentType::AggregationReviewComment,
    CommentType::SubmitterComment,
    CommentType::ManagerComment,
    CommentType::FinalFixComment,
    CommentType::FinalReviewComment,
];

/// Marker left on recycled aggregation comments that were previously approved.
pub const APPROVING_MARKER: &str = "Approving";

/// Verdict an aggregator puts on a reviewer comment it accepts.
pub const ACCEPT_MARKER: &str = "Accept";

/// Other-fixes flag value on approval worksheets.
pub const OTHER_FIXES_REQUIRED: &str = "Required";

/// A recognized approve/reject verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Approved,
    Accepted,
    Rejected,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Approved | Self::Accepted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Resource id of the comment author.
    pub author: Uuid,
    pub comment_type: CommentType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub extra_info: Option<String>,
}

impl Comment {
    pub fn new(author: Uuid, comment_type: CommentType, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            comment_type,
            text: text.into(),
            extra_info: None,
        }
    }

    pub fn with_extra_info(mut self, extra_info: impl Into<String>) -> Self {
        self.extra_info = Some(extra_info.into());
        self
    }

    pub fn extra_info(&self) -> Option<&str> {
        self.extra_info.as_deref()
    }

    pub fn has_verdict(&self) -> bool {
        self.extra_info.as_deref().is_some_and(|v| !v.trim().is_empty())
    }

    /// Parse the verdict strictly. Missing or unrecognized values are errors.
    pub fn require_verdict(&self) -> PhaseResult<Verdict> {
        let raw = self.extra_info.as_deref().unwrap_or("");
        Verdict::from_str(raw).ok_or_else(|| PhaseHandlingError::InvalidVerdict {
            comment_type: self.comment_type.as_str().to_string(),
            value: raw.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub question: Uuid,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub document: Option<Uuid>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Item {
    pub fn new(question: Uuid, answer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            answer: answer.into(),
            document: None,
            comments: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comments.push(comment);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    /// Resource id of the reviewer.
    pub author: Uuid,
    #[serde(default)]
    pub submission: Option<Uuid>,
    #[serde(default)]
    pub scorecard: Option<String>,
    #[serde(default)]
    pub committed: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(author: Uuid, submission: Option<Uuid>, scorecard: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            submission,
            scorecard,
            committed: false,
            score: None,
            comments: Vec::new(),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn committed(mut self) -> Self {
        self.committed = true;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comments.push(comment);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn comments_of_type(&self, comment_type: CommentType) -> impl Iterator<Item = &Comment> {
        self.comments
            .iter()
            .filter(move |c| c.comment_type == comment_type)
    }

    /// Review-level comments followed by every item comment.
    pub fn all_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments
            .iter()
            .chain(self.items.iter().flat_map(|i| i.comments.iter()))
    }
}
