//! Worksheet copy and reset operations.
//!
//! Worksheets move between rework cycles by value: every operation returns a
//! fresh review, item or comment list and never mutates its source.

use uuid::Uuid;

use crate::domain::models::review::{ACCEPT_MARKER, REVIEWER_COMMENT_TYPES};
use crate::domain::models::{Comment, CommentType, Item, Review};

/// Comment copy that keeps author, text and type but drops the verdict.
fn copy_comment(comment: &Comment) -> Comment {
    Comment::new(comment.author, comment.comment_type, comment.text.clone())
}

fn is_reviewer_comment(comment: &Comment) -> bool {
    REVIEWER_COMMENT_TYPES.contains(&comment.comment_type)
}

/// Copy review-level comments of the given types.
///
/// When `verdict` is set only comments carrying exactly that extra info are copied.
pub fn copy_comments(source: &Review, types: &[CommentType], verdict: Option<&str>) -> Vec<Comment> {
    source
        .comments
        .iter()
        .filter(|c| types.contains(&c.comment_type))
        .filter(|c| verdict.is_none_or(|v| c.extra_info() == Some(v)))
        .map(copy_comment)
        .collect()
}

/// Copy every item with its comments of the given types.
pub fn copy_review_items(source: &Review, types: &[CommentType]) -> Vec<Item> {
    source
        .items
        .iter()
        .map(|item| Item {
            id: Uuid::new_v4(),
            question: item.question,
            answer: item.answer.clone(),
            document: item.document,
            comments: item
                .comments
                .iter()
                .filter(|c| types.contains(&c.comment_type))
                .map(copy_comment)
                .collect(),
        })
        .collect()
}

/// Copy every item, keeping only the comment runs that follow an accepted
/// reviewer comment.
///
/// Each reviewer comment opens a run; the run is copied when that comment is
/// marked `Accept` and skipped otherwise.
pub fn copy_final_review_items(source: &Review) -> Vec<Item> {
    source
        .items
        .iter()
        .map(|item| {
            let mut copying = false;
            let mut comments = Vec::new();
            for comment in &item.comments {
                if is_reviewer_comment(comment) {
                    copying = comment.extra_info() == Some(ACCEPT_MARKER);
                }
                if copying {
                    comments.push(copy_comment(comment));
                }
            }
            Item {
                id: Uuid::new_v4(),
                question: item.question,
                answer: item.answer.clone(),
                document: item.document,
                comments,
            }
        })
        .collect()
}

/// Deep copy with fresh ids. Verdicts, score and commit flag are kept.
pub fn duplicate(review: &Review) -> Review {
    let clone_comment = |c: &Comment| Comment {
        id: Uuid::new_v4(),
        ..c.clone()
    };

    Review {
        id: Uuid::new_v4(),
        author: review.author,
        submission: review.submission,
        scorecard: review.scorecard.clone(),
        committed: review.committed,
        score: review.score,
        comments: review.comments.iter().map(clone_comment).collect(),
        items: review
            .items
            .iter()
            .map(|item| Item {
                id: Uuid::new_v4(),
                question: item.question,
                answer: item.answer.clone(),
                document: item.document,
                comments: item.comments.iter().map(clone_comment).collect(),
            })
            .collect(),
        created_at: chrono::Utc::now(),
    }
}

/// Same review with the verdict of every review-level comment of the given
/// types cleared.
pub fn reset_verdicts(review: &Review, types: &[CommentType]) -> Review {
    let mut reset = review.clone();
    for comment in &mut reset.comments {
        if types.contains(&comment.comment_type) {
            comment.extra_info = None;
        }
    }
    reset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer_review() -> (Uuid, Review) {
        let author = Uuid::new_v4();
        let review = Review::new(author, Some(Uuid::new_v4()), Some("7".to_string()))
            .committed()
            .with_comment(Comment::new(author, CommentType::Comment, "general").with_extra_info("x"))
            .with_comment(Comment::new(author, CommentType::ManagerComment, "mgr"))
            .with_comment(Comment::new(author, CommentType::FinalReviewComment, "final"))
            .with_item(
                Item::new(Uuid::new_v4(), "answer")
                    .with_comment(Comment::new(author, CommentType::Required, "fix it").with_extra_info(ACCEPT_MARKER))
                    .with_comment(Comment::new(author, CommentType::AppealResponse, "ok"))
                    .with_comment(Comment::new(author, CommentType::Recommended, "nice to have").with_extra_info("Reject"))
                    .with_comment(Comment::new(author, CommentType::Appeal, "disagree")),
            );
        (author, review)
    }

    #[test]
    fn test_copy_comments_drops_verdicts() {
        let (author, review) = reviewer_review();
        let copied = copy_comments(&review, &[CommentType::Comment, CommentType::ManagerComment], None);

        assert_eq!(copied.len(), 2);
        assert!(copied.iter().all(|c| c.extra_info.is_none() && c.author == author));
        assert!(copied.iter().all(|c| !review.comments.iter().any(|o| o.id == c.id)));
    }

    #[test]
    fn test_copy_comments_with_verdict_filter() {
        let (_, review) = reviewer_review();
        assert_eq!(copy_comments(&review, &[CommentType::Comment], Some("x")).len(), 1);
        assert!(copy_comments(&review, &[CommentType::Comment], Some("y")).is_empty());
    }

    #[test]
    fn test_copy_review_items_filters_comment_types() {
        let (_, review) = reviewer_review();
        let items = copy_review_items(&review, &[CommentType::Required, CommentType::Appeal]);

        assert_eq!(items.len(), 1);
        let types: Vec<CommentType> = items[0].comments.iter().map(|c| c.comment_type).collect();
        assert_eq!(types, vec![CommentType::Required, CommentType::Appeal]);
        assert_eq!(items[0].answer, "answer");
    }

    #[test]
    fn test_copy_final_review_items_follows_accepted_runs() {
        let (_, review) = reviewer_review();
        let items = copy_final_review_items(&review);

        let types: Vec<CommentType> = items[0].comments.iter().map(|c| c.comment_type).collect();
        assert_eq!(types, vec![CommentType::Required, CommentType::AppealResponse]);
    }

    #[test]
    fn test_duplicate_keeps_content_with_new_ids() {
        let (_, review) = reviewer_review();
        let copy = duplicate(&review);

        assert_ne!(copy.id, review.id);
        assert_eq!(copy.committed, review.committed);
        assert_eq!(copy.comments.len(), review.comments.len());
        assert_eq!(copy.comments[0].extra_info, review.comments[0].extra_info);
        assert_ne!(copy.items[0].id, review.items[0].id);
        assert_eq!(copy.items[0].comments.len(), 4);
    }

    #[test]
    fn test_reset_verdicts_leaves_source_untouched() {
        let (_, review) = reviewer_review();
        let reset = reset_verdicts(&review, &[CommentType::Comment]);

        assert!(reset.comments[0].extra_info.is_none());
        assert_eq!(review.comments[0].extra_info.as_deref(), Some("x"));
        assert_eq!(reset.id, review.id);
    }
}
