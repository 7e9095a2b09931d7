//! A rejected worksheet clears its verdict and splices exactly one new cycle.

mod common;

use common::{chain, day, World};
use uuid::Uuid;

use review_phases::domain::models::notification::fields;
use review_phases::domain::models::phase::attributes;
use review_phases::domain::models::project::properties;
use review_phases::domain::models::{
    Comment, CommentType, FieldValue, PhaseStatus, PhaseType, ResourceRole, Review, SubmissionType,
};

/// Original phases keep their relative order; the only new ones are `expected_new`.
fn assert_one_new_cycle(world: &World, before: &[Uuid], expected_new: [PhaseType; 2]) {
    let after = world.phase_ids();
    assert_eq!(after.len(), before.len() + 2);

    let survivors: Vec<Uuid> = after.iter().copied().filter(|id| before.contains(id)).collect();
    assert_eq!(survivors, before);

    let new_types: Vec<PhaseType> = world
        .project
        .phases
        .iter()
        .filter(|p| !before.contains(&p.id))
        .map(|p| p.phase_type)
        .collect();
    assert_eq!(new_types, expected_new.to_vec());
}

async fn stored_verdicts(world: &World, review_id: Uuid, comment_type: CommentType) -> Vec<Option<String>> {
    let reviews = world.store.reviews().await;
    let review = reviews.iter().find(|r| r.id == review_id).unwrap();
    review
        .comments_of_type(comment_type)
        .map(|c| c.extra_info.clone())
        .collect()
}

#[tokio::test]
async fn test_final_review_rejection_round_trip() {
    common::setup_test_logging();
    let mut world = World::new(chain(&[
        (PhaseType::AppealsResponse, PhaseStatus::Closed),
        (PhaseType::FinalFix, PhaseStatus::Closed),
        (PhaseType::FinalReview, PhaseStatus::Open),
        (PhaseType::Approval, PhaseStatus::Scheduled),
    ]));
    let reviewer = world.resource(ResourceRole::FinalReviewer, Some(2), "fin").await;
    let sheet = world
        .review(
            Review::new(reviewer.id, None, None)
                .committed()
                .with_comment(
                    Comment::new(reviewer.id, CommentType::FinalReviewComment, "fix the docs").with_extra_info("Rejected"),
                ),
        )
        .await;
    let before = world.phase_ids();

    assert!(world.can_perform(2, day(3)).await.unwrap());
    world.perform(2, day(3)).await.unwrap();

    assert_eq!(
        stored_verdicts(&world, sheet.id, CommentType::FinalReviewComment).await,
        vec![None]
    );
    assert_one_new_cycle(&world, &before, [PhaseType::FinalFix, PhaseType::FinalReview]);
    assert!(world.project.phases[5].depends_on(world.project.phases[4].id));

    let stored = world.store.project().await;
    assert_eq!(stored.phases.len(), 6);
}

#[tokio::test]
async fn test_specification_review_rejection_round_trip() {
    let mut world = World::new(chain(&[
        (PhaseType::SpecificationSubmission, PhaseStatus::Closed),
        (PhaseType::SpecificationReview, PhaseStatus::Open),
        (PhaseType::Submission, PhaseStatus::Scheduled),
    ]));
    world.project.phases[1]
        .attributes
        .insert(attributes::REVIEWER_NUMBER.to_string(), "1".to_string());
    let writer = world.resource(ResourceRole::SpecificationSubmitter, None, "sam").await;
    let submission = world.submission(&writer, SubmissionType::Specification).await;
    let reviewer = world.resource(ResourceRole::SpecificationReviewer, Some(1), "val").await;
    let sheet = world
        .review(
            Review::new(reviewer.id, Some(submission.id), None)
                .committed()
                .with_comment(
                    Comment::new(reviewer.id, CommentType::SpecificationReviewComment, "").with_extra_info("Rejected"),
                ),
        )
        .await;
    let before = world.phase_ids();

    let transition = world.perform(1, day(2)).await.unwrap();

    assert_eq!(
        transition.values.get(fields::RESULT).and_then(FieldValue::as_text),
        Some("Rejected")
    );
    assert_eq!(
        stored_verdicts(&world, sheet.id, CommentType::SpecificationReviewComment).await,
        vec![None]
    );
    assert_one_new_cycle(
        &world,
        &before,
        [PhaseType::SpecificationSubmission, PhaseType::SpecificationReview],
    );
    assert_eq!(world.project.phases[3].attribute(attributes::REVIEWER_NUMBER), Some("1"));
}

#[tokio::test]
async fn test_aggregation_review_rejection_round_trip() {
    let mut world = World::new(chain(&[
        (PhaseType::Review, PhaseStatus::Closed),
        (PhaseType::Aggregation, PhaseStatus::Closed),
        (PhaseType::AggregationReview, PhaseStatus::Open),
        (PhaseType::FinalFix, PhaseStatus::Scheduled),
        (PhaseType::FinalReview, PhaseStatus::Scheduled),
    ]));
    world
        .project
        .set_property(properties::WINNER_EXTERNAL_REFERENCE_ID, "ext-alice");
    let reviewer = world.resource(ResourceRole::Reviewer, Some(0), "rex").await;
    let aggregator = world.resource(ResourceRole::Aggregator, Some(1), "agg").await;
    let winner = world.resource(ResourceRole::Submitter, None, "alice").await;
    let sheet = world
        .review(
            Review::new(aggregator.id, None, None)
                .committed()
                .with_comment(
                    Comment::new(reviewer.id, CommentType::AggregationReviewComment, "").with_extra_info("Rejected"),
                )
                .with_comment(Comment::new(winner.id, CommentType::SubmitterComment, "").with_extra_info("Approved")),
        )
        .await;
    let before = world.phase_ids();

    world.perform(2, day(3)).await.unwrap();

    let reviews = world.store.reviews().await;
    let stored = reviews.iter().find(|r| r.id == sheet.id).unwrap();
    assert!(stored.comments.iter().all(|c| c.extra_info.is_none()));
    assert_one_new_cycle(&world, &before, [PhaseType::Aggregation, PhaseType::AggregationReview]);

    let new_aggregation = world.phase_id(3);
    let resources = world.store.resources().await;
    let rework = resources
        .iter()
        .find(|r| r.phase_id == Some(new_aggregation))
        .unwrap();
    assert_eq!(rework.role, ResourceRole::Aggregator);
    assert_eq!(rework.property("Payment Status"), Some("N/A"));
}
