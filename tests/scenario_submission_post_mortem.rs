//! A submission phase that closes without submissions may get a Post-Mortem.

mod common;

use common::{chain, day, World};

use review_phases::domain::models::notification::fields;
use review_phases::domain::models::phase::attributes;
use review_phases::domain::models::project::properties;
use review_phases::domain::models::{FieldValue, PhaseStatus, PhaseType, ResourceRole, SubmissionType};

fn submission_world(post_mortem_required: Option<&str>) -> World {
    let mut project = chain(&[
        (PhaseType::Registration, PhaseStatus::Closed),
        (PhaseType::Submission, PhaseStatus::Open),
        (PhaseType::Screening, PhaseStatus::Scheduled),
        (PhaseType::Review, PhaseStatus::Scheduled),
    ]);
    if let Some(value) = post_mortem_required {
        project.set_property(properties::POST_MORTEM_REQUIRED, value);
    }
    World::new(project)
}

#[tokio::test]
async fn test_empty_submission_phase_spawns_post_mortem_when_required() {
    common::setup_test_logging();
    let mut world = submission_world(Some("TRUE"));

    assert!(!world.can_perform(1, day(1)).await.unwrap());
    assert!(world.can_perform(1, day(2)).await.unwrap());

    let transition = world.perform(1, day(2)).await.unwrap();

    assert_eq!(
        transition.values.get(fields::N_SUBMITTERS).and_then(FieldValue::as_integer),
        Some(0)
    );
    assert_eq!(
        world.project.phase_types(),
        vec![
            PhaseType::Registration,
            PhaseType::Submission,
            PhaseType::PostMortem,
            PhaseType::Screening,
            PhaseType::Review,
        ]
    );

    let post_mortem = &world.project.phases[2];
    assert_eq!(post_mortem.status, PhaseStatus::Scheduled);
    assert!(post_mortem.depends_on(world.phase_id(1)));
    assert_eq!(post_mortem.attribute(attributes::REVIEWER_NUMBER), Some("5"));
    assert_eq!(post_mortem.attribute(attributes::SCORECARD_ID), Some("1"));
    assert_eq!(post_mortem.length_ms, 24 * 3_600_000);
    assert!(world.project.phases[3].depends_on(world.phase_id(1)));

    let stored = world.store.project().await;
    assert_eq!(stored.phases.len(), 5);
}

#[tokio::test]
async fn test_empty_submission_phase_without_requirement_spawns_nothing() {
    for setting in [None, Some("false"), Some("no")] {
        let mut world = submission_world(setting);
        assert!(world.can_perform(1, day(2)).await.unwrap());

        world.perform(1, day(2)).await.unwrap();

        assert_eq!(world.project.phases.len(), 4, "Post-Mortem Required = {setting:?}");
        assert!(!world.project.has_phase_of_type(PhaseType::PostMortem));
    }
}

#[tokio::test]
async fn test_post_mortem_is_spawned_only_once() {
    let mut world = submission_world(Some("true"));
    world.perform(1, day(2)).await.unwrap();
    assert_eq!(world.project.phases.len(), 5);

    // Ending the same phase again finds the existing Post-Mortem
    world.perform(1, day(2)).await.unwrap();
    assert_eq!(world.project.phases.len(), 5);
}

#[tokio::test]
async fn test_submission_phase_with_submissions_spawns_nothing() {
    let mut world = submission_world(Some("true"));
    let alice = world.resource(ResourceRole::Submitter, None, "alice").await;
    world.submission(&alice, SubmissionType::Contest).await;

    let transition = world.perform(1, day(2)).await.unwrap();

    assert_eq!(
        transition.values.get(fields::N_SUBMITTERS).and_then(FieldValue::as_integer),
        Some(1)
    );
    assert!(!world.project.has_phase_of_type(PhaseType::PostMortem));
}
