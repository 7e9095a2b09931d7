//! Dependency evaluation: the full edge truth table and the conjunction over edges.

use proptest::prelude::*;
use uuid::Uuid;

use review_phases::domain::models::{Dependency, DependencyKind, Phase, PhaseStatus, PhaseType, Project};
use review_phases::DependencyEvaluator;

const STATUSES: [PhaseStatus; 3] = [PhaseStatus::Scheduled, PhaseStatus::Open, PhaseStatus::Closed];

/// Expected outcome for one edge, written out case by case.
fn expected(kind: DependencyKind, status: PhaseStatus, starting: bool) -> bool {
    use DependencyKind::*;
    use PhaseStatus::*;
    match (kind, starting, status) {
        // Edges that gate the dependent's start only matter while starting
        (StartToStart, true, Scheduled) => false,
        (StartToStart, true, Open | Closed) => true,
        (FinishToStart, true, Scheduled | Open) => false,
        (FinishToStart, true, Closed) => true,
        (StartToStart | FinishToStart, false, _) => true,

        // Edges that gate the dependent's finish only matter while ending
        (StartToFinish, false, Scheduled) => false,
        (StartToFinish, false, Open | Closed) => true,
        (FinishToFinish, false, Scheduled | Open) => false,
        (FinishToFinish, false, Closed) => true,
        (StartToFinish | FinishToFinish, true, _) => true,
    }
}

fn edge(kind: DependencyKind, dependency: Uuid, lag_ms: i64) -> Dependency {
    let (on_dependency_start, on_dependent_start) = match kind {
        DependencyKind::StartToStart => (true, true),
        DependencyKind::StartToFinish => (true, false),
        DependencyKind::FinishToStart => (false, true),
        DependencyKind::FinishToFinish => (false, false),
    };
    Dependency::new(dependency, on_dependency_start, on_dependent_start, lag_ms)
}

fn kind_strategy() -> impl Strategy<Value = DependencyKind> {
    prop_oneof![
        Just(DependencyKind::StartToStart),
        Just(DependencyKind::StartToFinish),
        Just(DependencyKind::FinishToStart),
        Just(DependencyKind::FinishToFinish),
    ]
}

fn status_strategy() -> impl Strategy<Value = PhaseStatus> {
    prop_oneof![
        Just(PhaseStatus::Scheduled),
        Just(PhaseStatus::Open),
        Just(PhaseStatus::Closed),
    ]
}

#[test]
fn test_edge_truth_table_is_exhaustive() {
    let kinds = [
        DependencyKind::StartToStart,
        DependencyKind::StartToFinish,
        DependencyKind::FinishToStart,
        DependencyKind::FinishToFinish,
    ];
    let evaluator = DependencyEvaluator::new();

    for kind in kinds {
        for status in STATUSES {
            for starting in [true, false] {
                let gate = Phase::new(PhaseType::Submission, 1000).with_status(status);
                let dependent = Phase::new(PhaseType::Review, 1000).with_dependency(edge(kind, gate.id, 0));
                let project = Project::new().with_phase(gate).with_phase(dependent.clone());

                assert_eq!(
                    evaluator.dependencies_satisfied(&project, &dependent, starting),
                    expected(kind, status, starting),
                    "{kind:?} on a {status} dependency while {}",
                    if starting { "starting" } else { "ending" }
                );
            }
        }
    }
}

#[test]
fn test_phase_without_dependencies_is_satisfied() {
    let phase = Phase::new(PhaseType::Registration, 1000);
    let project = Project::new().with_phase(phase.clone());
    let evaluator = DependencyEvaluator::new();

    assert!(evaluator.dependencies_satisfied(&project, &phase, true));
    assert!(evaluator.dependencies_satisfied(&project, &phase, false));
}

#[test]
fn test_missing_dependency_phase_is_unmet() {
    let phase = Phase::new(PhaseType::Review, 1000).with_dependency(Dependency::finish_to_start(Uuid::new_v4()));
    let project = Project::new().with_phase(phase.clone());

    assert!(!DependencyEvaluator::new().dependencies_satisfied(&project, &phase, true));
}

proptest! {
    /// Property: the phase is satisfied exactly when every edge is, whatever the edge order
    #[test]
    fn prop_dependencies_are_a_conjunction(
        edges in prop::collection::vec((kind_strategy(), status_strategy(), -5_000i64..5_000), 0..6),
        starting in any::<bool>(),
        reversed in any::<bool>(),
    ) {
        let mut project = Project::new();
        let mut dependent = Phase::new(PhaseType::Review, 1000);
        for (kind, status, lag) in &edges {
            let gate = Phase::new(PhaseType::Submission, 1000).with_status(*status);
            dependent = dependent.with_dependency(edge(*kind, gate.id, *lag));
            project.phases.push(gate);
        }
        if reversed {
            dependent.dependencies.reverse();
        }
        project.phases.push(dependent.clone());

        let all_met = edges
            .iter()
            .all(|(kind, status, _)| expected(*kind, *status, starting));
        prop_assert_eq!(
            DependencyEvaluator::new().dependencies_satisfied(&project, &dependent, starting),
            all_met
        );
    }

    /// Property: once a start-anchored edge is met, closing the dependency keeps it met
    #[test]
    fn prop_start_anchor_stays_met_after_close(starting in any::<bool>()) {
        let kind = if starting { DependencyKind::StartToStart } else { DependencyKind::StartToFinish };
        let open = DependencyEvaluator::edge_satisfied(&edge(kind, Uuid::new_v4(), 0), PhaseStatus::Open, starting);
        let closed = DependencyEvaluator::edge_satisfied(&edge(kind, Uuid::new_v4(), 0), PhaseStatus::Closed, starting);
        prop_assert!(open);
        prop_assert!(closed);
    }
}
