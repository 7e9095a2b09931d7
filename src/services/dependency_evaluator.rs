use tracing::{debug, warn};

use crate::domain::models::{Dependency, Phase, PhaseStatus, Project};

/// Decides whether a phase's dependency edges allow its next transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyEvaluator;

impl DependencyEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a single edge against the current status of its dependency phase.
    ///
    /// Edges that gate the other side of the dependent (its finish while it is
    /// starting, or its start while it is ending) do not constrain this
    /// transition and count as satisfied. An edge anchored on the dependency's
    /// start is met once that phase has opened, even if it has closed since;
    /// an edge anchored on its finish needs it closed.
    pub fn edge_satisfied(dependency: &Dependency, dependency_status: PhaseStatus, starting: bool) -> bool {
        if dependency.anchors_on_dependent_start != starting {
            return true;
        }

        if dependency.anchors_on_dependency_start {
            dependency_status.has_started()
        } else {
            dependency_status == PhaseStatus::Closed
        }
    }

    /// Whether every edge of `phase` allows it to start (`starting`) or end.
    ///
    /// An edge pointing at a phase missing from the project is unmet.
    pub fn dependencies_satisfied(&self, project: &Project, phase: &Phase, starting: bool) -> bool {
        for dependency in &phase.dependencies {
            let Some(dependency_phase) = project.phase(dependency.dependency) else {
                warn!(
                    phase_id = %phase.id,
                    dependency_id = %dependency.dependency,
                    "dependency phase not found in project"
                );
                return false;
            };

            if !Self::edge_satisfied(dependency, dependency_phase.status, starting) {
                debug!(
                    phase_id = %phase.id,
                    dependency_id = %dependency.dependency,
                    dependency_status = %dependency_phase.status,
                    kind = ?dependency.kind(),
                    starting,
                    "dependency not met"
                );
                return false;
            }
        }

        true
    }
}
