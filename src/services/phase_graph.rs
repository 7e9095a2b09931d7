//! Phase graph mutation and lookup.
//!
//! Rework cycles splice fresh phases right after an anchor phase. The new
//! phases are chained finish-to-start behind the anchor, the phase that used
//! to follow the anchor is optionally re-threaded behind the last new phase,
//! and the whole sequence is rescheduled through the [`PhaseCalendar`].

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::{PhaseHandlingError, PhaseResult};
use crate::domain::models::{Dependency, Phase, PhaseStatus, PhaseType, Project};
use crate::domain::ports::PhaseCalendar;

/// What to splice and how.
#[derive(Debug, Clone)]
pub struct PhaseInsertion {
    pub anchor: Uuid,
    pub new_types: Vec<PhaseType>,
    pub status: PhaseStatus,
    /// Re-point the following phase's edges from the anchor to the last new phase
    pub rewire_following: bool,
    /// Copy the anchor's attributes onto new phases of the anchor's type
    pub copy_anchor_attributes: bool,
}

impl PhaseInsertion {
    pub fn after(anchor: Uuid, new_types: impl IntoIterator<Item = PhaseType>) -> Self {
        Self {
            anchor,
            new_types: new_types.into_iter().collect(),
            status: PhaseStatus::Scheduled,
            rewire_following: false,
            copy_anchor_attributes: false,
        }
    }

    pub fn with_status(mut self, status: PhaseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn rewired(mut self) -> Self {
        self.rewire_following = true;
        self
    }

    pub fn copying_anchor_attributes(mut self) -> Self {
        self.copy_anchor_attributes = true;
        self
    }
}

/// Splices phases into a project and reschedules it.
#[derive(Clone)]
pub struct PhaseGraphMutator {
    calendar: Arc<dyn PhaseCalendar>,
    fallback_durations_ms: BTreeMap<PhaseType, i64>,
}

impl PhaseGraphMutator {
    pub fn new(calendar: Arc<dyn PhaseCalendar>) -> Self {
        Self {
            calendar,
            fallback_durations_ms: BTreeMap::new(),
        }
    }

    /// Durations used for types the project has no phase of yet.
    pub fn with_fallback_durations(mut self, durations_ms: BTreeMap<PhaseType, i64>) -> Self {
        self.fallback_durations_ms = durations_ms;
        self
    }

    /// Insert phases after the anchor, copying each new phase's length from
    /// the last existing phase of the same type.
    ///
    /// Returns the anchor's index.
    pub fn insert_phases(&self, project: &mut Project, insertion: &PhaseInsertion) -> PhaseResult<usize> {
        let lengths: Vec<i64> = insertion
            .new_types
            .iter()
            .map(|phase_type| self.duration_for(project, *phase_type))
            .collect();
        self.insert_phases_with_lengths(project, insertion, &lengths)
    }

    /// Insert phases after the anchor with explicit lengths, one per new type.
    pub fn insert_phases_with_lengths(
        &self,
        project: &mut Project,
        insertion: &PhaseInsertion,
        lengths_ms: &[i64],
    ) -> PhaseResult<usize> {
        let anchor_index = project
            .index_of(insertion.anchor)
            .ok_or(PhaseHandlingError::PhaseNotFound(insertion.anchor))?;

        if insertion.new_types.is_empty() {
            return Ok(anchor_index);
        }

        if lengths_ms.len() != insertion.new_types.len() {
            return Err(PhaseHandlingError::Configuration(format!(
                "{} phase lengths supplied for {} new phases",
                lengths_ms.len(),
                insertion.new_types.len()
            )));
        }

        let anchor_type = project.phases[anchor_index].phase_type;
        let anchor_attributes = project.phases[anchor_index].attributes.clone();

        let mut predecessor = insertion.anchor;
        let mut new_phases = Vec::with_capacity(insertion.new_types.len());
        for (phase_type, length) in insertion.new_types.iter().zip(lengths_ms) {
            let mut phase = Phase::new(*phase_type, *length)
                .with_status(insertion.status)
                .with_dependency(Dependency::finish_to_start(predecessor));
            if insertion.copy_anchor_attributes && *phase_type == anchor_type {
                phase.attributes.clone_from(&anchor_attributes);
            }
            predecessor = phase.id;
            new_phases.push(phase);
        }
        let last_new = predecessor;

        if insertion.rewire_following {
            if let Some(following) = project.phases.get_mut(anchor_index + 1) {
                for dependency in &mut following.dependencies {
                    if dependency.dependency == insertion.anchor {
                        dependency.dependency = last_new;
                    }
                }
                debug!(
                    following_id = %following.id,
                    last_new_id = %last_new,
                    "rewired following phase behind inserted phases"
                );
            }
        }

        let inserted: Vec<PhaseType> = new_phases.iter().map(|p| p.phase_type).collect();
        let tail = project.phases.split_off(anchor_index + 1);
        project.phases.extend(new_phases);
        project.phases.extend(tail);

        self.reschedule(project)?;

        info!(
            project_id = %project.id,
            anchor_id = %insertion.anchor,
            anchor_index,
            inserted = ?inserted,
            "spliced phases into project"
        );

        Ok(anchor_index)
    }

    /// Recompute scheduled dates for every phase, in sequence order.
    pub fn reschedule(&self, project: &mut Project) -> PhaseResult<()> {
        for index in 0..project.phases.len() {
            let start = self.calendar.start_date(project, &project.phases[index])?;
            project.phases[index].scheduled_start = start;
            let end = self.calendar.end_date(project, &project.phases[index])?;
            project.phases[index].scheduled_end = end;
        }
        Ok(())
    }

    fn duration_for(&self, project: &Project, phase_type: PhaseType) -> i64 {
        project
            .last_phase_of_type(phase_type)
            .map(|p| p.length_ms)
            .or_else(|| self.fallback_durations_ms.get(&phase_type).copied())
            .unwrap_or(0)
    }
}

/// Find the nearest phase of `phase_type` before (`forward == false`) or after
/// the phase at `from`, excluding `from` itself.
pub fn locate_phase(
    project: &Project,
    from: Uuid,
    phase_type: PhaseType,
    forward: bool,
    required: bool,
) -> PhaseResult<Option<&Phase>> {
    let index = project
        .index_of(from)
        .ok_or(PhaseHandlingError::PhaseNotFound(from))?;

    let found = if forward {
        project.phases[index + 1..]
            .iter()
            .find(|p| p.phase_type == phase_type)
    } else {
        project.phases[..index]
            .iter()
            .rev()
            .find(|p| p.phase_type == phase_type)
    };

    if found.is_none() && required {
        return Err(PhaseHandlingError::PhaseTypeNotFound { phase_type });
    }
    Ok(found)
}

/// A phase is first when only phases starting at the same moment precede it.
///
/// Start moments come from `calendar`, so stored dates left stale by a splice
/// do not matter.
pub fn is_first_phase(project: &Project, phase_id: Uuid, calendar: &dyn PhaseCalendar) -> PhaseResult<bool> {
    let mut index = project
        .index_of(phase_id)
        .ok_or(PhaseHandlingError::PhaseNotFound(phase_id))?;

    let start = calendar.start_date(project, &project.phases[index])?;
    while index > 0 && calendar.start_date(project, &project.phases[index - 1])? == start {
        index -= 1;
    }
    Ok(index == 0)
}
