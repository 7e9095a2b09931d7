//! Dependency-driven phase calendar.

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::errors::{PhaseHandlingError, PhaseResult};
use crate::domain::models::{Phase, PhaseStatus, Project};
use crate::domain::ports::PhaseCalendar;

/// Derives the dates of scheduled phases from their dependency edges.
///
/// A phase that has already opened keeps its stored dates, as does a phase
/// without dependencies. For a scheduled phase with dependencies, every edge
/// proposes a start from the dependency's start or end plus the lag; the
/// latest proposal wins. Edges anchored on the dependent's end are shifted
/// back by the phase length.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyCalendar;

impl DependencyCalendar {
    pub fn new() -> Self {
        Self
    }
}

/// `time + ms`, or a data-integrity error when the result is out of range.
fn offset(time: DateTime<Utc>, ms: i64, phase: &Phase) -> PhaseResult<DateTime<Utc>> {
    TimeDelta::try_milliseconds(ms)
        .and_then(|delta| time.checked_add_signed(delta))
        .ok_or_else(|| {
            PhaseHandlingError::DataIntegrity(format!(
                "Offset of {ms} ms from {time} is out of range for phase {}.",
                phase.id
            ))
        })
}

impl PhaseCalendar for DependencyCalendar {
    fn start_date(&self, project: &Project, phase: &Phase) -> PhaseResult<Option<DateTime<Utc>>> {
        if phase.status != PhaseStatus::Scheduled || phase.dependencies.is_empty() {
            return Ok(phase.scheduled_start);
        }

        let mut latest: Option<DateTime<Utc>> = None;
        for edge in &phase.dependencies {
            let Some(dependency) = project.phase(edge.dependency) else {
                continue;
            };
            let anchor = if edge.anchors_on_dependency_start {
                dependency.scheduled_start
            } else {
                dependency.scheduled_end
            };
            let Some(anchor) = anchor else {
                continue;
            };
            let proposed = offset(anchor, edge.lag_ms, phase)?;
            let proposed = if edge.anchors_on_dependent_start {
                proposed
            } else {
                offset(proposed, phase.length_ms.saturating_neg(), phase)?
            };
            latest = latest.max(Some(proposed));
        }
        Ok(latest.or(phase.scheduled_start))
    }

    fn end_date(&self, project: &Project, phase: &Phase) -> PhaseResult<Option<DateTime<Utc>>> {
        if phase.status == PhaseStatus::Closed {
            if let Some(end) = phase.scheduled_end {
                return Ok(Some(end));
            }
        }
        self.start_date(project, phase)?
            .map(|start| offset(start, phase.length_ms, phase))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Dependency, PhaseType};
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_scheduled_phase_follows_latest_dependency() {
        let first = Phase::new(PhaseType::Review, 3_600_000).with_schedule(at(0), at(1));
        let second = Phase::new(PhaseType::Appeals, 3_600_000).with_schedule(at(0), at(4));
        let dependent = Phase::new(PhaseType::AppealsResponse, 7_200_000)
            .with_dependency(Dependency::finish_to_start(first.id))
            .with_dependency(Dependency::new(second.id, false, true, 1_800_000));
        let project = Project::new()
            .with_phase(first)
            .with_phase(second)
            .with_phase(dependent.clone());

        let calendar = DependencyCalendar;
        let start = calendar.start_date(&project, &dependent).unwrap().unwrap();
        assert_eq!(start, at(4) + Duration::minutes(30));
        assert_eq!(calendar.end_date(&project, &dependent).unwrap().unwrap(), start + Duration::hours(2));
    }

    #[test]
    fn test_started_phase_keeps_stored_start() {
        let gate = Phase::new(PhaseType::Review, 1000).with_schedule(at(5), at(6));
        let open = Phase::new(PhaseType::Appeals, 3_600_000)
            .with_status(PhaseStatus::Open)
            .with_schedule(at(2), at(3))
            .with_dependency(Dependency::finish_to_start(gate.id));
        let project = Project::new().with_phase(gate).with_phase(open.clone());

        assert_eq!(DependencyCalendar.start_date(&project, &open).unwrap(), Some(at(2)));
    }

    #[test]
    fn test_end_anchored_edge_shifts_start_back() {
        let gate = Phase::new(PhaseType::Review, 1000).with_schedule(at(0), at(10));
        let dependent = Phase::new(PhaseType::Appeals, 3_600_000).with_dependency(Dependency::new(gate.id, false, false, 0));
        let project = Project::new().with_phase(gate).with_phase(dependent.clone());

        assert_eq!(DependencyCalendar.start_date(&project, &dependent).unwrap(), Some(at(9)));
    }

    #[test]
    fn test_out_of_range_lag_is_data_error() {
        let gate = Phase::new(PhaseType::Review, 1000).with_schedule(at(0), at(1));
        let dependent = Phase::new(PhaseType::Appeals, 3_600_000)
            .with_dependency(Dependency::new(gate.id, false, true, i64::MAX));
        let project = Project::new().with_phase(gate).with_phase(dependent.clone());

        let err = DependencyCalendar.start_date(&project, &dependent).unwrap_err();
        assert!(matches!(err, PhaseHandlingError::DataIntegrity(_)));
    }

    #[test]
    fn test_out_of_range_length_is_data_error() {
        let open = Phase::new(PhaseType::Appeals, i64::MAX)
            .with_status(PhaseStatus::Open)
            .with_schedule(at(0), at(1));
        let project = Project::new().with_phase(open.clone());

        assert_eq!(DependencyCalendar.start_date(&project, &open).unwrap(), Some(at(0)));
        let err = DependencyCalendar.end_date(&project, &open).unwrap_err();
        assert!(matches!(err, PhaseHandlingError::DataIntegrity(_)));
    }
}
