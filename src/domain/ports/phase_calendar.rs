use chrono::{DateTime, Utc};

use crate::domain::errors::PhaseResult;
use crate::domain::models::{Phase, Project};

/// Date calculation for phases, derived from lengths and dependencies.
///
/// Implementations own the scheduling arithmetic; the engine only asks for
/// dates and writes them back after every graph change. `Ok(None)` means the
/// phase has no date; an error means the stored lengths or lags cannot be
/// represented as a date.
pub trait PhaseCalendar: Send + Sync {
    fn start_date(&self, project: &Project, phase: &Phase) -> PhaseResult<Option<DateTime<Utc>>>;

    fn end_date(&self, project: &Project, phase: &Phase) -> PhaseResult<Option<DateTime<Utc>>>;
}
