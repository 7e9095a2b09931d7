use std::sync::Arc;

use crate::domain::ports::{
    Notifier, PhaseCalendar, PhaseStore, ProjectStore, ResourceStore, ReviewStore, ScoreAggregator,
    ScorecardStore, TermsOfUseChecker, UploadStore,
};

/// The external collaborators every phase handler consumes.
///
/// Built once by the host application and shared read-only by the engine.
#[derive(Clone)]
pub struct Managers {
    pub phases: Arc<dyn PhaseStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub scorecards: Arc<dyn ScorecardStore>,
    pub aggregator: Arc<dyn ScoreAggregator>,
    pub calendar: Arc<dyn PhaseCalendar>,
    pub terms: Arc<dyn TermsOfUseChecker>,
    pub notifier: Arc<dyn Notifier>,
}
