//! Port trait definitions (Hexagonal Architecture)
//!
//! The engine depends only on these narrow interfaces; hosts inject
//! implementations:
//! - PhaseStore / ProjectStore: phase sequences and project properties
//! - ResourceStore / ReviewStore / UploadStore / ScorecardStore
//! - ScoreAggregator: aggregation and ranking arithmetic
//! - PhaseCalendar: scheduled date calculation
//! - TermsOfUseChecker and Notifier

pub mod errors;
pub mod notifier;
pub mod phase_calendar;
pub mod phase_store;
pub mod project_store;
pub mod resource_store;
pub mod review_store;
pub mod score_aggregator;
pub mod scorecard_store;
pub mod terms_of_use;
pub mod upload_store;

pub use errors::StoreError;
pub use notifier::{Notification, Notifier};
pub use phase_calendar::PhaseCalendar;
pub use phase_store::PhaseStore;
pub use project_store::ProjectStore;
pub use resource_store::{ResourceFilter, ResourceStore};
pub use review_store::{ReviewFilter, ReviewStore};
pub use score_aggregator::{AggregatedScore, RankedSubmission, ScoreAggregator, SubmissionScores};
pub use scorecard_store::ScorecardStore;
pub use terms_of_use::TermsOfUseChecker;
pub use upload_store::{SubmissionFilter, UploadFilter, UploadStore};
