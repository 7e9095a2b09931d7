//! Phase handlers.
//!
//! One [`PhaseHandler`] per phase type supplies the type-specific readiness
//! predicates and transition side effects. [`PhaseEngine`] is the thin driver
//! on top: it checks the phase type, enforces the `Scheduled` → `Open` →
//! `Closed` state machine, evaluates dependencies and timing, then notifies.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::PhaseResult;
use crate::domain::models::{FieldBag, PhaseType};

pub mod context;
pub mod engine;

pub mod aggregation;
pub mod aggregation_review;
pub mod appeals;
pub mod appeals_response;
pub mod approval;
pub mod final_fix;
pub mod final_review;
pub mod post_mortem;
pub mod review;
pub mod screening;
pub mod specification_review;
pub mod specification_submission;
pub mod submission;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregation::AggregationHandler;
pub use aggregation_review::AggregationReviewHandler;
pub use appeals::AppealsHandler;
pub use appeals_response::AppealsResponseHandler;
pub use approval::ApprovalHandler;
pub use context::{PhaseContext, TransitionContext};
pub use engine::{PhaseEngine, Transition};
pub use final_fix::FinalFixHandler;
pub use final_review::FinalReviewHandler;
pub use post_mortem::PostMortemHandler;
pub use review::ReviewHandler;
pub use screening::ScreeningHandler;
pub use specification_review::SpecificationReviewHandler;
pub use specification_submission::SpecificationSubmissionHandler;
pub use submission::SubmissionHandler;

/// Result strings written to the `RESULT` field.
pub const RESULT_APPROVED: &str = "Approved";
pub const RESULT_REJECTED: &str = "Rejected";

/// Type-specific half of a phase's lifecycle.
///
/// Dependencies, the scheduled start time and the phase status are checked by
/// the engine before these are called.
#[async_trait]
pub trait PhaseHandler: Send + Sync {
    /// The phase type this handler serves.
    fn phase_type(&self) -> PhaseType;

    /// Business conditions for opening a `Scheduled` phase.
    async fn start_ready(&self, _ctx: &PhaseContext<'_>) -> PhaseResult<bool> {
        Ok(true)
    }

    /// Conditions for closing an `Open` phase, beyond its dependencies.
    async fn end_ready(&self, ctx: &PhaseContext<'_>) -> PhaseResult<bool>;

    /// Side effects of opening the phase; returns the notification fields.
    async fn on_start(&self, _ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        Ok(FieldBag::new())
    }

    /// Side effects of closing the phase; returns the notification fields.
    async fn on_end(&self, _ctx: &mut TransitionContext<'_>) -> PhaseResult<FieldBag> {
        Ok(FieldBag::new())
    }
}

/// One handler per workflow phase type. Registration has none.
pub fn builtin_handlers() -> Vec<Arc<dyn PhaseHandler>> {
    vec![
        Arc::new(SubmissionHandler),
        Arc::new(ScreeningHandler),
        Arc::new(ReviewHandler),
        Arc::new(AppealsHandler),
        Arc::new(AppealsResponseHandler),
        Arc::new(AggregationHandler),
        Arc::new(AggregationReviewHandler),
        Arc::new(FinalFixHandler),
        Arc::new(FinalReviewHandler),
        Arc::new(ApprovalHandler),
        Arc::new(PostMortemHandler),
        Arc::new(SpecificationSubmissionHandler),
        Arc::new(SpecificationReviewHandler),
    ]
}
