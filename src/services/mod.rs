//! Service layer: the lifecycle engine and the algorithms it is built on.

pub mod dependency_evaluator;
pub mod handlers;
pub mod managers;
pub mod notification;
pub mod phase_graph;
pub mod worksheets;

pub use dependency_evaluator::DependencyEvaluator;
pub use handlers::{PhaseEngine, PhaseHandler, Transition};
pub use managers::Managers;
pub use notification::NotificationDispatcher;
pub use phase_graph::{is_first_phase, locate_phase, PhaseGraphMutator, PhaseInsertion};
