//! Adapters implementing the domain ports.

pub mod calendar;
pub mod memory;
pub mod notifier;
pub mod scoring;

pub use calendar::DependencyCalendar;
pub use memory::{InMemoryWorkflowStore, WorkflowSnapshot};
pub use notifier::{RecordingNotifier, TracingNotifier};
pub use scoring::AverageScoreAggregator;
