//! In-memory workflow state for tests and the command-line tool.

pub mod snapshot;
pub mod store;

pub use snapshot::{LinkedProject, PendingTerms, SnapshotError, WorkflowSnapshot};
pub use store::InMemoryWorkflowStore;
