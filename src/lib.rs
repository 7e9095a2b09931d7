//! review-phases - phase lifecycle engine for contest review workflows
//!
//! A contest project is an ordered graph of phases (Submission, Screening,
//! Review, Appeals, ...). For every phase type the engine answers whether the
//! phase may open or close right now, and performs the side effects of opening
//! or closing it: tallying scores, picking winners, splicing rework phases into
//! the graph and dispatching timeline notifications.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): workflow models, port traits and errors
//! - **Service Layer** (`services`): dependency evaluation, graph mutation and the phase handlers
//! - **Adapters** (`adapters`): in-memory stores, scoring, calendar and notification sinks
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface over a workflow snapshot
//!
//! # Example
//!
//! ```ignore
//! use review_phases::{EngineConfig, PhaseEngine};
//!
//! let engine = PhaseEngine::new(managers, EngineConfig::default());
//! if engine.can_perform(&project, phase_id).await? {
//!     engine.perform(&mut project, phase_id, "operator").await?;
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{PhaseHandlingError, PhaseResult};
pub use domain::models::{
    EngineConfig, FieldBag, FieldValue, Phase, PhaseOperation, PhaseStatus, PhaseType, Project,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{DependencyEvaluator, Managers, PhaseEngine, PhaseHandler, Transition};
