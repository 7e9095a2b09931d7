//! Domain layer for the phase lifecycle engine
//!
//! This module contains the workflow models, the port traits the engine
//! consumes, and the engine's error type.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{PhaseHandlingError, PhaseResult};
