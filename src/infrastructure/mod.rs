//! Infrastructure layer module
//!
//! Configuration loading and logging setup for the command-line host.

pub mod config;
pub mod logging;
