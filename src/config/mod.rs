//! Configuration
//!
//! Shared data model, error taxonomy, and process-wide defaults.

pub mod config;
pub mod types;
