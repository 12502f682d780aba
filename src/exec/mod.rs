//! Execution control
//!
//! Bounded subprocess execution and the per-job orchestration built on it.

pub mod orchestrator;
pub mod runner;
