//! Utilities
//!
//! Bounded output collection shared by the process runner.

pub mod output;
