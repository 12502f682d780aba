//! Thin wrappers around kernel resource controls.
//!
//! All `unsafe` rlimit calls are concentrated here.

pub mod rlimits;
