//! Evidence-backed verdict classification
//!
//! Derives verdicts as pure functions over what a step left behind.

pub mod verdict;
