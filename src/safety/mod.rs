//! Safety and cleanup
//!
//! Run-scoped workspaces that are always removed, whatever the job's outcome.

pub mod workspace;
