//! judgebox: compile-and-run judging engine for untrusted submissions
//!
//! # Architecture
//!
//! ## Execution Control ([`exec`])
//! - [`exec::orchestrator`]: [`Judge`], the public entry point and per-job state machine
//! - [`exec::runner`]: Bounded subprocess execution with process-group kill
//!
//! ## Judge Adapters ([`judge`])
//! - [`judge::adapter`]: Language-agnostic compile/run contract
//! - [`judge::languages`]: C++, Python and Java adapters
//! - [`judge::toolchain`]: Memoized toolchain discovery
//!
//! ## Resource Limits ([`kernel`])
//! - [`kernel::rlimits`]: CPU, address-space, file-size and core-dump limits applied pre-exec
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::verdict`]: Priority-ordered verdict classification
//!
//! ## Safety & Cleanup ([`safety`])
//! - [`safety::workspace`]: Run-scoped workspaces released on every exit path
//!
//! ## Configuration ([`config`])
//! - [`config::config`]: Configuration loading and environment overrides
//! - [`config::types`]: Jobs, limits, verdicts and the error taxonomy
//!
//! ## Utilities ([`utils`])
//! - [`utils::output`]: Bounded output collection
//!
//! # Example
//!
//! ```no_run
//! use judgebox::{Judge, JudgeConfig, Language, Verdict};
//!
//! let judge = Judge::new(JudgeConfig::default());
//! let source = "#include <iostream>\nint main(){int a,b;std::cin>>a>>b;std::cout<<a+b<<'\\n';}";
//! let result = judge.judge(Language::Cpp, source, "2 3\n", "5\n")?;
//! assert_eq!(result.verdict, Some(Verdict::Accepted));
//! # Ok::<(), judgebox::JudgeError>(())
//! ```

// Resource limits
pub mod kernel;

// Execution Control
pub mod exec;

// Judge adapters (language-specific compile/run commands)
pub mod judge;

// Verdict
pub mod verdict;

// Safety & Cleanup
pub mod safety;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the judge binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::config::JudgeConfig;
pub use config::types::*;
pub use exec::orchestrator::Judge;
