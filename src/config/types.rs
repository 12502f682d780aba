/// Core types and structures for the judgebox engine
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Languages the judge knows how to build and run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Language {
    /// Compiled-native (C++)
    #[serde(rename = "cpp")]
    Cpp,
    /// Interpreted-script (Python)
    #[serde(rename = "python")]
    Python,
    /// Compiled-managed (Java)
    #[serde(rename = "java")]
    Java,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Cpp, Language::Python, Language::Java];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Python => "python",
            Language::Java => "java",
        }
    }

    /// Human-facing toolchain family name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Cpp => "C++",
            Language::Python => "Python",
            Language::Java => "Java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = JudgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpp" | "c++" | "cxx" | "cc" => Ok(Language::Cpp),
            "py" | "python" | "python3" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            other => Err(JudgeError::Validation(format!(
                "unsupported language: {other:?} (supported: cpp, python, java)"
            ))),
        }
    }
}

/// Resource limits for a single job.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
    /// CPU time allowed to the run step (RLIMIT_CPU)
    pub cpu_time_seconds: u64,
    /// Wall-clock bound on the run step
    pub wall_clock_timeout_seconds: u64,
    /// Address-space limit for the run step, in bytes
    pub memory_bytes: u64,
    /// Maximum bytes of stdout the program may produce
    pub output_byte_cap: u64,
    /// Wall-clock bound on the compile step
    pub compile_timeout_seconds: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            cpu_time_seconds: 5,
            wall_clock_timeout_seconds: 5,
            memory_bytes: 256 * 1024 * 1024,
            output_byte_cap: 1024 * 1024,
            compile_timeout_seconds: 10,
        }
    }
}

impl Limits {
    pub fn wall_clock_timeout(&self) -> Duration {
        Duration::from_secs(self.wall_clock_timeout_seconds)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_seconds)
    }

    pub fn memory_mb(&self) -> u64 {
        (self.memory_bytes / (1024 * 1024)).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.cpu_time_seconds, "cpu_time_seconds"),
            (self.wall_clock_timeout_seconds, "wall_clock_timeout_seconds"),
            (self.memory_bytes, "memory_bytes"),
            (self.output_byte_cap, "output_byte_cap"),
            (self.compile_timeout_seconds, "compile_timeout_seconds"),
        ];
        for (value, name) in checks {
            if value == 0 {
                return Err(JudgeError::Validation(format!("limit {name} must be non-zero")));
            }
        }
        Ok(())
    }
}

/// A unit of work handed to the judge. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    language: Language,
    source_code: String,
    stdin: String,
    expected_output: Option<String>,
    entry_point: Option<String>,
    limits: Option<Limits>,
}

impl Job {
    pub fn new(language: Language, source_code: impl Into<String>) -> Self {
        Self {
            language,
            source_code: source_code.into(),
            stdin: String::new(),
            expected_output: None,
            entry_point: None,
            limits: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    /// Explicit entry point (the public class name for Java).
    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = Some(name.into());
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn stdin(&self) -> &str {
        &self.stdin
    }

    pub fn expected_output(&self) -> Option<&str> {
        self.expected_output.as_deref()
    }

    pub fn entry_point(&self) -> Option<&str> {
        self.entry_point.as_deref()
    }

    pub fn limits(&self) -> Option<&Limits> {
        self.limits.as_ref()
    }
}

/// Final classification of a judged execution - CLOSED SET
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Output matches the expected output
    #[serde(rename = "AC")]
    Accepted,
    /// Output differs from the expected output
    #[serde(rename = "WA")]
    WrongAnswer,
    /// Compile step failed
    #[serde(rename = "CE")]
    CompileError,
    /// Wall-clock or CPU time limit exceeded
    #[serde(rename = "TLE")]
    TimeLimit,
    /// Memory exhaustion (best-effort attribution)
    #[serde(rename = "MLE")]
    MemoryLimit,
    /// Any other abnormal termination
    #[serde(rename = "RTE")]
    RuntimeError,
    /// Output exceeded the cap
    #[serde(rename = "OLE")]
    OutputLimit,
}

impl Verdict {
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::WrongAnswer => "WA",
            Verdict::CompileError => "CE",
            Verdict::TimeLimit => "TLE",
            Verdict::MemoryLimit => "MLE",
            Verdict::RuntimeError => "RTE",
            Verdict::OutputLimit => "OLE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which classification rule produced the verdict.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerdictCause {
    #[serde(rename = "ce_compiler")]
    CeCompiler,
    #[serde(rename = "ce_compile_timeout")]
    CeCompileTimeout,
    #[serde(rename = "tle_wall")]
    TleWall,
    #[serde(rename = "tle_cpu")]
    TleCpu,
    #[serde(rename = "ole_cap")]
    OleCap,
    #[serde(rename = "mle_signal")]
    MleSignal,
    #[serde(rename = "mle_marker")]
    MleMarker,
    #[serde(rename = "re_nonzero_exit")]
    ReNonzeroExit,
    #[serde(rename = "re_fatal_signal")]
    ReFatalSignal,
    #[serde(rename = "re_toolchain_missing")]
    ReToolchainMissing,
    #[serde(rename = "output_match")]
    OutputMatch,
    #[serde(rename = "output_mismatch")]
    OutputMismatch,
    #[serde(rename = "normal_exit")]
    NormalExit,
}

/// Result handed back to the caller; the judge keeps no reference to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// `None` for a raw run without expected output that completed cleanly
    pub verdict: Option<Verdict>,
    pub cause: VerdictCause,
    /// Captured stdout, never longer than the output cap
    pub stdout: String,
    /// Compiler diagnostics or captured stderr of the run
    pub stderr: String,
    /// Extra diagnostic text (toolchain missing, empty output notice, ...)
    pub message: Option<String>,
    pub exit_code: Option<i32>,
    pub exit_signal: Option<i32>,
    pub wall_time_ms: u64,
    pub output_truncated: bool,
}

impl ExecutionResult {
    /// True for `AC` and for a raw run that completed cleanly.
    pub fn is_success(&self) -> bool {
        matches!(self.verdict, None | Some(Verdict::Accepted))
    }

    pub fn verdict_code(&self) -> &'static str {
        self.verdict.map(|v| v.code()).unwrap_or("OK")
    }
}

/// Orchestrator states for one job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Allocating,
    Compiling,
    Running,
    Classifying,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Queued => "queued",
            JobState::Allocating => "allocating",
            JobState::Compiling => "compiling",
            JobState::Running => "running",
            JobState::Classifying => "classifying",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Custom error types for judgebox
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Toolchain not found: {0}")]
    ToolchainMissing(String),

    #[error("Process error: {0}")]
    Process(String),
}

impl JudgeError {
    /// Failures of the judge itself rather than of the submitted program.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            JudgeError::Internal(_) | JudgeError::Io(_) | JudgeError::Process(_)
        )
    }
}

/// Result type alias for judgebox operations
pub type Result<T> = std::result::Result<T, JudgeError>;
