/// Verdict classification
///
/// Maps the evidence of a compile or run step to exactly one verdict.
/// Pure functions: the same evidence always yields the same verdict.
use crate::config::types::{Verdict, VerdictCause};
use crate::exec::runner::ProcessOutcome;
use crate::utils::output::CapturedStream;

/// Everything the classifier looks at for a run step
#[derive(Debug, Clone, Copy)]
pub struct RunEvidence<'a> {
    pub outcome: &'a ProcessOutcome,
    /// Program stdout as read back from the workspace, capped
    pub stdout: &'a CapturedStream,
    pub output_cap: u64,
    pub memory_markers: &'a [&'a str],
    pub expected_output: Option<&'a str>,
}

/// Verdict plus the specific rule that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// `None` when the run was clean and there was nothing to compare against
    pub verdict: Option<Verdict>,
    pub cause: VerdictCause,
}

impl Classification {
    fn new(verdict: Verdict, cause: VerdictCause) -> Self {
        Self {
            verdict: Some(verdict),
            cause,
        }
    }
}

/// Verdict classifier - pure function over evidence
pub struct VerdictClassifier;

impl VerdictClassifier {
    /// `Some(CE)` if the compile step failed, `None` to proceed to the run step.
    pub fn classify_compile(outcome: &ProcessOutcome) -> Option<Classification> {
        if outcome.timed_out {
            return Some(Classification::new(
                Verdict::CompileError,
                VerdictCause::CeCompileTimeout,
            ));
        }
        if !outcome.success() {
            return Some(Classification::new(
                Verdict::CompileError,
                VerdictCause::CeCompiler,
            ));
        }
        None
    }

    /// Classify a finished run step. First matching rule wins:
    /// TLE, OLE, MLE, RTE, then AC/WA (or no verdict for a raw run).
    pub fn classify_run(evidence: &RunEvidence<'_>) -> Classification {
        let outcome = evidence.outcome;

        if outcome.timed_out {
            return Classification::new(Verdict::TimeLimit, VerdictCause::TleWall);
        }
        if outcome.cpu_limit_hit() {
            return Classification::new(Verdict::TimeLimit, VerdictCause::TleCpu);
        }

        if evidence.stdout.total_bytes > evidence.output_cap || outcome.file_size_limit_hit() {
            return Classification::new(Verdict::OutputLimit, VerdictCause::OleCap);
        }

        let abnormal = outcome.signal.is_some() || outcome.exit_code != Some(0);
        if abnormal {
            if Self::is_memory_signal(outcome.signal) {
                return Classification::new(Verdict::MemoryLimit, VerdictCause::MleSignal);
            }
            if Self::has_memory_marker(&outcome.stderr, evidence.memory_markers) {
                return Classification::new(Verdict::MemoryLimit, VerdictCause::MleMarker);
            }
            let cause = if outcome.signal.is_some() {
                VerdictCause::ReFatalSignal
            } else {
                VerdictCause::ReNonzeroExit
            };
            return Classification::new(Verdict::RuntimeError, cause);
        }

        match evidence.expected_output {
            Some(expected) => {
                let actual = evidence.stdout.text();
                if Self::outputs_match(&actual, expected) {
                    Classification::new(Verdict::Accepted, VerdictCause::OutputMatch)
                } else {
                    Classification::new(Verdict::WrongAnswer, VerdictCause::OutputMismatch)
                }
            }
            None => Classification {
                verdict: None,
                cause: VerdictCause::NormalExit,
            },
        }
    }

    /// Equal after dropping trailing whitespace, so a missing or extra final
    /// newline does not matter.
    pub fn outputs_match(actual: &str, expected: &str) -> bool {
        actual.trim_end() == expected.trim_end()
    }

    /// Signals an address-space limit typically ends in: the allocation
    /// fault itself, an abort from the allocator, or an external kill.
    fn is_memory_signal(signal: Option<i32>) -> bool {
        matches!(
            signal,
            Some(libc::SIGKILL) | Some(libc::SIGSEGV) | Some(libc::SIGABRT)
        )
    }

    fn has_memory_marker(stderr: &str, markers: &[&str]) -> bool {
        markers.iter().any(|m| stderr.contains(m))
    }
}
