/// Execution orchestration
///
/// One call to [`Judge::execute`] walks a job through
/// `queued -> allocating -> compiling -> running -> classifying -> done`.
/// The workspace is an owned handle, so it is released on every exit path
/// including early returns on CE and internal errors.
use crate::config::config::JudgeConfig;
use crate::config::types::{
    ExecutionResult, Job, JobState, JudgeError, Language, Limits, Result, Verdict, VerdictCause,
};
use crate::exec::runner::{run_bounded, ProcessOutcome, RunRequest, StdinSource, StdoutSink};
use crate::judge::adapter::JudgeAdapter;
use crate::judge::registry::adapter_for;
use crate::judge::toolchain::{Toolchain, ToolchainRegistry};
use crate::kernel::rlimits::ResourceLimits;
use crate::safety::workspace::{Workspace, WorkspaceManager};
use crate::utils::output::read_capped;
use crate::verdict::verdict::{RunEvidence, VerdictClassifier};
use std::sync::Arc;

pub const EMPTY_OUTPUT_NOTICE: &str = "program executed successfully (no output)";

/// Reentrant judging engine. Cheap to clone; clones share the toolchain
/// registry and nothing else.
#[derive(Clone)]
pub struct Judge {
    config: Arc<JudgeConfig>,
    workspaces: WorkspaceManager,
    toolchains: Arc<ToolchainRegistry>,
}

/// Tracks and logs the state of one job.
struct Progress {
    job_id: String,
    state: JobState,
}

impl Progress {
    fn new(language: Language) -> Self {
        let progress = Self {
            job_id: format!("{}-pending", language),
            state: JobState::Queued,
        };
        log::debug!("[{}] {}", progress.job_id, progress.state);
        progress
    }

    fn enter(&mut self, next: JobState) {
        log::debug!("[{}] {} -> {}", self.job_id, self.state, next);
        self.state = next;
    }
}

impl Judge {
    pub fn new(config: JudgeConfig) -> Self {
        let toolchains = Arc::new(ToolchainRegistry::new(
            config.toolchains.clone(),
            config.probe_timeout(),
        ));
        Self::with_registry(config, toolchains)
    }

    /// Share an existing toolchain registry between judges.
    pub fn with_registry(config: JudgeConfig, toolchains: Arc<ToolchainRegistry>) -> Self {
        Self {
            workspaces: WorkspaceManager::new(config.workspace_root.clone()),
            config: Arc::new(config),
            toolchains,
        }
    }

    /// Build from defaults, the config file and environment overrides.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(JudgeConfig::load()?))
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn toolchains(&self) -> &ToolchainRegistry {
        &self.toolchains
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Execute with the language given by name. Unknown languages and bad
    /// limits are rejected before anything touches the filesystem.
    pub fn execute_source(
        &self,
        language: &str,
        source_code: &str,
        stdin: &str,
        expected_output: Option<&str>,
        limits: Option<Limits>,
    ) -> Result<ExecutionResult> {
        let language: Language = language.parse()?;
        let mut job = Job::new(language, source_code).with_stdin(stdin);
        if let Some(expected) = expected_output {
            job = job.with_expected_output(expected);
        }
        if let Some(limits) = limits {
            job = job.with_limits(limits);
        }
        self.execute(job)
    }

    /// Raw run: no expected output, no AC/WA.
    pub fn run(&self, language: Language, source_code: &str, stdin: &str) -> Result<ExecutionResult> {
        self.execute(Job::new(language, source_code).with_stdin(stdin))
    }

    /// Judge against an expected output; always yields a verdict.
    pub fn judge(
        &self,
        language: Language,
        source_code: &str,
        stdin: &str,
        expected_output: &str,
    ) -> Result<ExecutionResult> {
        self.execute(
            Job::new(language, source_code)
                .with_stdin(stdin)
                .with_expected_output(expected_output),
        )
    }

    /// Run one job to completion.
    ///
    /// Returns `Err` only for validation failures and internal faults;
    /// everything the submitted program can cause is a verdict.
    pub fn execute(&self, job: Job) -> Result<ExecutionResult> {
        let mut progress = Progress::new(job.language());
        let result = self.execute_inner(&job, &mut progress);
        match &result {
            Ok(res) => {
                progress.enter(JobState::Done);
                log::info!(
                    "[{}] {} job finished: {} ({:?}) in {}ms",
                    progress.job_id,
                    job.language().display_name(),
                    res.verdict_code(),
                    res.cause,
                    res.wall_time_ms
                );
            }
            Err(e) => {
                progress.enter(JobState::Failed);
                log::warn!("[{}] job failed: {}", progress.job_id, e);
            }
        }
        result
    }

    fn execute_inner(&self, job: &Job, progress: &mut Progress) -> Result<ExecutionResult> {
        let limits = job.limits().unwrap_or(&self.config.limits).clone();
        limits.validate()?;

        let adapter = adapter_for(job.language());
        let entry_point = adapter.entry_point(job)?;

        let toolchain = match self.toolchains.resolve(job.language()) {
            Ok(tc) => tc,
            Err(JudgeError::ToolchainMissing(msg)) => return Ok(toolchain_missing(msg, 0)),
            Err(e) => return Err(e),
        };

        progress.enter(JobState::Allocating);
        let mut workspace = self.workspaces.allocate(
            &adapter.source_file_name(&entry_point),
            job.source_code(),
            job.stdin(),
        )?;
        progress.job_id = workspace.run_id().to_string();

        let result = self.compile_and_run(
            job,
            adapter.as_ref(),
            &toolchain,
            &entry_point,
            &limits,
            &mut workspace,
            progress,
        );

        // Drop would do the same; releasing here keeps it ahead of the Done log.
        workspace.release();
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_and_run(
        &self,
        job: &Job,
        adapter: &dyn JudgeAdapter,
        toolchain: &Toolchain,
        entry_point: &str,
        limits: &Limits,
        workspace: &mut Workspace,
        progress: &mut Progress,
    ) -> Result<ExecutionResult> {
        let mut elapsed_ms = 0;

        if let Some(command) = adapter.compile_command(toolchain, workspace, entry_point)? {
            progress.enter(JobState::Compiling);
            let mut request = RunRequest::new(command, limits.compile_timeout());
            request.workdir = Some(workspace.run_dir().to_path_buf());
            request.environment = adapter.environment();
            request.limits = ResourceLimits::for_compile();
            request.stderr_cap = self.config.stderr_byte_cap;

            let outcome = match run_bounded(&request) {
                Ok(o) => o,
                Err(JudgeError::ToolchainMissing(msg)) => return Ok(toolchain_missing(msg, 0)),
                Err(e) => return Err(e),
            };
            elapsed_ms = outcome.wall_time_ms;

            if let Some(classification) = VerdictClassifier::classify_compile(&outcome) {
                let message = compile_failure_message(&outcome, limits);
                return Ok(ExecutionResult {
                    verdict: classification.verdict,
                    cause: classification.cause,
                    stdout: String::new(),
                    stderr: outcome.stderr,
                    message: Some(message),
                    exit_code: outcome.exit_code,
                    exit_signal: outcome.signal,
                    wall_time_ms: elapsed_ms,
                    output_truncated: false,
                });
            }
        }

        progress.enter(JobState::Running);
        let mut request = RunRequest::new(
            adapter.run_command(toolchain, workspace, entry_point, limits)?,
            limits.wall_clock_timeout(),
        );
        request.workdir = Some(adapter.run_workdir(workspace));
        request.environment = adapter.environment();
        request.stdin = StdinSource::File(workspace.stdin_file().to_path_buf());
        request.stdout = StdoutSink::File(workspace.stdout_file().to_path_buf());
        request.limits = ResourceLimits::for_run(limits, adapter.limit_address_space());
        request.stderr_cap = self.config.stderr_byte_cap;

        let outcome = match run_bounded(&request) {
            Ok(o) => o,
            Err(JudgeError::ToolchainMissing(msg)) => {
                return Ok(toolchain_missing(msg, elapsed_ms))
            }
            Err(e) => return Err(e),
        };

        progress.enter(JobState::Classifying);
        let stdout = read_capped(workspace.stdout_file(), limits.output_byte_cap).map_err(|e| {
            JudgeError::Internal(format!(
                "Failed to read program output {}: {}",
                workspace.stdout_file().display(),
                e
            ))
        })?;

        let classification = VerdictClassifier::classify_run(&RunEvidence {
            outcome: &outcome,
            stdout: &stdout,
            output_cap: limits.output_byte_cap,
            memory_markers: adapter.memory_markers(),
            expected_output: job.expected_output(),
        });

        let text = stdout.text();
        let message = run_message(classification.verdict, &outcome, limits, &text);

        Ok(ExecutionResult {
            verdict: classification.verdict,
            cause: classification.cause,
            stdout: text,
            stderr: outcome.stderr,
            message,
            exit_code: outcome.exit_code,
            exit_signal: outcome.signal,
            wall_time_ms: elapsed_ms + outcome.wall_time_ms,
            output_truncated: stdout.truncated,
        })
    }
}

fn toolchain_missing(msg: String, wall_time_ms: u64) -> ExecutionResult {
    ExecutionResult {
        verdict: Some(Verdict::RuntimeError),
        cause: VerdictCause::ReToolchainMissing,
        stdout: String::new(),
        stderr: String::new(),
        message: Some(format!("toolchain missing: {}", msg)),
        exit_code: None,
        exit_signal: None,
        wall_time_ms,
        output_truncated: false,
    }
}

fn compile_failure_message(outcome: &ProcessOutcome, limits: &Limits) -> String {
    if outcome.timed_out {
        return format!(
            "compilation exceeded {}s",
            limits.compile_timeout_seconds
        );
    }
    let diagnostics = outcome.stderr.trim();
    if !diagnostics.is_empty() {
        return diagnostics.to_string();
    }
    match (outcome.exit_code, outcome.signal_name()) {
        (_, Some(signal)) => format!("compiler terminated by {}", signal),
        (Some(code), None) => format!("compiler exited with status {}", code),
        (None, None) => "compilation failed".to_string(),
    }
}

fn run_message(
    verdict: Option<Verdict>,
    outcome: &ProcessOutcome,
    limits: &Limits,
    stdout: &str,
) -> Option<String> {
    match verdict {
        Some(Verdict::TimeLimit) => Some(format!(
            "time limit exceeded ({}s)",
            limits.wall_clock_timeout_seconds
        )),
        Some(Verdict::OutputLimit) => Some(format!(
            "output exceeded {} bytes",
            limits.output_byte_cap
        )),
        Some(Verdict::MemoryLimit) => Some(format!(
            "memory limit exceeded ({} MB)",
            limits.memory_mb()
        )),
        Some(Verdict::RuntimeError) => {
            let status = match outcome.signal_name() {
                Some(signal) => format!("terminated by {}", signal),
                None => format!("exited with status {}", outcome.exit_code.unwrap_or(-1)),
            };
            let stderr = outcome.stderr.trim();
            if stderr.is_empty() {
                Some(status)
            } else {
                Some(format!("{}\n{}", status, stderr))
            }
        }
        None if stdout.is_empty() => Some(EMPTY_OUTPUT_NOTICE.to_string()),
        _ => None,
    }
}
