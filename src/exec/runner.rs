/// Bounded process execution
///
/// Both the compile and the run step go through [`run_bounded`]: spawn in a
/// fresh process group, stream stdin/stdout through files, keep stderr in
/// memory, and kill the whole group once the wall-clock bound is exceeded.
use crate::config::types::{JudgeError, Result};
use crate::kernel::rlimits::ResourceLimits;
use crate::utils::output::StreamCollector;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::os::unix::process::{CommandExt, ExitStatusExt};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to wait for the stderr pipe to close after the process is gone.
const STDERR_GRACE: Duration = Duration::from_secs(1);
const DEFAULT_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

#[derive(Debug, Clone)]
pub enum StdinSource {
    Null,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub enum StdoutSink {
    Null,
    File(PathBuf),
    /// Keep up to `stderr_cap` bytes in memory; for short tool probes
    Capture,
}

/// Everything needed to launch one step.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub command: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub environment: Vec<(String, String)>,
    pub stdin: StdinSource,
    pub stdout: StdoutSink,
    pub timeout: Duration,
    pub limits: ResourceLimits,
    pub stderr_cap: usize,
}

impl RunRequest {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self {
            command,
            workdir: None,
            environment: Vec::new(),
            stdin: StdinSource::Null,
            stdout: StdoutSink::Null,
            timeout,
            limits: ResourceLimits::none(),
            stderr_cap: 64 * 1024,
        }
    }
}

/// How a step ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    /// Only filled for [`StdoutSink::Capture`]
    pub stdout: String,
    pub stderr: String,
    pub stderr_truncated: bool,
    /// The judge killed the process for exceeding the wall-clock bound
    pub timed_out: bool,
    pub wall_time_ms: u64,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Killed by the kernel for exceeding RLIMIT_CPU.
    pub fn cpu_limit_hit(&self) -> bool {
        #[cfg(unix)]
        {
            self.signal == Some(libc::SIGXCPU)
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Killed by the kernel for exceeding RLIMIT_FSIZE.
    pub fn file_size_limit_hit(&self) -> bool {
        #[cfg(unix)]
        {
            self.signal == Some(libc::SIGXFSZ)
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    pub fn signal_name(&self) -> Option<String> {
        let sig = self.signal?;
        Some(
            nix::sys::signal::Signal::try_from(sig)
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|_| format!("signal {}", sig)),
        )
    }
}

/// Spawn `request.command` and wait for it under the wall-clock bound.
///
/// A command that cannot be found yields [`JudgeError::ToolchainMissing`];
/// any other launch failure is a [`JudgeError::Process`].
pub fn run_bounded(request: &RunRequest) -> Result<ProcessOutcome> {
    let program = request
        .command
        .first()
        .ok_or_else(|| JudgeError::Internal("Empty command provided".to_string()))?;

    let mut cmd = Command::new(program);
    cmd.args(&request.command[1..]);
    if let Some(dir) = &request.workdir {
        cmd.current_dir(dir);
    }

    cmd.env_clear();
    cmd.env(
        "PATH",
        std::env::var("PATH").unwrap_or_else(|_| DEFAULT_PATH.to_string()),
    );
    cmd.env("LANG", "C.UTF-8");
    for (key, value) in &request.environment {
        cmd.env(key, value);
    }

    cmd.stdin(match &request.stdin {
        StdinSource::Null => Stdio::null(),
        StdinSource::File(path) => Stdio::from(open_input(path)?),
    });
    cmd.stdout(match &request.stdout {
        StdoutSink::Null => Stdio::null(),
        StdoutSink::File(path) => Stdio::from(open_output(path)?),
        StdoutSink::Capture => Stdio::piped(),
    });
    cmd.stderr(Stdio::piped());

    #[cfg(unix)]
    {
        cmd.process_group(0);
        if !request.limits.is_empty() {
            let limits = request.limits.clone();
            // SAFETY: `apply` only calls getrlimit/setrlimit.
            unsafe {
                cmd.pre_exec(move || limits.apply());
            }
        }
    }

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => JudgeError::ToolchainMissing(format!(
            "'{}' was not found in PATH",
            program
        )),
        _ => JudgeError::Process(format!("Failed to start '{}': {}", program, e)),
    })?;

    let stdout = child
        .stdout
        .take()
        .map(|pipe| StreamCollector::spawn(pipe, request.stderr_cap));
    let stderr = child
        .stderr
        .take()
        .map(|pipe| StreamCollector::spawn(pipe, request.stderr_cap));

    let (status, timed_out) = wait_with_timeout(&mut child, request.timeout, started)?;
    let wall_time_ms = started.elapsed().as_millis() as u64;

    let captured_stdout = stdout
        .map(|collector| collector.finish(STDERR_GRACE))
        .unwrap_or_default();
    let captured = stderr
        .map(|collector| collector.finish(STDERR_GRACE))
        .unwrap_or_default();

    let outcome = ProcessOutcome {
        exit_code: status.code(),
        signal: exit_signal(&status),
        stdout: captured_stdout.text(),
        stderr: captured.text(),
        stderr_truncated: captured.truncated,
        timed_out,
        wall_time_ms,
    };

    log::debug!(
        "'{}' finished: exit={:?} signal={:?} timed_out={} wall={}ms",
        program,
        outcome.exit_code,
        outcome.signal,
        outcome.timed_out,
        outcome.wall_time_ms
    );

    Ok(outcome)
}

/// Wait for the leader, then SIGKILL its whole group, then reap it.
///
/// The group is swept while the leader is still unreaped: its pid, and with
/// it the group id, cannot be handed to another process until then.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    started: Instant,
) -> Result<(ExitStatus, bool)> {
    let timed_out = loop {
        match leader_exited(child) {
            Ok(true) => break false,
            Ok(false) => {
                if started.elapsed() >= timeout {
                    log::debug!("pid {} exceeded {:?}, killing process group", child.id(), timeout);
                    break true;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill_process_group(child);
                let _ = child.wait();
                return Err(JudgeError::Process(format!("wait failed: {}", e)));
            }
        }
    };

    // Descendants that outlived the leader must not outlive the step.
    if timed_out || SWEEP_AFTER_EXIT {
        kill_process_group(child);
    }
    let status = child
        .wait()
        .map_err(|e| JudgeError::Process(format!("wait failed: {}", e)))?;
    Ok((status, timed_out))
}

/// Whether the group can be swept after a normal exit without racing pid
/// reuse, i.e. whether exit can be observed without reaping.
const SWEEP_AFTER_EXIT: bool = cfg!(any(target_os = "linux", target_os = "android"));

/// Has the leader exited? Leaves it unreaped.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn leader_exited(child: &mut Child) -> std::io::Result<bool> {
    use nix::errno::Errno;
    use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};
    use nix::unistd::Pid;

    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
    match waitid(Id::Pid(Pid::from_raw(child.id() as i32)), flags) {
        Ok(WaitStatus::StillAlive) => Ok(false),
        Ok(_) => Ok(true),
        Err(Errno::EINTR) => Ok(false),
        Err(e) => Err(std::io::Error::from(e)),
    }
}

/// Has the leader exited? Reaps it, so the group is not swept afterwards.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn leader_exited(child: &mut Child) -> std::io::Result<bool> {
    child.try_wait().map(|status| status.is_some())
}

/// SIGKILL the child's process group. Errors mean the group is already empty.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL).is_ok() {
            return;
        }
    }
    let _ = child.kill();
}

fn exit_signal(status: &ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        status.signal()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        JudgeError::Internal(format!("Failed to open stdin file {}: {}", path.display(), e))
    })
}

fn open_output(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| {
            JudgeError::Internal(format!("Failed to open stdout file {}: {}", path.display(), e))
        })
}
