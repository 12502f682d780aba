/// Configuration loading from judgebox.json and the environment
use crate::config::types::{JudgeError, Limits, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "JUDGEBOX_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "judgebox.json";

/// Commands used to find each toolchain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolchainConfig {
    pub cpp_compiler: String,
    /// Probed in order; the first that answers `--version` wins
    pub python_candidates: Vec<String>,
    pub javac: String,
    pub java: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            cpp_compiler: "g++".to_string(),
            python_candidates: vec![
                "python3".to_string(),
                "python".to_string(),
                "py".to_string(),
            ],
            javac: "javac".to_string(),
            java: "java".to_string(),
        }
    }
}

/// Process-wide judge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JudgeConfig {
    /// Root under which per-job workspaces are created
    pub workspace_root: PathBuf,
    /// Defaults applied to jobs that carry no limits of their own
    pub limits: Limits,
    /// Bytes of stderr kept in memory per step
    pub stderr_byte_cap: usize,
    pub probe_timeout_ms: u64,
    pub toolchains: ToolchainConfig,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            workspace_root: Self::runtime_root_dir(),
            limits: Limits::default(),
            stderr_byte_cap: 64 * 1024,
            probe_timeout_ms: 2000,
            toolchains: ToolchainConfig::default(),
        }
    }
}

impl JudgeConfig {
    /// Runtime root directory scoped by effective UID.
    /// Keeps root and non-root judges from colliding in the shared temp dir.
    pub fn runtime_root_dir() -> PathBuf {
        let euid = unsafe { libc::geteuid() };
        std::env::temp_dir().join(format!("judgebox-uid-{}", euid))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            JudgeError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: JudgeConfig = serde_json::from_str(&content)
            .map_err(|e| JudgeError::Config(format!("Failed to parse config JSON: {}", e)))?;

        Ok(config)
    }

    /// Defaults, then `$JUDGEBOX_CONFIG` or `./judgebox.json`, then env overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_from_file(PathBuf::from(path))?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::load_from_file(local)?
                } else {
                    log::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.limits.validate()?;
        Ok(config)
    }

    /// Apply `JUDGEBOX_*` overrides. The lookup is injected so tests never
    /// touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("JUDGEBOX_WORKSPACE_ROOT") {
            self.workspace_root = PathBuf::from(root);
        }
        if let Some(mb) = lookup("JUDGEBOX_MEMORY_MB") {
            self.limits.memory_bytes = parse_u64("JUDGEBOX_MEMORY_MB", &mb)?
                .checked_mul(1024 * 1024)
                .ok_or_else(|| {
                    JudgeError::Config(format!("JUDGEBOX_MEMORY_MB={mb:?} is too large"))
                })?;
        }
        if let Some(secs) = lookup("JUDGEBOX_TIME_LIMIT_SECS") {
            let secs = parse_u64("JUDGEBOX_TIME_LIMIT_SECS", &secs)?;
            self.limits.cpu_time_seconds = secs;
            self.limits.wall_clock_timeout_seconds = secs;
        }
        if let Some(cap) = lookup("JUDGEBOX_OUTPUT_CAP_BYTES") {
            self.limits.output_byte_cap = parse_u64("JUDGEBOX_OUTPUT_CAP_BYTES", &cap)?;
        }
        Ok(())
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| JudgeError::Config(format!("{key}={value:?} is not a number: {e}")))
}
