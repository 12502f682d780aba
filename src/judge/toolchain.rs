//! Toolchain discovery.
//!
//! Each language's toolchain is probed at most once per registry and the
//! outcome (found or missing) is memoized. `OnceCell` blocks concurrent
//! first users until the single probe finishes, so they all observe the same
//! cached answer.

use crate::config::config::ToolchainConfig;
use crate::config::types::{JudgeError, Language, Result};
use crate::exec::runner::{run_bounded, RunRequest, StdoutSink};
use once_cell::sync::OnceCell;
use std::time::Duration;

/// Resolved commands for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub language: Language,
    /// Compiler / syntax checker command, if the language has a build step
    pub compiler: Option<String>,
    /// Interpreter or VM command; `None` for native binaries
    pub runtime: Option<String>,
    /// First line of the version banner, for diagnostics
    pub version: String,
}

impl Toolchain {
    pub fn compiler_or_missing(&self) -> Result<&str> {
        self.compiler.as_deref().ok_or_else(|| {
            JudgeError::ToolchainMissing(format!("no compiler resolved for {}", self.language))
        })
    }

    pub fn runtime_or_missing(&self) -> Result<&str> {
        self.runtime.as_deref().ok_or_else(|| {
            JudgeError::ToolchainMissing(format!("no runtime resolved for {}", self.language))
        })
    }
}

/// Probe outcome; the error is a human-readable reason.
pub type Probed = std::result::Result<Toolchain, String>;

/// Lazily populated, read-only-once-set toolchain registry.
pub struct ToolchainRegistry {
    config: ToolchainConfig,
    probe_timeout: Duration,
    cpp: OnceCell<Probed>,
    python: OnceCell<Probed>,
    java: OnceCell<Probed>,
}

impl ToolchainRegistry {
    pub fn new(config: ToolchainConfig, probe_timeout: Duration) -> Self {
        Self {
            config,
            probe_timeout,
            cpp: OnceCell::new(),
            python: OnceCell::new(),
            java: OnceCell::new(),
        }
    }

    /// Toolchain for `language`, probing on first use.
    pub fn resolve(&self, language: Language) -> Result<Toolchain> {
        let cell = match language {
            Language::Cpp => &self.cpp,
            Language::Python => &self.python,
            Language::Java => &self.java,
        };

        cell.get_or_init(|| {
            let probed = self.probe(language);
            match &probed {
                Ok(tc) => log::info!("{} toolchain: {}", language.display_name(), tc.version),
                Err(e) => log::warn!("{} toolchain unavailable: {}", language.display_name(), e),
            }
            probed
        })
        .clone()
        .map_err(JudgeError::ToolchainMissing)
    }

    pub fn is_available(&self, language: Language) -> bool {
        self.resolve(language).is_ok()
    }

    /// Probe every language; used by dependency checks.
    pub fn report(&self) -> Vec<(Language, Probed)> {
        Language::ALL
            .iter()
            .map(|&lang| {
                let entry = self.resolve(lang).map_err(|e| match e {
                    JudgeError::ToolchainMissing(msg) => msg,
                    other => other.to_string(),
                });
                (lang, entry)
            })
            .collect()
    }

    fn probe(&self, language: Language) -> Probed {
        match language {
            Language::Cpp => {
                let compiler = &self.config.cpp_compiler;
                let version = self.version_of(compiler, "--version")?;
                Ok(Toolchain {
                    language,
                    compiler: Some(compiler.clone()),
                    runtime: None,
                    version,
                })
            }
            Language::Python => {
                let mut failures = Vec::new();
                for candidate in &self.config.python_candidates {
                    match self.version_of(candidate, "--version") {
                        Ok(version) => {
                            return Ok(Toolchain {
                                language,
                                compiler: Some(candidate.clone()),
                                runtime: Some(candidate.clone()),
                                version,
                            })
                        }
                        Err(e) => failures.push(e),
                    }
                }
                Err(format!(
                    "Python interpreter not found (tried {}): {}",
                    self.config.python_candidates.join(", "),
                    failures.join("; ")
                ))
            }
            Language::Java => {
                let javac = &self.config.javac;
                let java = &self.config.java;
                self.version_of(javac, "-version")?;
                let version = self.version_of(java, "-version")?;
                Ok(Toolchain {
                    language,
                    compiler: Some(javac.clone()),
                    runtime: Some(java.clone()),
                    version,
                })
            }
        }
    }

    /// Run `<command> <flag>` and return the first banner line.
    fn version_of(&self, command: &str, flag: &str) -> std::result::Result<String, String> {
        let mut request =
            RunRequest::new(vec![command.to_string(), flag.to_string()], self.probe_timeout);
        request.stdout = StdoutSink::Capture;
        request.stderr_cap = 4096;

        let outcome = run_bounded(&request).map_err(|e| match e {
            JudgeError::ToolchainMissing(_) => format!("'{}' not found", command),
            other => format!("'{}' failed to start: {}", command, other),
        })?;

        if !outcome.success() {
            return Err(format!(
                "'{} {}' did not respond successfully (exit={:?}, timed_out={})",
                command, flag, outcome.exit_code, outcome.timed_out
            ));
        }

        // Some tools (java -version) print the banner on stderr.
        let banner = if outcome.stdout.trim().is_empty() {
            &outcome.stderr
        } else {
            &outcome.stdout
        };
        Ok(banner.lines().next().unwrap_or("").trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn registry_with(config: ToolchainConfig) -> ToolchainRegistry {
        ToolchainRegistry::new(config, Duration::from_secs(2))
    }

    #[test]
    fn test_missing_candidates_report_toolchain_missing() {
        let registry = registry_with(ToolchainConfig {
            python_candidates: vec![
                "judgebox-no-such-python".to_string(),
                "judgebox-no-such-python3".to_string(),
            ],
            ..ToolchainConfig::default()
        });

        let err = registry.resolve(Language::Python).unwrap_err();
        match err {
            JudgeError::ToolchainMissing(msg) => {
                assert!(msg.contains("judgebox-no-such-python3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_first_responding_candidate_wins() {
        // `sh --version` may fail depending on the shell, `true --version` always exits 0.
        let registry = registry_with(ToolchainConfig {
            python_candidates: vec!["judgebox-no-such-python".to_string(), "true".to_string()],
            ..ToolchainConfig::default()
        });

        let tc = registry.resolve(Language::Python).unwrap();
        assert_eq!(tc.runtime.as_deref(), Some("true"));
    }

    #[test]
    fn test_concurrent_first_use_converges() {
        let registry = Arc::new(registry_with(ToolchainConfig {
            cpp_compiler: "true".to_string(),
            ..ToolchainConfig::default()
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.resolve(Language::Cpp).unwrap())
            })
            .collect();

        let results: Vec<Toolchain> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(results[0].compiler.as_deref(), Some("true"));
    }

    #[test]
    fn test_report_covers_every_language() {
        let registry = registry_with(ToolchainConfig {
            cpp_compiler: "judgebox-no-such-gxx".to_string(),
            python_candidates: vec!["judgebox-no-such-python".to_string()],
            javac: "judgebox-no-such-javac".to_string(),
            java: "judgebox-no-such-java".to_string(),
        });

        let report = registry.report();
        assert_eq!(report.len(), 3);
        assert!(report.iter().all(|(_, entry)| entry.is_err()));
    }
}
