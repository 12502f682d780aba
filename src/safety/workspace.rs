/// Workspace management for job-scoped artifacts
///
/// Every job gets its own directory named by a random v4 UUID under the
/// configured root. Jobs never share a path, so concurrent jobs need no locks.
use crate::config::types::{JudgeError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

pub const STDIN_FILE: &str = "input.txt";
pub const STDOUT_FILE: &str = "output.txt";

/// Scratch area for a single job. Released on drop.
#[derive(Debug)]
pub struct Workspace {
    run_id: String,
    run_dir: PathBuf,
    source_file: PathBuf,
    stdin_file: PathBuf,
    stdout_file: PathBuf,
    artifact: Option<PathBuf>,
    created: Vec<PathBuf>,
    released: bool,
}

impl Workspace {
    fn create(base_dir: &Path, source_name: &str, source: &str, stdin: &str) -> Result<Self> {
        let run_id = Uuid::new_v4().to_string();
        let run_dir = base_dir.join(&run_id);

        fs::create_dir(&run_dir).map_err(|e| {
            JudgeError::Internal(format!(
                "Failed to create workspace directory {}: {}",
                run_dir.display(),
                e
            ))
        })?;

        let mut workspace = Self {
            run_id,
            source_file: run_dir.join(source_name),
            stdin_file: run_dir.join(STDIN_FILE),
            stdout_file: run_dir.join(STDOUT_FILE),
            run_dir,
            artifact: None,
            created: Vec::new(),
            released: false,
        };

        // On error the partially built workspace is dropped and released.
        let source_file = workspace.source_file.clone();
        workspace.write_file(&source_file, source.as_bytes())?;
        let stdin_file = workspace.stdin_file.clone();
        workspace.write_file(&stdin_file, stdin.as_bytes())?;
        let stdout_file = workspace.stdout_file.clone();
        workspace.write_file(&stdout_file, b"")?;

        Ok(workspace)
    }

    fn write_file(&mut self, path: &Path, content: &[u8]) -> Result<()> {
        fs::write(path, content).map_err(|e| {
            JudgeError::Internal(format!("Failed to write {}: {}", path.display(), e))
        })?;
        self.created.push(path.to_path_buf());
        Ok(())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn stdin_file(&self) -> &Path {
        &self.stdin_file
    }

    pub fn stdout_file(&self) -> &Path {
        &self.stdout_file
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Reserve a path for the compiled artifact so release removes it.
    pub fn register_artifact(&mut self, name: &str) -> PathBuf {
        let path = self.run_dir.join(name);
        self.artifact = Some(path.clone());
        self.created.push(path.clone());
        path
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Remove every file this workspace created, then the directory itself.
    /// Best-effort and idempotent: failures are logged, never returned.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        for path in self.created.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }

        // Toolchains may leave extra files behind (e.g. nested Java classes).
        if let Err(e) = fs::remove_dir_all(&self.run_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "Failed to remove workspace directory {}: {}",
                    self.run_dir.display(),
                    e
                );
            }
        }
        log::debug!("[{}] workspace released", self.run_id);
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}

/// Allocates workspaces under a single root directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create a fresh workspace holding the source and stdin of a job.
    pub fn allocate(&self, source_name: &str, source: &str, stdin: &str) -> Result<Workspace> {
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            JudgeError::Internal(format!(
                "Failed to create workspace root {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let workspace = Workspace::create(&self.base_dir, source_name, source, stdin)?;
        log::debug!(
            "[{}] workspace allocated at {}",
            workspace.run_id(),
            workspace.run_dir().display()
        );
        Ok(workspace)
    }

    /// Remove workspaces older than `max_age`, left behind by a crashed judge.
    pub fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        if !self.base_dir.exists() {
            return Ok(0);
        }

        let now = SystemTime::now();
        let mut cleaned = 0;

        for entry in fs::read_dir(&self.base_dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() || Uuid::parse_str(&entry.file_name().to_string_lossy()).is_err() {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            match age {
                Some(age) if age >= max_age => {
                    log::info!("Removing stale workspace {}", path.display());
                    match fs::remove_dir_all(&path) {
                        Ok(()) => cleaned += 1,
                        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
                    }
                }
                _ => {}
            }
        }

        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("judgebox_ws_{}_{}", name, Uuid::new_v4()))
    }

    #[test]
    fn test_allocate_writes_files() {
        let root = test_root("alloc");
        let manager = WorkspaceManager::new(&root);

        let ws = manager.allocate("solution.cpp", "int main() {}", "2 3\n").unwrap();
        assert_eq!(fs::read_to_string(ws.source_file()).unwrap(), "int main() {}");
        assert_eq!(fs::read_to_string(ws.stdin_file()).unwrap(), "2 3\n");
        assert_eq!(fs::read_to_string(ws.stdout_file()).unwrap(), "");

        drop(ws);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_release_removes_everything() {
        let root = test_root("release");
        let manager = WorkspaceManager::new(&root);

        let mut ws = manager.allocate("solution.py", "print(1)", "").unwrap();
        let artifact = ws.register_artifact("solution");
        fs::write(&artifact, b"\x7fELF").unwrap();
        fs::write(ws.run_dir().join("Extra$Inner.class"), b"").unwrap();
        let run_dir = ws.run_dir().to_path_buf();

        ws.release();
        assert!(ws.is_released());
        assert!(!run_dir.exists());

        // Second release is a no-op.
        ws.release();
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_drop_releases() {
        let root = test_root("drop");
        let manager = WorkspaceManager::new(&root);

        let run_dir = {
            let ws = manager.allocate("Main.java", "class Main {}", "").unwrap();
            ws.run_dir().to_path_buf()
        };
        assert!(!run_dir.exists());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_workspaces_never_collide() {
        let root = test_root("unique");
        let manager = WorkspaceManager::new(&root);

        let a = manager.allocate("solution.py", "a", "").unwrap();
        let b = manager.allocate("solution.py", "b", "").unwrap();
        assert_ne!(a.run_dir(), b.run_dir());
        assert_eq!(fs::read_to_string(a.source_file()).unwrap(), "a");
        assert_eq!(fs::read_to_string(b.source_file()).unwrap(), "b");

        drop((a, b));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_unwritable_root_is_internal_error() {
        // A regular file cannot serve as a directory root.
        let file = test_root("file");
        fs::write(&file, b"").unwrap();
        let manager = WorkspaceManager::new(file.join("nested"));

        let err = manager.allocate("solution.py", "", "").unwrap_err();
        assert!(err.is_internal());
        let _ = fs::remove_file(&file);
    }

    #[test]
    fn test_sweep_stale() {
        let root = test_root("sweep");
        let manager = WorkspaceManager::new(&root);
        fs::create_dir_all(root.join(Uuid::new_v4().to_string())).unwrap();
        fs::create_dir_all(root.join("not-a-workspace")).unwrap();

        let cleaned = manager.sweep_stale(Duration::from_secs(0)).unwrap();
        assert_eq!(cleaned, 1);
        assert!(root.join("not-a-workspace").exists());

        let _ = fs::remove_dir_all(&root);
    }
}
