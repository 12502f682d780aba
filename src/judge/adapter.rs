use crate::config::types::{Job, Language, Limits, Result};
use crate::judge::toolchain::Toolchain;
use crate::safety::workspace::Workspace;
use std::path::PathBuf;

/// Entry point used by languages that do not name one.
pub const DEFAULT_ENTRY_POINT: &str = "solution";

/// Judge adapter contract for language-specific compile/run stages.
///
/// Adapters only build argv vectors; spawning, limits and classification
/// stay language-agnostic.
pub trait JudgeAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Name the program is launched by. Validation failures surface before
    /// any workspace is allocated.
    fn entry_point(&self, _job: &Job) -> Result<String> {
        Ok(DEFAULT_ENTRY_POINT.to_string())
    }

    /// File name the source is written under inside the workspace.
    fn source_file_name(&self, entry_point: &str) -> String;

    /// Build step, or `None` when the language has none. May register the
    /// produced artifact with the workspace.
    fn compile_command(
        &self,
        toolchain: &Toolchain,
        workspace: &mut Workspace,
        entry_point: &str,
    ) -> Result<Option<Vec<String>>>;

    fn run_command(
        &self,
        toolchain: &Toolchain,
        workspace: &Workspace,
        entry_point: &str,
        limits: &Limits,
    ) -> Result<Vec<String>>;

    fn run_workdir(&self, workspace: &Workspace) -> PathBuf {
        workspace.run_dir().to_path_buf()
    }

    fn environment(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Whether RLIMIT_AS is applied to the run step. Runtimes that reserve
    /// large virtual ranges up front bound their heap through flags instead.
    fn limit_address_space(&self) -> bool {
        true
    }

    /// stderr fragments the runtime prints when an allocation fails.
    fn memory_markers(&self) -> &'static [&'static str];
}

pub(crate) fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().to_string()
}
