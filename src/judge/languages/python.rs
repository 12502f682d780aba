use crate::config::types::{Language, Limits, Result};
use crate::judge::adapter::{path_arg, JudgeAdapter};
use crate::judge::toolchain::Toolchain;
use crate::safety::workspace::Workspace;

/// Parses the file without running it and without writing bytecode.
const SYNTAX_CHECK: &str =
    "import sys; compile(open(sys.argv[1], 'rb').read(), sys.argv[1], 'exec')";

#[derive(Debug, Clone, Default)]
pub struct PythonAdapter;

impl JudgeAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn source_file_name(&self, entry_point: &str) -> String {
        format!("{}.py", entry_point)
    }

    fn compile_command(
        &self,
        toolchain: &Toolchain,
        workspace: &mut Workspace,
        _entry_point: &str,
    ) -> Result<Option<Vec<String>>> {
        let interpreter = toolchain.runtime_or_missing()?.to_string();
        Ok(Some(vec![
            interpreter,
            "-B".to_string(),
            "-c".to_string(),
            SYNTAX_CHECK.to_string(),
            path_arg(workspace.source_file()),
        ]))
    }

    fn run_command(
        &self,
        toolchain: &Toolchain,
        workspace: &Workspace,
        _entry_point: &str,
        _limits: &Limits,
    ) -> Result<Vec<String>> {
        Ok(vec![
            toolchain.runtime_or_missing()?.to_string(),
            "-B".to_string(),
            "-S".to_string(),
            path_arg(workspace.source_file()),
        ])
    }

    fn environment(&self) -> Vec<(String, String)> {
        vec![("PYTHONIOENCODING".to_string(), "utf-8".to_string())]
    }

    fn memory_markers(&self) -> &'static [&'static str] {
        &["MemoryError"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::workspace::WorkspaceManager;

    #[test]
    fn test_uses_discovered_interpreter() {
        let base = std::env::temp_dir().join(format!("judgebox_py_{}", uuid::Uuid::new_v4()));
        let manager = WorkspaceManager::new(&base);
        let mut ws = manager.allocate("solution.py", "print(1)", "").unwrap();
        let toolchain = Toolchain {
            language: Language::Python,
            compiler: Some("python".to_string()),
            runtime: Some("python".to_string()),
            version: "Python 3.12.0".to_string(),
        };

        let adapter = PythonAdapter;
        let check = adapter
            .compile_command(&toolchain, &mut ws, "solution")
            .unwrap()
            .unwrap();
        assert_eq!(check[0], "python");
        assert_eq!(check[3], SYNTAX_CHECK);
        assert!(ws.artifact().is_none());

        let run = adapter
            .run_command(&toolchain, &ws, "solution", &Limits::default())
            .unwrap();
        assert_eq!(run[0], "python");
        assert!(run.last().unwrap().ends_with("solution.py"));

        ws.release();
        let _ = std::fs::remove_dir_all(&base);
    }
}
