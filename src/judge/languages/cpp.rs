use crate::config::types::{Language, Limits, Result};
use crate::judge::adapter::{path_arg, JudgeAdapter};
use crate::judge::toolchain::Toolchain;
use crate::safety::workspace::Workspace;

#[derive(Debug, Clone, Default)]
pub struct CppAdapter;

impl JudgeAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn source_file_name(&self, entry_point: &str) -> String {
        format!("{}.cpp", entry_point)
    }

    fn compile_command(
        &self,
        toolchain: &Toolchain,
        workspace: &mut Workspace,
        entry_point: &str,
    ) -> Result<Option<Vec<String>>> {
        let compiler = toolchain.compiler_or_missing()?.to_string();
        let binary = workspace.register_artifact(entry_point);
        Ok(Some(vec![
            compiler,
            "-std=c++17".to_string(),
            "-O2".to_string(),
            "-pipe".to_string(),
            "-o".to_string(),
            path_arg(&binary),
            path_arg(workspace.source_file()),
        ]))
    }

    fn run_command(
        &self,
        _toolchain: &Toolchain,
        workspace: &Workspace,
        entry_point: &str,
        _limits: &Limits,
    ) -> Result<Vec<String>> {
        let binary = workspace
            .artifact()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| workspace.run_dir().join(entry_point));
        Ok(vec![path_arg(&binary)])
    }

    fn memory_markers(&self) -> &'static [&'static str] {
        &["std::bad_alloc"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::workspace::WorkspaceManager;

    #[test]
    fn test_compile_then_run_the_registered_binary() {
        let base = std::env::temp_dir().join(format!("judgebox_cpp_{}", uuid::Uuid::new_v4()));
        let manager = WorkspaceManager::new(&base);
        let mut ws = manager.allocate("solution.cpp", "int main(){}", "").unwrap();
        let toolchain = Toolchain {
            language: Language::Cpp,
            compiler: Some("g++".to_string()),
            runtime: None,
            version: String::new(),
        };

        let adapter = CppAdapter;
        let compile = adapter
            .compile_command(&toolchain, &mut ws, "solution")
            .unwrap()
            .unwrap();
        assert_eq!(compile[0], "g++");
        assert!(compile.contains(&"-std=c++17".to_string()));
        assert!(compile.last().unwrap().ends_with("solution.cpp"));

        let run = adapter
            .run_command(&toolchain, &ws, "solution", &Limits::default())
            .unwrap();
        assert_eq!(run, vec![path_arg(ws.artifact().unwrap())]);

        ws.release();
        let _ = std::fs::remove_dir_all(&base);
    }
}
