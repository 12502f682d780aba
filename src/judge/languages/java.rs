use crate::config::types::{Job, JudgeError, Language, Limits, Result};
use crate::judge::adapter::{path_arg, JudgeAdapter};
use crate::judge::toolchain::Toolchain;
use crate::safety::workspace::Workspace;

/// Class launched when the source declares no public class.
pub const DEFAULT_CLASS: &str = "Main";

/// Modifiers that may sit between `public` and `class`.
const CLASS_MODIFIERS: &[&str] = &[
    "final", "abstract", "static", "strictfp", "sealed", "non", "private", "protected",
];

#[derive(Debug, Clone, Default)]
pub struct JavaAdapter;

/// Identifier-like tokens of a Java source with comments and literals removed.
fn identifier_tokens(source: &str) -> Vec<&str> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 2;
            }
            b'"' if bytes.get(i + 1) == Some(&b'"') && bytes.get(i + 2) == Some(&b'"') => {
                // Text block
                i += 3;
                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        i += 2;
                        continue;
                    }
                    if bytes[i..].starts_with(b"\"\"\"") {
                        i += 3;
                        break;
                    }
                    i += 1;
                }
            }
            b'"' | b'\'' => {
                i += 1;
                while i < bytes.len() && bytes[i] != c && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            _ if is_identifier_start(c) => {
                let start = i;
                while i < bytes.len() && is_identifier_part(bytes[i]) {
                    i += 1;
                }
                tokens.push(&source[start..i]);
            }
            _ => i += 1,
        }
    }

    tokens
}

// Non-ASCII bytes are treated as identifier characters so that UTF-8
// sequences never split a token.
fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_identifier_part(b: u8) -> bool {
    is_identifier_start(b) || b.is_ascii_digit()
}

/// Name of the first top-level-looking `public class`, ignoring comments
/// and string literals.
pub fn detect_class_name(source: &str) -> Option<String> {
    let tokens = identifier_tokens(source);

    for (idx, token) in tokens.iter().enumerate() {
        if *token != "public" {
            continue;
        }
        let mut rest = tokens[idx + 1..].iter();
        let mut next = rest.next();
        while let Some(t) = next {
            if CLASS_MODIFIERS.contains(t) {
                next = rest.next();
            } else {
                break;
            }
        }
        if next == Some(&"class") {
            if let Some(name) = rest.next() {
                return Some((*name).to_string());
            }
        }
    }

    None
}

pub fn is_valid_class_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl JudgeAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn entry_point(&self, job: &Job) -> Result<String> {
        let name = match job.entry_point() {
            Some(explicit) => explicit.to_string(),
            None => detect_class_name(job.source_code()).unwrap_or_else(|| DEFAULT_CLASS.to_string()),
        };

        if !is_valid_class_name(&name) {
            return Err(JudgeError::Validation(format!(
                "'{}' is not a valid Java class name",
                name
            )));
        }
        Ok(name)
    }

    fn source_file_name(&self, entry_point: &str) -> String {
        format!("{}.java", entry_point)
    }

    fn compile_command(
        &self,
        toolchain: &Toolchain,
        workspace: &mut Workspace,
        entry_point: &str,
    ) -> Result<Option<Vec<String>>> {
        let javac = toolchain.compiler_or_missing()?.to_string();
        workspace.register_artifact(&format!("{}.class", entry_point));
        Ok(Some(vec![
            javac,
            "-encoding".to_string(),
            "UTF-8".to_string(),
            "-d".to_string(),
            path_arg(workspace.run_dir()),
            path_arg(workspace.source_file()),
        ]))
    }

    fn run_command(
        &self,
        toolchain: &Toolchain,
        workspace: &Workspace,
        entry_point: &str,
        limits: &Limits,
    ) -> Result<Vec<String>> {
        let heap_mb = limits.memory_mb();
        let initial_mb = (heap_mb / 4).max(1);
        Ok(vec![
            toolchain.runtime_or_missing()?.to_string(),
            format!("-Xms{}m", initial_mb),
            format!("-Xmx{}m", heap_mb),
            "-Xss64m".to_string(),
            "-XX:+UseSerialGC".to_string(),
            "-Dfile.encoding=UTF-8".to_string(),
            "-cp".to_string(),
            path_arg(workspace.run_dir()),
            entry_point.to_string(),
        ])
    }

    fn limit_address_space(&self) -> bool {
        false
    }

    fn memory_markers(&self) -> &'static [&'static str] {
        &["java.lang.OutOfMemoryError", "Could not reserve enough space"]
    }
}
