//! End-to-end judging through the public API.
//!
//! Tests that need a real compiler or interpreter return early with a note
//! when the toolchain is not installed on the host.

use judgebox::{Judge, JudgeConfig, JudgeError, Language, Limits, Verdict, VerdictCause};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const CPP_SUM: &str = r#"
#include <iostream>
int main() {
    long long a, b;
    std::cin >> a >> b;
    std::cout << a + b << std::endl;
    return 0;
}
"#;

fn judge_in_temp(name: &str) -> (Judge, PathBuf) {
    let root = std::env::temp_dir().join(format!(
        "judgebox_it_{}_{}",
        name,
        uuid::Uuid::new_v4()
    ));
    let config = JudgeConfig {
        workspace_root: root.clone(),
        ..JudgeConfig::default()
    };
    (Judge::new(config), root)
}

fn available(judge: &Judge, language: Language) -> bool {
    if judge.toolchains().is_available(language) {
        true
    } else {
        eprintln!("skipping: {} toolchain not installed", language.display_name());
        false
    }
}

/// Nothing may survive under the workspace root once a job returned.
fn assert_clean(root: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(root)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "workspace leftovers: {:?}", leftovers);
}

fn finish(root: PathBuf) {
    assert_clean(&root);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn test_unsupported_language_rejected_before_any_work() {
    let (judge, root) = judge_in_temp("validation");
    let err = judge
        .execute_source("haskell", "main = print 1", "", None, None)
        .unwrap_err();
    assert!(matches!(err, JudgeError::Validation(_)));
    assert!(!root.exists());
}

#[test]
fn test_cpp_sum_accepted() {
    let (judge, root) = judge_in_temp("cpp_ac");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let result = judge
        .execute_source("cpp", CPP_SUM, "2 3\n", Some("5\n"), None)
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Accepted));
    assert_eq!(result.stdout.trim_end(), "5");
    finish(root);
}

#[test]
fn test_cpp_wrong_answer() {
    let (judge, root) = judge_in_temp("cpp_wa");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let result = judge.judge(Language::Cpp, CPP_SUM, "2 3\n", "6\n").unwrap();
    assert_eq!(result.verdict, Some(Verdict::WrongAnswer));
    assert_eq!(result.cause, VerdictCause::OutputMismatch);
    finish(root);
}

#[test]
fn test_cpp_compile_error_has_diagnostics() {
    let (judge, root) = judge_in_temp("cpp_ce");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let result = judge
        .judge(Language::Cpp, "int main() { return undeclared; }", "", "")
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::CompileError));
    assert!(result.stderr.contains("undeclared"));
    assert!(!result.message.unwrap_or_default().is_empty());
    finish(root);
}

#[test]
fn test_cpp_infinite_loop_is_tle() {
    let (judge, root) = judge_in_temp("cpp_tle");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let limits = Limits {
        cpu_time_seconds: 2,
        wall_clock_timeout_seconds: 2,
        ..Limits::default()
    };
    let started = Instant::now();
    let result = judge
        .execute_source(
            "cpp",
            "int main() { volatile int x = 0; while (true) { x++; } }",
            "",
            None,
            Some(limits),
        )
        .unwrap();

    assert_eq!(result.verdict, Some(Verdict::TimeLimit));
    // Compile time plus the 2s bound plus a small grace.
    assert!(started.elapsed() < Duration::from_secs(2 + 10 + 3));
    finish(root);
}

#[test]
fn test_cpp_output_flood_is_ole() {
    let (judge, root) = judge_in_temp("cpp_ole");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let limits = Limits {
        output_byte_cap: 1024,
        ..Limits::default()
    };
    let result = judge
        .execute_source(
            "cpp",
            "#include <cstdio>\nint main() { for (;;) std::puts(\"flood\"); }",
            "",
            None,
            Some(limits),
        )
        .unwrap();

    assert_eq!(result.verdict, Some(Verdict::OutputLimit));
    assert!(result.stdout.len() <= 1024);
    assert!(result.output_truncated);
    finish(root);
}

#[test]
fn test_cpp_binary_output_stays_within_cap() {
    let (judge, root) = judge_in_temp("cpp_binary");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let limits = Limits {
        output_byte_cap: 1024,
        ..Limits::default()
    };
    let result = judge
        .execute_source(
            "cpp",
            "#include <cstdio>\nint main() { for (int i = 0; i < 1000; i++) std::putchar(0xFF); }",
            "",
            None,
            Some(limits),
        )
        .unwrap();

    assert_eq!(result.verdict, None);
    assert!(!result.stdout.is_empty());
    assert!(result.stdout.len() <= 1024, "stdout is {} bytes", result.stdout.len());
    finish(root);
}

#[test]
fn test_cpp_output_cut_mid_character_stays_within_cap() {
    let (judge, root) = judge_in_temp("cpp_utf8_cut");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let limits = Limits {
        output_byte_cap: 5,
        ..Limits::default()
    };
    let result = judge
        .execute_source(
            "cpp",
            "#include <cstdio>\nint main() { std::fputs(\"abcd\\xC3\\xA9xyz\", stdout); }",
            "",
            None,
            Some(limits),
        )
        .unwrap();

    assert_eq!(result.verdict, Some(Verdict::OutputLimit));
    assert_eq!(result.stdout, "abcd");
    assert!(result.stdout.len() <= 5);
    finish(root);
}

#[test]
fn test_cpp_huge_allocation_is_mle() {
    let (judge, root) = judge_in_temp("cpp_mle");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let limits = Limits {
        memory_bytes: 64 * 1024 * 1024,
        ..Limits::default()
    };
    let source = r#"
#include <vector>
#include <iostream>
int main() {
    std::vector<char> big(1ull << 32, 1);
    std::cout << big.back() << std::endl;
}
"#;
    let result = judge
        .execute_source("cpp", source, "", None, Some(limits))
        .unwrap();

    assert_eq!(result.verdict, Some(Verdict::MemoryLimit));
    finish(root);
}

#[test]
fn test_cpp_nonzero_exit_is_rte() {
    let (judge, root) = judge_in_temp("cpp_rte");
    if !available(&judge, Language::Cpp) {
        return;
    }

    let result = judge
        .execute_source(
            "c++",
            "#include <cstdio>\nint main() { std::fputs(\"bad input\", stderr); return 3; }",
            "",
            Some(""),
            None,
        )
        .unwrap();

    assert_eq!(result.verdict, Some(Verdict::RuntimeError));
    assert_eq!(result.exit_code, Some(3));
    assert!(result.message.unwrap_or_default().contains("bad input"));
    finish(root);
}

#[test]
fn test_python_syntax_error_is_ce() {
    let (judge, root) = judge_in_temp("py_ce");
    if !available(&judge, Language::Python) {
        return;
    }

    let result = judge
        .run(Language::Python, "def broken(:\n    pass\n", "")
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::CompileError));
    assert!(result.stderr.contains("SyntaxError"));
    finish(root);
}

#[test]
fn test_python_reads_stdin() {
    let (judge, root) = judge_in_temp("py_ac");
    if !available(&judge, Language::Python) {
        return;
    }

    let source = "a, b = map(int, input().split())\nprint(a * b)\n";
    let result = judge.judge(Language::Python, source, "6 7\n", "42").unwrap();
    assert_eq!(result.verdict, Some(Verdict::Accepted));
    finish(root);
}

#[test]
fn test_python_silent_run_reports_notice() {
    let (judge, root) = judge_in_temp("py_silent");
    if !available(&judge, Language::Python) {
        return;
    }

    let result = judge.run(Language::Python, "x = 1\n", "").unwrap();
    assert_eq!(result.verdict, None);
    assert!(result.is_success());
    assert_eq!(
        result.message.as_deref(),
        Some("program executed successfully (no output)")
    );
    finish(root);
}

#[test]
fn test_python_memory_error_is_mle() {
    let (judge, root) = judge_in_temp("py_mle");
    if !available(&judge, Language::Python) {
        return;
    }

    let limits = Limits {
        memory_bytes: 128 * 1024 * 1024,
        ..Limits::default()
    };
    let result = judge
        .execute_source("python", "x = bytearray(1 << 34)\n", "", None, Some(limits))
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::MemoryLimit));
    finish(root);
}

#[test]
fn test_java_detects_class_name() {
    let (judge, root) = judge_in_temp("java_ac");
    if !available(&judge, Language::Java) {
        return;
    }

    let source = r#"
import java.util.Scanner;

// public class NotThisOne {}
public class Adder {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        System.out.println(in.nextInt() + in.nextInt());
    }
}
"#;
    let result = judge.judge(Language::Java, source, "40 2\n", "42\n").unwrap();
    assert_eq!(result.verdict, Some(Verdict::Accepted));
    finish(root);
}

#[test]
fn test_java_compile_error() {
    let (judge, root) = judge_in_temp("java_ce");
    if !available(&judge, Language::Java) {
        return;
    }

    let result = judge
        .run(Language::Java, "public class Main { void f() { int x = ; } }", "")
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::CompileError));
    assert!(!result.stderr.is_empty());
    finish(root);
}

#[test]
fn test_concurrent_jobs_do_not_interfere() {
    let (judge, root) = judge_in_temp("concurrent");
    if !available(&judge, Language::Python) {
        return;
    }

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let judge = judge.clone();
            thread::spawn(move || {
                let source = format!("print(int(input()) + {})\n", i);
                let expected = format!("{}\n", 100 + i);
                judge.judge(Language::Python, &source, "100\n", &expected)
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result.verdict, Some(Verdict::Accepted));
    }
    finish(root);
}
