use crate::config::types::{JudgeError, Language, Limits, Result as JudgeResult};
use crate::exec::orchestrator::Judge;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a submission, printing the result as JSON
    Execute(ExecuteArgs),
    /// Check if all language dependencies are installed
    CheckDeps {
        /// Verbose output showing detailed version information
        #[arg(long)]
        verbose: bool,
    },
    /// Remove workspaces left behind by a crashed judge
    Cleanup {
        /// Only remove workspaces older than this many seconds
        #[arg(long, default_value_t = 3600)]
        max_age_secs: u64,
    },
}

#[derive(Args)]
struct ExecuteArgs {
    /// Programming language (cpp, python, java and their aliases)
    #[arg(long)]
    language: String,
    /// Source code as string
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    code: Option<String>,
    /// Read source code from a file
    #[arg(long)]
    file: Option<PathBuf>,
    /// Input data to pass to stdin
    #[arg(long, conflicts_with = "stdin_file")]
    stdin: Option<String>,
    #[arg(long)]
    stdin_file: Option<PathBuf>,
    /// Expected output; enables AC/WA judging
    #[arg(long, conflicts_with = "expected_file")]
    expected: Option<String>,
    #[arg(long)]
    expected_file: Option<PathBuf>,
    /// Java class to launch instead of the detected one
    #[arg(long)]
    entry_point: Option<String>,
    /// Memory limit in MB
    #[arg(long)]
    mem: Option<u64>,
    /// CPU time limit in seconds
    #[arg(long)]
    cpu: Option<u64>,
    /// Wall clock time limit in seconds
    #[arg(long)]
    wall_time: Option<u64>,
    /// Output cap in bytes
    #[arg(long)]
    output_cap: Option<u64>,
    /// Compile time limit in seconds
    #[arg(long)]
    compile_time: Option<u64>,
}

fn inline_or_file(inline: Option<String>, file: Option<&PathBuf>) -> Result<Option<String>> {
    match (inline, file) {
        (Some(text), _) => Ok(Some(text)),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("failed to read {}", path.display())),
        (None, None) => Ok(None),
    }
}

fn apply_overrides(mut limits: Limits, args: &ExecuteArgs) -> JudgeResult<Limits> {
    if let Some(mem) = args.mem {
        limits.memory_bytes = mem.checked_mul(1024 * 1024).ok_or_else(|| {
            JudgeError::Validation(format!("--mem {} MB does not fit in bytes", mem))
        })?;
    }
    if let Some(cpu) = args.cpu {
        limits.cpu_time_seconds = cpu;
    }
    if let Some(wall) = args.wall_time {
        limits.wall_clock_timeout_seconds = wall;
    }
    if let Some(cap) = args.output_cap {
        limits.output_byte_cap = cap;
    }
    if let Some(compile) = args.compile_time {
        limits.compile_timeout_seconds = compile;
    }
    Ok(limits)
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Execute(args) => execute(args),
        Commands::CheckDeps { verbose } => check_language_dependencies(verbose),
        Commands::Cleanup { max_age_secs } => {
            let judge = Judge::from_env()?;
            let removed = judge
                .workspaces()
                .sweep_stale(Duration::from_secs(max_age_secs))?;
            eprintln!(
                "Removed {} stale workspace(s) from {}",
                removed,
                judge.workspaces().base_dir().display()
            );
            Ok(())
        }
    }
}

fn execute(args: ExecuteArgs) -> Result<()> {
    let judge = Judge::from_env()?;
    let language: Language = args.language.parse()?;

    let code = inline_or_file(args.code.clone(), args.file.as_ref())?
        .context("either --code or --file is required")?;
    let stdin = inline_or_file(args.stdin.clone(), args.stdin_file.as_ref())?.unwrap_or_default();
    let expected = inline_or_file(args.expected.clone(), args.expected_file.as_ref())?;
    let limits = apply_overrides(judge.config().limits.clone(), &args)?;

    let mut job = crate::config::types::Job::new(language, code)
        .with_stdin(stdin)
        .with_limits(limits);
    if let Some(expected) = expected {
        job = job.with_expected_output(expected);
    }
    if let Some(entry) = &args.entry_point {
        job = job.with_entry_point(entry.clone());
    }

    log::info!("Executing {} submission", language.display_name());
    let result = judge.execute(job)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn check_language_dependencies(verbose: bool) -> Result<()> {
    let judge = Judge::from_env()?;

    println!("Checking language dependencies...");
    println!();

    let mut missing_languages = Vec::new();
    for (language, entry) in judge.toolchains().report() {
        match entry {
            Ok(toolchain) => {
                println!("OK      {}", language.display_name());
                if verbose {
                    if let Some(compiler) = &toolchain.compiler {
                        println!("  compiler -> {}", compiler);
                    }
                    if let Some(runtime) = &toolchain.runtime {
                        println!("  runtime  -> {}", runtime);
                    }
                    println!("  version  -> {}", toolchain.version);
                    println!();
                }
            }
            Err(reason) => {
                println!("MISSING {}", language.display_name());
                if verbose {
                    println!("  {}", reason);
                    println!();
                }
                missing_languages.push(language);
            }
        }
    }

    println!();
    if missing_languages.is_empty() {
        println!("All language dependencies are installed.");
        return Ok(());
    }

    let names: Vec<&str> = missing_languages.iter().map(|l| l.display_name()).collect();
    println!("Missing toolchains for: {}", names.join(", "));
    println!("Submissions in these languages will be reported as RTE (toolchain missing).");
    std::process::exit(1);
}
