//! Build Invoker: runs the compiler and the binding generator.
//!
//! Both tools are black boxes. We only control their argument lists and
//! check how they exit; a failed step is reported as `StepOutcome::Failed`
//! and the caller decides whether to continue (it never does).
//!
//! CHANGELOG:
//! - 10/16/2026 - Always pass --target-dir
//! - 10/16/2026 - Artifact suggestions for profile/path mismatches
//! - 10/16/2026 - Initial implementation

use serde::Serialize;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::BuildConfig;
use crate::error::{Error, Result};

/// Lines of stderr kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Minimum similarity for an artifact suggestion (0.0 - 1.0).
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// What a finished child process reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    /// Last lines of stderr.
    pub stderr_tail: String,
}

/// Spawns external tools. Real runs use [`SystemRunner`].
pub trait ToolRunner {
    /// Run `program` with `args`, blocking until it exits.
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<ToolOutput>;
}

/// Runs tools as child processes, echoing their stderr live.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<ToolOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()?;

        // Cargo reports progress on stderr; pass it through and keep a tail.
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(stderr) = child.stderr.take() {
            for line in BufReader::new(stderr).lines() {
                let line = line?;
                eprintln!("{}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }

        let status = child.wait()?;
        Ok(ToolOutput {
            success: status.success(),
            code: status.code(),
            stderr_tail: tail.into_iter().collect::<Vec<_>>().join("\n"),
        })
    }
}

/// Result of one external step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum StepOutcome {
    Ok,
    Failed(String),
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok)
    }

    /// Convert to a `Result`, naming the step on failure.
    pub fn into_result(self, step: &str) -> Result<()> {
        match self {
            StepOutcome::Ok => Ok(()),
            StepOutcome::Failed(reason) => Err(Error::step_failed(step, reason)),
        }
    }
}

/// Arguments for `cargo build`.
pub fn compilation_args(config: &BuildConfig) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if let Some(flag) = config.profile.cargo_flag() {
        args.push(flag.to_string());
    }
    args.push(config.target.cargo_flag().to_string());
    args.push(config.target.name().to_string());
    args.push("--target".to_string());
    args.push(config.triple.clone());
    // Pin cargo to the directory `artifact_path` reads from, whatever
    // CARGO_TARGET_DIR, .cargo/config.toml or a workspace root would say.
    args.push("--target-dir".to_string());
    args.push(config.target_dir.to_string_lossy().to_string());
    args
}

/// Arguments for `wasm-bindgen`.
pub fn binding_generation_args(artifact: &Path, out_dir: &Path) -> Vec<String> {
    vec![
        artifact.to_string_lossy().to_string(),
        "--out-dir".to_string(),
        out_dir.to_string_lossy().to_string(),
        "--target".to_string(),
        "web".to_string(),
    ]
}

/// Compile the configured target to WebAssembly.
pub fn run_compilation_step(runner: &dyn ToolRunner, config: &BuildConfig) -> StepOutcome {
    let args = compilation_args(config);
    tracing::info!(
        target_name = config.target.name(),
        profile = %config.profile,
        triple = %config.triple,
        "compiling"
    );
    run_tool(runner, &config.cargo, &args)
}

/// Generate web bindings for a compiled artifact into `out_dir`.
pub fn run_binding_generation_step(
    runner: &dyn ToolRunner,
    program: &str,
    artifact: &Path,
    out_dir: &Path,
) -> StepOutcome {
    let args = binding_generation_args(artifact, out_dir);
    tracing::info!(
        artifact = %artifact.display(),
        out_dir = %out_dir.display(),
        "generating bindings"
    );
    run_tool(runner, program, &args)
}

fn run_tool(runner: &dyn ToolRunner, program: &str, args: &[String]) -> StepOutcome {
    let command_line = format!("{} {}", program, args.join(" "));
    tracing::debug!(command = %command_line, "spawning");

    match runner.run(program, args) {
        Ok(output) if output.success => StepOutcome::Ok,
        Ok(output) => {
            let status = match output.code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            let reason = if output.stderr_tail.trim().is_empty() {
                format!("`{}` {}", command_line, status)
            } else {
                format!("`{}` {}:\n{}", command_line, status, output.stderr_tail.trim())
            };
            StepOutcome::Failed(reason)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            StepOutcome::Failed(format!("`{}` not found on PATH: {}", program, e))
        }
        Err(e) => StepOutcome::Failed(format!("could not start `{}`: {}", program, e)),
    }
}

/// Make sure the artifact the binding generator needs actually exists.
pub fn check_artifact(config: &BuildConfig) -> Result<PathBuf> {
    let path = config.artifact_path();
    if path.is_file() {
        return Ok(path);
    }
    let suggestion = suggest_artifact(config);
    Err(Error::ArtifactNotFound { path, suggestion })
}

/// Closest `.wasm` file to the expected artifact, searching the expected
/// profile's directory and the other profile's.
pub fn suggest_artifact(config: &BuildConfig) -> Option<PathBuf> {
    let wanted = config.target.artifact_stem();
    let dirs = [
        config.artifact_dir(config.profile),
        config.artifact_dir(config.profile.other()),
    ];

    let mut best: Option<(PathBuf, f64)> = None;
    for dir in &dirs {
        for candidate in wasm_files(dir) {
            let Some(stem) = candidate.file_stem().map(|s| s.to_string_lossy().to_string())
            else {
                continue;
            };
            let score = strsim::jaro_winkler(&wanted, &stem);
            if score >= SUGGESTION_THRESHOLD
                && best.as_ref().map_or(true, |(_, s)| score > *s)
            {
                best = Some((candidate, score));
            }
        }
    }
    best.map(|(path, _)| path)
}

fn wasm_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "wasm"))
        .collect();
    files.sort();
    files
}
