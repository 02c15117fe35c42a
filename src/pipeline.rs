//! Linear build pipeline: compile -> locate artifact -> generate bindings
//! -> validate output -> (serve).
//!
//! Each step yields a `StepOutcome`; the first failure stops the pipeline
//! and nothing after it runs.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial implementation

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{BuildConfig, BuildProfile, BuildTarget, ServeConfig};
use crate::error::Result;
use crate::invoker::{self, StepOutcome, ToolRunner};
use crate::server::StaticServer;

pub const STEP_COMPILE: &str = "compile";
pub const STEP_ARTIFACT: &str = "artifact";
pub const STEP_BINDGEN: &str = "bindgen";
pub const STEP_OUTPUT: &str = "output";

/// One executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    pub duration_ms: f64,
}

/// Record of a pipeline run, printed with `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub target: BuildTarget,
    pub profile: BuildProfile,
    pub artifact: PathBuf,
    pub out_dir: PathBuf,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            target: config.target.clone(),
            profile: config.profile,
            artifact: config.artifact_path(),
            out_dir: config.out_dir.clone(),
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            steps: Vec::new(),
        }
    }

    /// True when every recorded step succeeded.
    pub fn success(&self) -> bool {
        self.steps.iter().all(|s| s.outcome.is_ok())
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step.as_str()).collect()
    }

    fn record(&mut self, step: &str, outcome: StepOutcome, started: Instant) -> Result<()> {
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            StepOutcome::Ok => tracing::info!(step, duration_ms, "step finished"),
            StepOutcome::Failed(ref reason) => {
                tracing::error!(step, duration_ms, reason = %reason, "step failed")
            }
        }
        self.steps.push(StepReport {
            step: step.to_string(),
            outcome: outcome.clone(),
            duration_ms,
        });
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
        outcome.into_result(step)
    }

    /// Record a step that produces an error rather than a `StepOutcome`.
    fn record_result<T>(&mut self, step: &str, result: Result<T>, started: Instant) -> Result<T> {
        match result {
            Ok(value) => {
                self.record(step, StepOutcome::Ok, started)?;
                Ok(value)
            }
            Err(e) => {
                let outcome = StepOutcome::Failed(e.to_string());
                let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
                tracing::error!(step, duration_ms, error = %e, "step failed");
                self.steps.push(StepReport {
                    step: step.to_string(),
                    outcome,
                    duration_ms,
                });
                self.finished_at = Some(chrono::Utc::now().to_rfc3339());
                Err(e)
            }
        }
    }
}

/// Compile, then generate bindings. Stops at the first failure.
pub fn run_build(
    runner: &dyn ToolRunner,
    config: &BuildConfig,
    report: &mut PipelineReport,
) -> Result<()> {
    let started = Instant::now();
    let outcome = invoker::run_compilation_step(runner, config);
    report.record(STEP_COMPILE, outcome, started)?;

    let started = Instant::now();
    let artifact = report.record_result(STEP_ARTIFACT, invoker::check_artifact(config), started)?;

    let started = Instant::now();
    let outcome =
        invoker::run_binding_generation_step(runner, &config.wasm_bindgen, &artifact, &config.out_dir);
    report.record(STEP_BINDGEN, outcome, started)?;

    Ok(())
}

/// Run the build, then validate its output as a serve root.
///
/// Returns the idle server; the caller binds and serves it.
pub fn build_and_prepare(
    runner: &dyn ToolRunner,
    build: &BuildConfig,
    serve: &ServeConfig,
    report: &mut PipelineReport,
) -> Result<StaticServer> {
    run_build(runner, build, report)?;

    let started = Instant::now();
    report.record_result(STEP_OUTPUT, StaticServer::new(serve), started)
}
