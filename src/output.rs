//! Output formatting and control utilities.
//!
//! CHANGELOG:
//! - 10/16/2026 - Human-readable pipeline summaries
//! - 10/16/2026 - Initial implementation

use serde::Serialize;
use serde_json::{json, Value};

use crate::invoker::StepOutcome;
use crate::pipeline::PipelineReport;

/// Output control settings from CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputControls {
    pub json: bool,
    pub compact: bool,
}

impl OutputControls {
    /// Emit data according to output controls.
    pub fn emit<T: Serialize>(&self, data: &T) -> String {
        let value = serde_json::to_value(data).unwrap_or(Value::Null);
        if self.compact {
            serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        }
    }

    /// Print a pipeline report: JSON with `--json`, a short summary on
    /// stderr otherwise so stdout stays clean.
    pub fn print_report(&self, report: &PipelineReport) {
        if self.json {
            println!("{}", self.emit(report));
        } else {
            eprint!("{}", summarize(report));
        }
    }
}

/// One line per step, e.g. `  ok     compile (1532 ms)`.
pub fn summarize(report: &PipelineReport) -> String {
    let mut out = format!(
        "{} `{}` ({})\n",
        if report.success() { "built" } else { "failed to build" },
        report.target.name(),
        report.profile
    );
    for step in &report.steps {
        let status = match step.outcome {
            StepOutcome::Ok => "ok",
            StepOutcome::Failed(_) => "FAILED",
        };
        out.push_str(&format!(
            "  {:<6} {} ({:.0} ms)\n",
            status, step.step, step.duration_ms
        ));
    }
    out
}

/// Format error as JSON.
pub fn format_error(error: &str) -> String {
    serde_json::to_string(&json!({
        "error": error,
        "success": false
    }))
    .unwrap_or_else(|_| format!(r#"{{"error":"{}"}}"#, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::pipeline::StepReport;

    fn report() -> PipelineReport {
        let mut report = PipelineReport::new(&BuildConfig::default());
        report.steps.push(StepReport {
            step: "compile".to_string(),
            outcome: StepOutcome::Ok,
            duration_ms: 12.4,
        });
        report.steps.push(StepReport {
            step: "artifact".to_string(),
            outcome: StepOutcome::Failed("artifact not found: x.wasm".to_string()),
            duration_ms: 0.2,
        });
        report
    }

    #[test]
    fn test_summary_lists_steps() {
        let text = summarize(&report());
        assert!(text.starts_with("failed to build `instances` (release)"));
        assert!(text.contains("ok     compile (12 ms)"));
        assert!(text.contains("FAILED artifact"));
    }

    #[test]
    fn test_compact_emit_is_single_line() {
        let controls = OutputControls {
            json: true,
            compact: true,
        };
        let text = controls.emit(&report());
        assert!(!text.contains('\n'));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["steps"][1]["status"], "failed");
    }

    #[test]
    fn test_format_error() {
        let value: Value = serde_json::from_str(&format_error("bind failed: x")).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "bind failed: x");
    }
}
