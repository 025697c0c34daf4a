use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::RunResult;
use crate::runner::RunOutcome;

/// Everything printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<RunResult>,
    /// Scenarios never started because the run was cancelled.
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn new(
        base_url: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        outcome: RunOutcome,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            started_at,
            finished_at,
            results: outcome.results,
            skipped: outcome.skipped,
        }
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    /// True iff every scenario ran and passed.
    pub fn all_passed(&self) -> bool {
        self.skipped.is_empty() && self.results.iter().all(|r| r.passed)
    }

    /// Process exit status: 0 if all scenarios passed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() { 0 } else { 1 }
    }

    /// Human-readable report listing every scenario and failure.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let elapsed = self.finished_at - self.started_at;

        let _ = writeln!(out, "Smoke test run against {}\n", self.base_url);

        for result in &self.results {
            let status = if result.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "  [{status}] {}", result.scenario_name);

            for failure in &result.failures {
                match (&failure.selector, failure.mode, &failure.expected_substring) {
                    (Some(selector), Some(mode), Some(expected)) => {
                        let _ = writeln!(
                            out,
                            "         {}: {selector} {mode} {expected:?} (actual: {:?})",
                            failure.kind,
                            failure.actual_display(),
                        );
                    }
                    _ => {
                        let _ = writeln!(out, "         {}", failure.kind);
                    }
                }
                if let Some(detail) = &failure.detail {
                    let _ = writeln!(out, "           {detail}");
                }
            }
        }

        for name in &self.skipped {
            let _ = writeln!(out, "  [SKIP] {name}");
        }

        let _ = writeln!(
            out,
            "\nTotal: {} passed, {} failed, {} skipped ({} ms)",
            self.passed_count(),
            self.failed_count(),
            self.skipped.len(),
            elapsed.num_milliseconds()
        );

        out
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One row per failure; passing scenarios get a single row with empty
    /// failure columns. Skipped scenarios are listed with status `skipped`.
    pub fn to_csv(&self) -> Result<String, AppError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let csv_err = |e: csv::Error| AppError::Generic(format!("CSV error: {e}"));

        writer
            .write_record([
                "scenario",
                "status",
                "kind",
                "selector",
                "mode",
                "expected",
                "actual",
                "detail",
            ])
            .map_err(csv_err)?;

        for result in &self.results {
            let status = if result.passed { "passed" } else { "failed" };
            if result.failures.is_empty() {
                writer
                    .write_record([result.scenario_name.as_str(), status, "", "", "", "", "", ""])
                    .map_err(csv_err)?;
            }
            for failure in &result.failures {
                writer
                    .write_record([
                        result.scenario_name.as_str(),
                        status,
                        failure.kind.as_str(),
                        failure.selector.as_deref().unwrap_or(""),
                        failure.mode.map(|m| m.as_str()).unwrap_or(""),
                        failure.expected_substring.as_deref().unwrap_or(""),
                        failure.actual_text.as_deref().unwrap_or(""),
                        failure.detail.as_deref().unwrap_or(""),
                    ])
                    .map_err(csv_err)?;
            }
        }

        for name in &self.skipped {
            writer
                .write_record([name.as_str(), "skipped", "", "", "", "", "", ""])
                .map_err(csv_err)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Generic(format!("CSV error: {e}")))?;
        String::from_utf8(bytes).map_err(|e| AppError::Generic(format!("CSV error: {e}")))
    }
}
