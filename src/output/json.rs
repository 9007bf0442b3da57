//! JSON output formatting
//!
//! Renders run and benchmark reports for `--json`. Failures are rendered as
//! a `status: "failed"` document carrying the per-endpoint errors.

use crate::error::{Error, Result};
use crate::stats::comparison::FailureRecord;
use crate::stats::{BenchmarkReport, RunReport};
use serde::Serialize;

/// Document emitted for a run
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunDocument<'a> {
    Ok {
        #[serde(flatten)]
        report: &'a RunReport,
    },
    Failed {
        error: String,
        expected: Option<usize>,
        received: Option<usize>,
        failures: Vec<FailureRecord>,
    },
}

impl<'a> RunDocument<'a> {
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::IncompleteResult {
                expected,
                received,
                failures,
            } => RunDocument::Failed {
                error: err.to_string(),
                expected: Some(*expected),
                received: Some(*received),
                failures: failures.iter().map(FailureRecord::from).collect(),
            },
            other => RunDocument::Failed {
                error: other.to_string(),
                expected: None,
                received: None,
                failures: Vec::new(),
            },
        }
    }
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Encode(format!("failed to render JSON: {}", e)))
}

/// Render a successful run
pub fn render_run(report: &RunReport) -> Result<String> {
    to_pretty(&RunDocument::Ok { report })
}

/// Render a failed run
pub fn render_failure(err: &Error) -> Result<String> {
    to_pretty(&RunDocument::from_error(err))
}

pub fn render_benchmark(report: &BenchmarkReport) -> Result<String> {
    to_pretty(report)
}
