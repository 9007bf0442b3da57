//! Serial vs distributed comparison
//!
//! Times one local sequential product and one distributed product of the same
//! operands, then checks the distributed result against the serial one.

use crate::distributed::{AggregationPolicy, Coordinator};
use crate::error::{EndpointFailure, Error, Result};
use crate::matrix::verify::{self, Tolerance, VerificationResult};
use crate::matrix::{kernel, ElementKind, Matrix};
use crate::util::time::{as_millis_f64, speedup, timed};
use serde::Serialize;
use std::time::Duration;

/// One endpoint that produced no partial result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub partition: usize,
    pub endpoint: String,
    pub error: String,
}

impl From<&EndpointFailure> for FailureRecord {
    fn from(f: &EndpointFailure) -> Self {
        Self {
            partition: f.index,
            endpoint: f.endpoint.to_string(),
            error: f.error.to_string(),
        }
    }
}

/// Report for one multiplication
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub rows_a: usize,
    pub cols_a: usize,
    pub cols_b: usize,
    pub element: ElementKind,

    /// Partitions dispatched
    pub workers: usize,
    pub policy: AggregationPolicy,

    pub serial_ms: f64,
    pub distributed_ms: f64,

    /// serial / distributed (below 1 is a slowdown)
    pub speedup: f64,

    pub verified: bool,
    pub verification: String,

    /// Result misses row ranges of A (best-effort only)
    pub partial: bool,
    pub failures: Vec<FailureRecord>,
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn distributed_faster(&self) -> bool {
        self.speedup > 1.0
    }

    /// distributed / serial, 0 when not measurable
    pub fn slowdown(&self) -> f64 {
        if self.speedup > 0.0 {
            1.0 / self.speedup
        } else {
            0.0
        }
    }
}

/// Report plus the matrices it describes
#[derive(Debug)]
pub struct RunOutput {
    pub report: RunReport,
    pub serial: Matrix,
    pub distributed: Matrix,
}

/// Time a serial product on the blocking pool
pub async fn time_serial(a: &Matrix, b: &Matrix) -> Result<(Matrix, Duration)> {
    let (a, b) = (a.clone(), b.clone());
    let (product, elapsed) = tokio::task::spawn_blocking(move || timed(|| kernel::multiply_sequential(&a, &b)))
        .await
        .map_err(|e| Error::Setup(format!("serial multiply aborted: {}", e)))?;
    Ok((product?, elapsed))
}

/// Run A × B serially and through `coordinator`, then verify
///
/// Under the strict policy a missing partition is returned as
/// `Error::IncompleteResult`, never as a report.
pub async fn run_comparison(coordinator: &Coordinator, a: &Matrix, b: &Matrix) -> Result<RunOutput> {
    let (serial, serial_elapsed) = time_serial(a, b).await?;
    let outcome = coordinator.multiply_distributed(a, b).await?;

    let verification = verify::compare(&serial, &outcome.result, Tolerance::default());
    if !verification.is_success() {
        tracing::warn!(detail = %verification, "distributed result failed verification");
    }

    let report = RunReport {
        rows_a: a.rows(),
        cols_a: a.cols(),
        cols_b: b.cols(),
        element: a.kind(),
        workers: outcome.partitions,
        policy: coordinator.options().policy,
        serial_ms: as_millis_f64(serial_elapsed),
        distributed_ms: as_millis_f64(outcome.elapsed),
        speedup: speedup(serial_elapsed, outcome.elapsed),
        verified: verification.is_success(),
        verification: describe(&verification, outcome.partial),
        partial: outcome.partial,
        failures: outcome.failures.iter().map(FailureRecord::from).collect(),
        skipped: outcome.skipped.iter().map(|e| e.to_string()).collect(),
    };

    Ok(RunOutput {
        report,
        serial,
        distributed: outcome.result,
    })
}

fn describe(verification: &VerificationResult, partial: bool) -> String {
    if partial {
        format!("partial result, {}", verification)
    } else {
        verification.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slowdown_is_reciprocal() {
        let report = RunReport {
            rows_a: 2,
            cols_a: 2,
            cols_b: 2,
            element: ElementKind::Int,
            workers: 2,
            policy: AggregationPolicy::Strict,
            serial_ms: 1.0,
            distributed_ms: 4.0,
            speedup: 0.25,
            verified: true,
            verification: "matches local product".to_string(),
            partial: false,
            failures: Vec::new(),
            skipped: Vec::new(),
        };
        assert!(!report.distributed_faster());
        assert_eq!(report.slowdown(), 4.0);
    }

    #[tokio::test]
    async fn test_time_serial() {
        let a = Matrix::from_int_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        let b = Matrix::from_int_rows(vec![vec![5, 6], vec![7, 8]]).unwrap();
        let (c, _) = time_serial(&a, &b).await.unwrap();
        assert_eq!(c, Matrix::from_int_rows(vec![vec![19, 22], vec![43, 50]]).unwrap());
    }
}
