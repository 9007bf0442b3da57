//! Benchmark across matrix sizes
//!
//! For each square size one pair (A, B) is generated and multiplied
//! `repetitions` times, serially and distributed. A distributed sample that
//! fails or does not verify is discarded.

use super::Summary;
use crate::distributed::events::SharedSink;
use crate::distributed::Coordinator;
use crate::error::Result;
use crate::matrix::generate::MatrixGenerator;
use crate::matrix::verify::{self, Tolerance};
use crate::matrix::ElementKind;
use serde::Serialize;
use std::time::Duration;

const SOURCE_ID: &str = "BENCHMARK";

/// Benchmark parameters
#[derive(Debug, Clone)]
pub struct BenchmarkSettings {
    /// Square sizes to test, in order
    pub sizes: Vec<usize>,
    pub repetitions: usize,
    pub element: ElementKind,
    pub seed: Option<u64>,
}

/// Timings for one size
#[derive(Debug, Clone, Serialize)]
pub struct SizeResult {
    pub size: usize,
    pub serial: Summary,
    pub distributed: Summary,

    /// mean serial / mean distributed, 0 without distributed samples
    pub speedup: f64,

    /// speedup / workers × 100
    pub efficiency_pct: f64,

    /// Distributed runs that failed or did not verify
    pub rejected: usize,
}

/// Size with the highest speedup
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestSpeedup {
    pub size: usize,
    pub speedup: f64,
}

/// Full benchmark report
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub workers: usize,
    pub repetitions: usize,
    pub element: ElementKind,
    pub results: Vec<SizeResult>,

    /// First size where distributed beats serial
    pub break_even: Option<usize>,
    pub best: Option<BestSpeedup>,
    pub mean_efficiency_pct: f64,
}

impl BenchmarkReport {
    /// Derive the summary fields from per-size results
    pub fn from_results(workers: usize, repetitions: usize, element: ElementKind, results: Vec<SizeResult>) -> Self {
        let break_even = results.iter().find(|r| r.speedup > 1.0).map(|r| r.size);
        let best = results
            .iter()
            .max_by(|x, y| x.speedup.total_cmp(&y.speedup))
            .map(|r| BestSpeedup {
                size: r.size,
                speedup: r.speedup,
            });
        let mean_efficiency_pct = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.efficiency_pct).sum::<f64>() / results.len() as f64
        };

        Self {
            workers,
            repetitions,
            element,
            results,
            break_even,
            best,
            mean_efficiency_pct,
        }
    }
}

/// Build the per-size result from raw samples
pub fn summarize_size(size: usize, workers: usize, serial: &[Duration], distributed: &[Duration], rejected: usize) -> SizeResult {
    let serial = Summary::from_durations(serial);
    let distributed = Summary::from_durations(distributed);
    let speedup = if distributed.mean_ms > 0.0 {
        serial.mean_ms / distributed.mean_ms
    } else {
        0.0
    };
    let efficiency_pct = if workers > 0 {
        speedup / workers as f64 * 100.0
    } else {
        0.0
    };

    SizeResult {
        size,
        serial,
        distributed,
        speedup,
        efficiency_pct,
        rejected,
    }
}

/// Run the benchmark through `coordinator`
pub async fn run_benchmark(
    coordinator: &Coordinator,
    settings: &BenchmarkSettings,
    sink: &SharedSink,
) -> Result<BenchmarkReport> {
    let workers = coordinator.endpoints().len();
    let mut generator = MatrixGenerator::new(settings.seed);
    let mut results = Vec::with_capacity(settings.sizes.len());

    for &size in &settings.sizes {
        sink.record(SOURCE_ID, &format!("testing {}x{} matrices", size, size));
        let (a, b) = generator.pair(size, size, size, settings.element)?;

        let mut serial_samples = Vec::with_capacity(settings.repetitions);
        let mut distributed_samples = Vec::with_capacity(settings.repetitions);
        let mut rejected = 0;

        for rep in 1..=settings.repetitions {
            let (_, serial_elapsed) = super::comparison::time_serial(&a, &b).await?;
            serial_samples.push(serial_elapsed);

            match coordinator.multiply_distributed(&a, &b).await {
                Ok(outcome) if !outcome.partial && verify::verify_with(&a, &b, &outcome.result, Tolerance::default()).is_success() => {
                    distributed_samples.push(outcome.elapsed);
                }
                Ok(_) => {
                    rejected += 1;
                    sink.record(
                        SOURCE_ID,
                        &format!("size {} repetition {}: result failed verification", size, rep),
                    );
                }
                Err(e) => {
                    rejected += 1;
                    sink.record(SOURCE_ID, &format!("size {} repetition {}: {}", size, rep, e));
                }
            }
        }

        let result = summarize_size(size, workers, &serial_samples, &distributed_samples, rejected);
        sink.record(
            SOURCE_ID,
            &format!(
                "{}x{}: serial {:.3}ms, distributed {:.3}ms, speedup {:.2}x",
                size, size, result.serial.mean_ms, result.distributed.mean_ms, result.speedup
            ),
        );
        results.push(result);
    }

    Ok(BenchmarkReport::from_results(
        workers,
        settings.repetitions,
        settings.element,
        results,
    ))
}
