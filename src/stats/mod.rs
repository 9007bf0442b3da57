//! Timing statistics
//!
//! - `comparison`: one multiplication timed serially and distributed, with verification
//! - `benchmark`: repeated comparisons across matrix sizes

pub mod benchmark;
pub mod comparison;

use serde::Serialize;
use std::time::Duration;

pub use benchmark::{run_benchmark, BenchmarkReport, BenchmarkSettings, SizeResult};
pub use comparison::{run_comparison, FailureRecord, RunReport};

/// Mean and population standard deviation of a set of timings, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub samples: usize,
    pub mean_ms: f64,
    pub std_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl Summary {
    /// Summarize samples; all fields are zero when there are none
    pub fn from_durations(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let ms: Vec<f64> = samples.iter().map(|d| crate::util::time::as_millis_f64(*d)).collect();
        let n = ms.len() as f64;
        let mean = ms.iter().sum::<f64>() / n;
        let variance = ms.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Self {
            samples: ms.len(),
            mean_ms: mean,
            std_ms: variance.sqrt(),
            min_ms: ms.iter().copied().fold(f64::INFINITY, f64::min),
            max_ms: ms.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}
