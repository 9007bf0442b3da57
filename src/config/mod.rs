//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::distributed::protocol::DEFAULT_MAX_FRAME_BYTES;
use crate::distributed::{AggregationPolicy, CoordinatorOptions, Endpoint, WorkerOptions};
use crate::matrix::ElementKind;
use crate::stats::BenchmarkSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Worker endpoints (`host:port`)
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    /// Aggregation policy on partial failure
    #[serde(default)]
    pub policy: AggregationPolicy,
    /// Probe endpoints before partitioning
    #[serde(default)]
    pub probe_liveness: bool,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u64,
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_io_timeout_ms() -> u64 {
    30_000
}

fn default_max_frame_bytes() -> u64 {
    DEFAULT_MAX_FRAME_BYTES
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
            policy: AggregationPolicy::default(),
            probe_liveness: false,
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind (0 = ephemeral)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Compute threads per worker
    #[serde(default = "default_compute_threads")]
    pub compute_threads: usize,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u64,
    /// In-process workers for standalone and benchmark modes
    #[serde(default = "default_local_workers")]
    pub local_workers: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_compute_threads() -> usize {
    num_cpus::get()
}

fn default_local_workers() -> usize {
    2
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            compute_threads: default_compute_threads(),
            io_timeout_ms: default_io_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            local_workers: default_local_workers(),
        }
    }
}

/// Operand configuration: A is rows_a × cols_a, B is cols_a × cols_b
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default = "default_dim")]
    pub rows_a: usize,
    #[serde(default = "default_dim")]
    pub cols_a: usize,
    #[serde(default = "default_dim")]
    pub cols_b: usize,
    #[serde(default)]
    pub element: ElementKind,
    pub seed: Option<u64>,
}

fn default_dim() -> usize {
    4
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            rows_a: default_dim(),
            cols_a: default_dim(),
            cols_b: default_dim(),
            element: ElementKind::default(),
            seed: None,
        }
    }
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default = "default_sizes")]
    pub sizes: Vec<usize>,
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
}

fn default_sizes() -> Vec<usize> {
    vec![10, 50, 100, 200]
}

fn default_repetitions() -> usize {
    3
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            sizes: default_sizes(),
            repetitions: default_repetitions(),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Print matrices up to 10x10
    #[serde(default)]
    pub show_matrices: bool,
    /// Emit reports as JSON on stdout
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            show_matrices: false,
            json: false,
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Coordinator: {}", self.coordinator)?;
        writeln!(f, "Worker: {}", self.worker)?;
        writeln!(f, "Matrix: {}", self.matrix)?;
        writeln!(f, "Benchmark: {}", self.benchmark)?;
        write!(f, "Runtime: {}", self.runtime)
    }
}

impl fmt::Display for CoordinatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} endpoint(s), connect {}ms, io {}ms, {} policy",
            self.endpoints.len(),
            self.connect_timeout_ms,
            self.io_timeout_ms,
            self.policy
        )?;
        if self.probe_liveness {
            write!(f, ", probing")?;
        }
        Ok(())
    }
}

impl fmt::Display for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}, {} compute thread(s), {} local",
            self.host, self.port, self.compute_threads, self.local_workers
        )
    }
}

impl fmt::Display for MatrixConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A {}x{} × B {}x{} ({})",
            self.rows_a, self.cols_a, self.cols_a, self.cols_b, self.element
        )?;
        if let Some(seed) = self.seed {
            write!(f, ", seed {}", seed)?;
        }
        Ok(())
    }
}

impl fmt::Display for BenchmarkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sizes {:?}, {} repetition(s)", self.sizes, self.repetitions)
    }
}

impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log level {}", self.log_level)?;
        if self.json {
            write!(f, ", json")?;
        }
        if self.show_matrices {
            write!(f, ", show matrices")?;
        }
        Ok(())
    }
}

impl CoordinatorConfig {
    /// Convert to dispatch options
    pub fn options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            io_timeout: Duration::from_millis(self.io_timeout_ms),
            policy: self.policy,
            probe_liveness: self.probe_liveness,
            max_frame_bytes: self.max_frame_bytes,
        }
    }
}

impl WorkerConfig {
    /// Convert to worker service options
    pub fn options(&self) -> WorkerOptions {
        WorkerOptions {
            host: self.host.clone(),
            port: self.port,
            compute_threads: self.compute_threads,
            io_timeout: Duration::from_millis(self.io_timeout_ms),
            max_frame_bytes: self.max_frame_bytes,
        }
    }
}

impl Config {
    /// Benchmark settings drawn from the benchmark and matrix sections
    pub fn benchmark_settings(&self) -> BenchmarkSettings {
        BenchmarkSettings {
            sizes: self.benchmark.sizes.clone(),
            repetitions: self.benchmark.repetitions,
            element: self.matrix.element,
            seed: self.matrix.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.coordinator.connect_timeout_ms, 3000);
        assert_eq!(config.coordinator.policy, AggregationPolicy::Strict);
        assert_eq!(config.worker.port, 5000);
        assert!(config.worker.compute_threads >= 1);
        assert_eq!(config.matrix.rows_a, 4);
        assert_eq!(config.benchmark.sizes, vec![10, 50, 100, 200]);
        assert_eq!(config.runtime.log_level, "info");
    }

    #[test]
    fn test_options_conversion() {
        let mut config = Config::default();
        config.coordinator.io_timeout_ms = 1500;
        config.coordinator.policy = AggregationPolicy::BestEffort;
        let options = config.coordinator.options();
        assert_eq!(options.io_timeout, Duration::from_millis(1500));
        assert_eq!(options.policy, AggregationPolicy::BestEffort);

        config.worker.port = 0;
        assert_eq!(config.worker.options().port, 0);
    }

    #[test]
    fn test_display() {
        let text = Config::default().to_string();
        assert!(text.contains("strict policy"));
        assert!(text.contains("A 4x4"));
    }
}
