//! Configuration validation

use super::*;
use crate::config::cli::ExecutionMode;
use anyhow::Result;

/// Smallest frame limit that still fits a header-sized payload
pub const MIN_FRAME_BYTES: u64 = 16;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_coordinator(&config.coordinator)?;
    validate_worker(&config.worker)?;
    validate_matrix(&config.matrix)?;
    validate_benchmark(&config.benchmark)?;
    validate_runtime(&config.runtime)?;

    Ok(())
}

/// Check that every run can give each worker at least one row
///
/// Standalone and benchmark use the in-process worker count unless endpoints
/// are configured (benchmark only); coordinator mode uses the endpoint count.
pub fn validate_worker_count(config: &Config, mode: ExecutionMode) -> Result<()> {
    let (workers, source) = match mode {
        ExecutionMode::Worker => return Ok(()),
        ExecutionMode::Standalone => (config.worker.local_workers, "local workers"),
        ExecutionMode::Coordinator => (config.coordinator.endpoints.len(), "endpoints"),
        ExecutionMode::Benchmark if config.coordinator.endpoints.is_empty() => {
            (config.worker.local_workers, "local workers")
        }
        ExecutionMode::Benchmark => (config.coordinator.endpoints.len(), "endpoints"),
    };

    match mode {
        ExecutionMode::Benchmark => {
            if let Some(&size) = config.benchmark.sizes.iter().find(|&&n| n < workers) {
                anyhow::bail!(
                    "benchmark size {} is smaller than the {} {}; every partition needs at least one row",
                    size,
                    workers,
                    source
                );
            }
        }
        _ => {
            if config.matrix.rows_a < workers {
                anyhow::bail!(
                    "rows_a ({}) is smaller than the {} {}; every partition needs at least one row",
                    config.matrix.rows_a,
                    workers,
                    source
                );
            }
        }
    }

    Ok(())
}

/// Validate coordinator configuration
pub fn validate_coordinator(coordinator: &CoordinatorConfig) -> Result<()> {
    if coordinator.connect_timeout_ms == 0 {
        anyhow::bail!("connect_timeout_ms must be greater than 0");
    }
    if coordinator.io_timeout_ms == 0 {
        anyhow::bail!("coordinator io_timeout_ms must be greater than 0");
    }
    if coordinator.max_frame_bytes < MIN_FRAME_BYTES {
        anyhow::bail!(
            "coordinator max_frame_bytes must be at least {}, got {}",
            MIN_FRAME_BYTES,
            coordinator.max_frame_bytes
        );
    }
    for (i, endpoint) in coordinator.endpoints.iter().enumerate() {
        if endpoint.port == 0 {
            anyhow::bail!("endpoint {} ({}) has port 0", i, endpoint);
        }
    }

    Ok(())
}

/// Validate worker configuration
pub fn validate_worker(worker: &WorkerConfig) -> Result<()> {
    if worker.host.trim().is_empty() {
        anyhow::bail!("worker host must not be empty");
    }
    if worker.compute_threads == 0 {
        anyhow::bail!("compute_threads must be at least 1");
    }
    if worker.io_timeout_ms == 0 {
        anyhow::bail!("worker io_timeout_ms must be greater than 0");
    }
    if worker.max_frame_bytes < MIN_FRAME_BYTES {
        anyhow::bail!(
            "worker max_frame_bytes must be at least {}, got {}",
            MIN_FRAME_BYTES,
            worker.max_frame_bytes
        );
    }
    if worker.local_workers == 0 {
        anyhow::bail!("local_workers must be at least 1");
    }

    Ok(())
}

/// Validate matrix dimensions
pub fn validate_matrix(matrix: &MatrixConfig) -> Result<()> {
    for (name, value) in [
        ("rows_a", matrix.rows_a),
        ("cols_a", matrix.cols_a),
        ("cols_b", matrix.cols_b),
    ] {
        if value == 0 {
            anyhow::bail!("{} must be at least 1", name);
        }
    }

    Ok(())
}

/// Validate benchmark configuration
pub fn validate_benchmark(benchmark: &BenchmarkConfig) -> Result<()> {
    if benchmark.sizes.is_empty() {
        anyhow::bail!("benchmark sizes must not be empty");
    }
    if let Some(pos) = benchmark.sizes.iter().position(|&s| s == 0) {
        anyhow::bail!("benchmark size at position {} must be at least 1", pos);
    }
    if benchmark.repetitions == 0 {
        anyhow::bail!("repetitions must be at least 1");
    }

    Ok(())
}

/// Validate runtime configuration
///
/// Accepts a plain level or an EnvFilter directive list (`matmesh=debug,info`).
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    let level = runtime.log_level.trim().to_ascii_lowercase();
    if level.is_empty() {
        anyhow::bail!("log_level must not be empty");
    }
    if !level.contains('=') && !level.contains(',') && !LOG_LEVELS.contains(&level.as_str()) {
        anyhow::bail!(
            "log_level must be one of {}, got '{}'",
            LOG_LEVELS.join(", "),
            runtime.log_level
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_dimension() {
        let mut config = Config::default();
        config.matrix.cols_a = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("cols_a"));
    }

    #[test]
    fn test_zero_timeouts() {
        let mut config = Config::default();
        config.coordinator.connect_timeout_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.worker.io_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_benchmark_bounds() {
        let mut config = Config::default();
        config.benchmark.sizes.clear();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.benchmark.sizes = vec![10, 0];
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.benchmark.repetitions = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_worker_bounds() {
        let mut config = Config::default();
        config.worker.compute_threads = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.worker.max_frame_bytes = 8;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rows_cover_local_workers() {
        let mut config = Config::default();
        config.worker.local_workers = 3;
        config.matrix.rows_a = 2;
        let err = validate_worker_count(&config, ExecutionMode::Standalone).unwrap_err();
        assert!(err.to_string().contains("rows_a (2)"));

        config.matrix.rows_a = 3;
        assert!(validate_worker_count(&config, ExecutionMode::Standalone).is_ok());
        // A worker serves whatever it is sent
        config.matrix.rows_a = 1;
        assert!(validate_worker_count(&config, ExecutionMode::Worker).is_ok());
    }

    #[test]
    fn test_rows_cover_endpoints() {
        let mut config = Config::default();
        config.coordinator.endpoints = (0..5).map(|i| Endpoint::new("10.0.0.1", 5000 + i)).collect();
        config.matrix.rows_a = 4;
        assert!(validate_worker_count(&config, ExecutionMode::Coordinator).is_err());
        config.matrix.rows_a = 5;
        assert!(validate_worker_count(&config, ExecutionMode::Coordinator).is_ok());
    }

    #[test]
    fn test_benchmark_sizes_cover_workers() {
        let mut config = Config::default();
        config.worker.local_workers = 4;
        config.benchmark.sizes = vec![16, 2, 64];
        let err = validate_worker_count(&config, ExecutionMode::Benchmark).unwrap_err();
        assert!(err.to_string().contains("benchmark size 2"));

        // Configured endpoints take the place of local workers
        config.coordinator.endpoints = vec![Endpoint::new("a", 1), Endpoint::new("b", 1)];
        assert!(validate_worker_count(&config, ExecutionMode::Benchmark).is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut config = Config::default();
        config.runtime.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());

        config.runtime.log_level = "matmesh=debug,warn".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
