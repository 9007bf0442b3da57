//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{convert_element_type, convert_policy_type, parse_duration_ms, parse_size};
use crate::distributed::endpoint;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the effective configuration: TOML file (if any) then CLI overrides
pub fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Coordinator endpoints
    if let Some(list) = &cli.host_list {
        config.coordinator.endpoints = endpoint::parse_host_list(list, cli.worker_port)
            .context("Invalid --host-list")?;
    } else if let Some(path) = &cli.clients_file {
        config.coordinator.endpoints = endpoint::read_clients_file(path, cli.worker_port)
            .with_context(|| format!("Invalid clients file: {}", path.display()))?;
    }

    if let Some(policy) = cli.policy {
        config.coordinator.policy = convert_policy_type(policy);
    }
    if let Some(s) = &cli.connect_timeout {
        config.coordinator.connect_timeout_ms = parse_duration_ms(s).context("Invalid --connect-timeout")?;
    }
    if let Some(s) = &cli.io_timeout {
        let ms = parse_duration_ms(s).context("Invalid --io-timeout")?;
        config.coordinator.io_timeout_ms = ms;
        config.worker.io_timeout_ms = ms;
    }
    if cli.probe {
        config.coordinator.probe_liveness = true;
    }
    if let Some(s) = &cli.max_frame_size {
        let bytes = parse_size(s).context("Invalid --max-frame-size")?;
        config.coordinator.max_frame_bytes = bytes;
        config.worker.max_frame_bytes = bytes;
    }

    // Worker
    if let Some(port) = cli.listen_port {
        config.worker.port = port;
    }
    if let Some(host) = &cli.host {
        config.worker.host = host.clone();
    }
    if let Some(threads) = cli.compute_threads {
        config.worker.compute_threads = threads;
    }
    if let Some(workers) = cli.workers {
        config.worker.local_workers = workers;
    }

    // Matrix
    if let Some(n) = cli.size {
        config.matrix.rows_a = n;
        config.matrix.cols_a = n;
        config.matrix.cols_b = n;
    }
    if let Some(r) = cli.rows_a {
        config.matrix.rows_a = r;
    }
    if let Some(c) = cli.cols_a {
        config.matrix.cols_a = c;
    }
    if let Some(c) = cli.cols_b {
        config.matrix.cols_b = c;
    }
    if let Some(element) = cli.element {
        config.matrix.element = convert_element_type(element);
    }
    if cli.seed.is_some() {
        config.matrix.seed = cli.seed;
    }

    // Benchmark
    if let Some(sizes) = &cli.sizes {
        config.benchmark.sizes = sizes.clone();
    }
    if let Some(reps) = cli.repetitions {
        config.benchmark.repetitions = reps;
    }

    // Runtime
    if cli.json {
        config.runtime.json = true;
    }
    if cli.show_matrices {
        config.runtime.show_matrices = true;
    }
    if let Some(level) = &cli.log_level {
        config.runtime.log_level = level.clone();
    }

    Ok(config)
}
