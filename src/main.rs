//! matmesh CLI entry point

use anyhow::{Context, Result};
use matmesh::config::cli::{Cli, ExecutionMode};
use matmesh::config::{toml as config_toml, validator, Config};
use matmesh::distributed::{Coordinator, LocalWorkers, SharedSink, TracingSink, WorkerService};
use matmesh::matrix::generate::MatrixGenerator;
use matmesh::output::{json, text};
use matmesh::stats;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::oneshot;

fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse_args();
    cli.validate()?;

    let config = config_toml::load_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;
    validator::validate_worker_count(&config, cli.mode).context("Configuration validation failed")?;

    matmesh::util::logging::init_logging(&config.runtime.log_level)?;
    tracing::debug!("matmesh v{}\n{}", env!("CARGO_PKG_VERSION"), config);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let sink: SharedSink = Arc::new(TracingSink);

    runtime.block_on(async {
        match cli.mode {
            ExecutionMode::Worker => run_worker(&config, sink).await,
            ExecutionMode::Coordinator => run_coordinator(&config, sink).await,
            ExecutionMode::Standalone => run_standalone(&config, sink).await,
            ExecutionMode::Benchmark => run_benchmark(&config, sink).await,
        }
    })
}

/// Serve tasks until Ctrl-C
///
/// The bound port is printed as `PORT=<n>` on stdout so a supervisor can
/// pick it up when the worker was started with port 0.
async fn run_worker(config: &Config, sink: SharedSink) -> Result<ExitCode> {
    let service = WorkerService::bind(config.worker.options(), sink)
        .await
        .context("Failed to start worker")?;

    let (tx, rx) = oneshot::channel();
    service.announce(tx);
    let port = rx.await.context("Worker port announcement lost")?;
    println!("PORT={}", port);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    service
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("Ctrl-C handler unavailable, running until killed");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(ExitCode::SUCCESS)
}

/// Multiply once across the configured remote workers
async fn run_coordinator(config: &Config, sink: SharedSink) -> Result<ExitCode> {
    if config.coordinator.endpoints.is_empty() {
        anyhow::bail!("coordinator mode needs --host-list, --clients-file or [coordinator] endpoints");
    }

    let coordinator = Coordinator::new(
        config.coordinator.endpoints.clone(),
        config.coordinator.options(),
        sink,
    );
    multiply_and_report(&coordinator, config).await
}

/// Multiply once across in-process workers
async fn run_standalone(config: &Config, sink: SharedSink) -> Result<ExitCode> {
    let workers = LocalWorkers::spawn(config.worker.local_workers, config.worker.options(), sink.clone())
        .await
        .context("Failed to start local workers")?;

    let coordinator = Coordinator::new(workers.endpoints().to_vec(), config.coordinator.options(), sink);
    let status = multiply_and_report(&coordinator, config).await;

    workers.shutdown().await.context("Failed to stop local workers")?;
    status
}

/// Benchmark across remote workers if configured, local ones otherwise
async fn run_benchmark(config: &Config, sink: SharedSink) -> Result<ExitCode> {
    let local = if config.coordinator.endpoints.is_empty() {
        Some(
            LocalWorkers::spawn(config.worker.local_workers, config.worker.options(), sink.clone())
                .await
                .context("Failed to start local workers")?,
        )
    } else {
        None
    };
    let endpoints = match &local {
        Some(workers) => workers.endpoints().to_vec(),
        None => config.coordinator.endpoints.clone(),
    };

    let coordinator = Coordinator::new(endpoints, config.coordinator.options(), sink.clone());
    let report = stats::run_benchmark(&coordinator, &config.benchmark_settings(), &sink).await;

    if let Some(workers) = local {
        workers.shutdown().await.context("Failed to stop local workers")?;
    }
    let report = report.context("Benchmark failed")?;

    if config.runtime.json {
        println!("{}", json::render_benchmark(&report)?);
    } else {
        text::print_benchmark(&report);
    }

    Ok(ExitCode::SUCCESS)
}

/// Generate operands, run the comparison and print the report
///
/// Fails the process when no result was produced or it did not verify.
async fn multiply_and_report(coordinator: &Coordinator, config: &Config) -> Result<ExitCode> {
    let m = &config.matrix;
    let (a, b) = MatrixGenerator::new(m.seed)
        .pair(m.rows_a, m.cols_a, m.cols_b, m.element)
        .context("Failed to generate matrices")?;

    match stats::run_comparison(coordinator, &a, &b).await {
        Ok(run) => {
            if config.runtime.json {
                println!("{}", json::render_run(&run.report)?);
            } else {
                let matrices = config.runtime.show_matrices.then(|| text::RunMatrices {
                    a: &a,
                    b: &b,
                    c: &run.distributed,
                });
                text::print_run(&run.report, matrices);
            }
            Ok(if run.report.verified {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(e) => {
            if config.runtime.json {
                println!("{}", json::render_failure(&e)?);
            } else {
                text::print_failure(&e);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
