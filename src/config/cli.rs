//! CLI argument parsing using clap
//!
//! Every value that also exists in the TOML config is optional here, so a
//! flag overrides the file only when it was actually given.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Standalone mode (default) - launch local workers and multiply once
    Standalone,
    /// Worker mode - serve tasks on a port
    Worker,
    /// Coordinator mode - multiply across remote workers
    Coordinator,
    /// Benchmark mode - serial vs distributed across matrix sizes
    Benchmark,
}

/// Matrix element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ElementType {
    /// 64-bit integers
    Int,
    /// 64-bit floats
    Float,
}

/// Partial failure handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyType {
    /// Fail if any partition is missing
    Strict,
    /// Return whatever arrived, flagged partial
    BestEffort,
}

/// matmesh - distributed matrix multiplication over TCP
#[derive(Parser, Debug)]
#[command(name = "matmesh")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, worker, coordinator, or benchmark
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// TOML configuration file (CLI flags override it)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Worker Options ===
    /// Port for the worker to listen on, 0 for an ephemeral port (worker mode only)
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Interface for the worker to bind (worker mode only)
    #[arg(long)]
    pub host: Option<String>,

    /// Threads used by each worker to compute its partition
    #[arg(long)]
    pub compute_threads: Option<usize>,

    // === Coordinator Options ===
    /// Comma-separated list of worker addresses (e.g., "10.0.1.10:5000,10.0.1.11")
    #[arg(long)]
    pub host_list: Option<String>,

    /// File containing worker addresses (one per line)
    #[arg(long)]
    pub clients_file: Option<PathBuf>,

    /// Port appended to worker addresses given without one
    #[arg(long, default_value = "5000")]
    pub worker_port: u16,

    /// Number of local workers (standalone and benchmark modes)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Aggregation policy when some workers fail
    #[arg(long, value_enum)]
    pub policy: Option<PolicyType>,

    /// Connect timeout per worker (e.g., 500ms, 3s)
    #[arg(long)]
    pub connect_timeout: Option<String>,

    /// Send/receive timeout per worker (e.g., 5s, 2m)
    #[arg(long)]
    pub io_timeout: Option<String>,

    /// Probe workers first and skip unreachable ones
    #[arg(long)]
    pub probe: bool,

    /// Largest accepted frame (e.g., 64M, 1G)
    #[arg(long)]
    pub max_frame_size: Option<String>,

    // === Matrix Options ===
    /// Square size shortcut: sets rows-a, cols-a and cols-b
    #[arg(short = 'n', long)]
    pub size: Option<usize>,

    /// Rows of A
    #[arg(long)]
    pub rows_a: Option<usize>,

    /// Columns of A (= rows of B)
    #[arg(long)]
    pub cols_a: Option<usize>,

    /// Columns of B
    #[arg(long)]
    pub cols_b: Option<usize>,

    /// Element type of generated matrices
    #[arg(long, value_enum)]
    pub element: Option<ElementType>,

    /// RNG seed for reproducible matrices
    #[arg(long)]
    pub seed: Option<u64>,

    // === Benchmark Options ===
    /// Comma-separated square sizes (e.g., 10,50,100,200)
    #[arg(long, value_delimiter = ',')]
    pub sizes: Option<Vec<usize>>,

    /// Repetitions per size
    #[arg(long)]
    pub repetitions: Option<usize>,

    // === Output Options ===
    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Print A, B and C when they are at most 10x10
    #[arg(long)]
    pub show_matrices: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    ///
    /// Only checks that cannot be expressed on the merged config.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host_list.is_some() && self.clients_file.is_some() {
            anyhow::bail!("--host-list and --clients-file are mutually exclusive");
        }

        if self.size.is_some() && (self.rows_a.is_some() || self.cols_a.is_some() || self.cols_b.is_some()) {
            anyhow::bail!("--size cannot be combined with --rows-a, --cols-a or --cols-b");
        }

        if self.mode == ExecutionMode::Worker
            && (self.host_list.is_some() || self.clients_file.is_some())
        {
            anyhow::bail!("worker mode does not take --host-list or --clients-file");
        }

        if self.mode == ExecutionMode::Standalone
            && (self.host_list.is_some() || self.clients_file.is_some())
        {
            anyhow::bail!("standalone mode uses local workers; use --mode coordinator for remote workers");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("matmesh").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.mode, ExecutionMode::Standalone);
        assert_eq!(cli.worker_port, 5000);
        assert!(cli.policy.is_none());
        assert!(cli.sizes.is_none());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_coordinator_flags() {
        let cli = parse(&[
            "--mode",
            "coordinator",
            "--host-list",
            "10.0.0.1:5000,10.0.0.2",
            "--policy",
            "best-effort",
            "--io-timeout",
            "5s",
            "--sizes",
            "10,50",
        ]);
        assert_eq!(cli.mode, ExecutionMode::Coordinator);
        assert_eq!(cli.policy, Some(PolicyType::BestEffort));
        assert_eq!(cli.sizes, Some(vec![10, 50]));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_conflicts() {
        assert!(parse(&["--size", "4", "--rows-a", "3"]).validate().is_err());
        assert!(parse(&["--host-list", "a:1"]).validate().is_err());
        assert!(parse(&["--mode", "worker", "--host-list", "a:1"]).validate().is_err());
        assert!(parse(&[
            "--mode",
            "coordinator",
            "--host-list",
            "a:1",
            "--clients-file",
            "hosts.txt"
        ])
        .validate()
        .is_err());
    }
}
