//! Distributed coordinator
//!
//! The coordinator:
//! - Partitions A by rows, one partition per endpoint
//! - Opens one connection per endpoint and sends {partition, B} concurrently
//! - Collects partial results in partition order, not arrival order
//! - Applies the aggregation policy once every dispatch task has settled
//! - Stacks the partial results into the final matrix
//!
//! Each dispatch task owns its connection for its whole lifetime and is
//! bounded by the connect and I/O timeouts. A failing endpoint never aborts
//! its siblings; on a strict-policy failure the remaining tasks still run to
//! completion and their results are discarded.

use crate::distributed::endpoint::Endpoint;
use crate::distributed::events::SharedSink;
use crate::distributed::protocol::{self, Message, TaskMessage, DEFAULT_MAX_FRAME_BYTES, PROTOCOL_VERSION};
use crate::error::{EndpointFailure, Error, Result};
use crate::matrix::partition::{self, Partition};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

const SOURCE_ID: &str = "COORDINATOR";

/// What to do when some partitions produced no result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Any missing partial result fails the whole multiplication
    #[default]
    Strict,
    /// Stack whatever arrived; the result is flagged partial and its row
    /// count no longer matches A
    BestEffort,
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationPolicy::Strict => write!(f, "strict"),
            AggregationPolicy::BestEffort => write!(f, "best_effort"),
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(AggregationPolicy::Strict),
            "best_effort" => Ok(AggregationPolicy::BestEffort),
            _ => Err(Error::InvalidPolicy(s.trim().to_string())),
        }
    }
}

/// Dispatch settings
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub connect_timeout: Duration,

    /// Bound on writing the task and on reading the result, each
    pub io_timeout: Duration,

    pub policy: AggregationPolicy,

    /// Probe endpoints first and partition across live ones only
    pub probe_liveness: bool,

    pub max_frame_bytes: u64,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            io_timeout: Duration::from_secs(30),
            policy: AggregationPolicy::Strict,
            probe_liveness: false,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Result of one distributed multiplication
#[derive(Debug)]
pub struct DistributedOutcome {
    /// Vertically stacked partial results, in partition order
    pub result: Matrix,

    /// Dispatch-to-stack wall-clock time
    pub elapsed: Duration,

    /// Number of partitions dispatched
    pub partitions: usize,

    /// Endpoints that produced no partial result (best-effort only)
    pub failures: Vec<EndpointFailure>,

    /// Endpoints left out by the liveness probe
    pub skipped: Vec<Endpoint>,

    /// Result is missing row ranges of A
    pub partial: bool,
}

/// Outcome of a liveness probe
#[derive(Debug, Clone, Default)]
pub struct LivenessReport {
    pub live: Vec<Endpoint>,
    pub unreachable: Vec<Endpoint>,
}

/// Distributed coordinator
pub struct Coordinator {
    endpoints: Vec<Endpoint>,
    options: CoordinatorOptions,
    sink: SharedSink,
}

impl Coordinator {
    pub fn new(endpoints: Vec<Endpoint>, options: CoordinatorOptions, sink: SharedSink) -> Self {
        Self {
            endpoints,
            options,
            sink,
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Connect to every endpoint and close immediately
    ///
    /// Probes run concurrently; the report keeps configuration order.
    pub async fn probe_endpoints(&self) -> LivenessReport {
        let handles: Vec<_> = self
            .endpoints
            .iter()
            .cloned()
            .map(|endpoint| {
                let limit = self.options.connect_timeout;
                tokio::spawn(async move {
                    let alive = connect(&endpoint, limit).await.is_ok();
                    (endpoint, alive)
                })
            })
            .collect();

        let mut report = LivenessReport::default();
        for (handle, endpoint) in handles.into_iter().zip(self.endpoints.iter()) {
            match handle.await {
                Ok((endpoint, true)) => report.live.push(endpoint),
                Ok((endpoint, false)) => {
                    self.sink
                        .record(SOURCE_ID, &format!("endpoint {} is unreachable", endpoint));
                    report.unreachable.push(endpoint);
                }
                Err(_) => report.unreachable.push(endpoint.clone()),
            }
        }
        report
    }

    /// Multiply A by B across the configured endpoints
    pub async fn multiply_distributed(&self, a: &Matrix, b: &Matrix) -> Result<DistributedOutcome> {
        if self.endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }

        let (targets, skipped) = if self.options.probe_liveness {
            let report = self.probe_endpoints().await;
            if !report.unreachable.is_empty() {
                self.sink.record(
                    SOURCE_ID,
                    &format!(
                        "skipping {} unreachable endpoint(s), {} live",
                        report.unreachable.len(),
                        report.live.len()
                    ),
                );
            }
            (report.live, report.unreachable)
        } else {
            (self.endpoints.clone(), Vec::new())
        };
        if targets.is_empty() {
            return Err(Error::NoEndpoints);
        }

        let partitions = partition::split(a, targets.len())?;
        let expected = partitions.len();
        let row_counts: Vec<usize> = partitions.iter().map(|p| p.matrix.rows()).collect();

        self.sink.record(
            SOURCE_ID,
            &format!(
                "dispatching {}x{} by {}x{} across {} endpoint(s) ({} policy)",
                a.rows(),
                a.cols(),
                b.rows(),
                b.cols(),
                expected,
                self.options.policy
            ),
        );

        let start = Instant::now();
        let shared_b = Arc::new(b.clone());
        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .zip(partitions)
            .map(|(endpoint, partition)| {
                let b = shared_b.clone();
                let options = self.options.clone();
                tokio::spawn(async move { dispatch(&endpoint, partition, &b, &options).await })
            })
            .collect();

        // Await in partition order; arrival order is irrelevant
        let mut partials: Vec<Matrix> = Vec::with_capacity(expected);
        let mut failures = Vec::new();
        for (index, (handle, endpoint)) in handles.into_iter().zip(targets.iter()).enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(Error::Transport(format!("dispatch task aborted: {}", e))),
            };
            let checked = outcome.and_then(|m| check_shape(&m, row_counts[index], b.cols()).map(|_| m));
            match checked {
                Ok(m) => partials.push(m),
                Err(error) => {
                    tracing::warn!(partition = index, endpoint = %endpoint, error = %error, "endpoint failed");
                    self.sink.record(
                        SOURCE_ID,
                        &format!("partition {} on {} failed: {}", index, endpoint, error),
                    );
                    failures.push(EndpointFailure {
                        index,
                        endpoint: endpoint.clone(),
                        error,
                    });
                }
            }
        }

        let received = partials.len();
        let partial = !failures.is_empty();
        if partial && (self.options.policy == AggregationPolicy::Strict || received == 0) {
            return Err(Error::IncompleteResult {
                expected,
                received,
                failures,
            });
        }

        let result = Matrix::vstack(&partials)?;
        let elapsed = start.elapsed();

        if partial {
            self.sink.record(
                SOURCE_ID,
                &format!(
                    "PARTIAL result {}x{} from {} of {} partitions (rows of A are missing)",
                    result.rows(),
                    result.cols(),
                    received,
                    expected
                ),
            );
        } else {
            self.sink.record(
                SOURCE_ID,
                &format!(
                    "assembled {}x{} result in {}",
                    result.rows(),
                    result.cols(),
                    crate::util::time::format_duration(elapsed)
                ),
            );
        }

        Ok(DistributedOutcome {
            result,
            elapsed,
            partitions: expected,
            failures,
            skipped,
            partial,
        })
    }
}

/// PartialResult must have the partition's rows and B's columns
fn check_shape(m: &Matrix, rows: usize, cols: usize) -> Result<()> {
    if m.shape() != (rows, cols) {
        return Err(Error::Protocol(format!(
            "partial result is {}x{}, expected {}x{}",
            m.rows(),
            m.cols(),
            rows,
            cols
        )));
    }
    Ok(())
}

async fn connect(endpoint: &Endpoint, limit: Duration) -> Result<TcpStream> {
    let stream = tokio::time::timeout(limit, TcpStream::connect(endpoint.address()))
        .await
        .map_err(|_| Error::Transport(format!("timed out connecting to {} after {:?}", endpoint, limit)))?
        .map_err(|e| Error::Transport(format!("failed to connect to {}: {}", endpoint, e)))?;
    Ok(stream)
}

/// One request/response exchange with one endpoint
async fn dispatch(
    endpoint: &Endpoint,
    partition: Partition,
    b: &Matrix,
    options: &CoordinatorOptions,
) -> Result<Matrix> {
    let mut stream = connect(endpoint, options.connect_timeout).await?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(endpoint = %endpoint, error = %e, "failed to set TCP_NODELAY");
    }

    let index = partition.index;
    let task = Message::Task(TaskMessage {
        protocol_version: PROTOCOL_VERSION,
        partition_index: index,
        submatrix: partition.matrix,
        matrix_b: b.clone(),
    });

    tokio::time::timeout(options.io_timeout, protocol::write_message(&mut stream, &task))
        .await
        .map_err(|_| Error::Transport(format!("timed out sending task to {}", endpoint)))??;
    drop(task);

    let reply = tokio::time::timeout(
        options.io_timeout,
        protocol::read_message(&mut stream, options.max_frame_bytes),
    )
    .await
    .map_err(|_| Error::Transport(format!("timed out waiting for result from {}", endpoint)))??;

    match reply {
        Message::Result(r) if r.partition_index == index => Ok(r.matrix),
        Message::Result(r) => Err(Error::Protocol(format!(
            "result for partition {} answered a task for partition {}",
            r.partition_index, index
        ))),
        Message::Error(e) => Err(e.into_error()),
        other => Err(Error::Protocol(format!("expected RESULT, got {}", other.kind()))),
    }
}
