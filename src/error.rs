//! Error taxonomy for the distributed multiplication protocol
//!
//! Per-endpoint failures (`Transport`, `Closed`, `Framing`, `FrameTooLarge`,
//! `Decode`, `Protocol`, `Dimension`, `Remote`) are isolated to one dispatch
//! task. `IncompleteResult` is only produced by the coordinator once every
//! task has settled.

use crate::distributed::endpoint::Endpoint;
use std::fmt;
use thiserror::Error;

/// Errors produced by the matrix and protocol layers
#[derive(Error, Debug)]
pub enum Error {
    /// Connection refused, reset, timed out, or closed mid-frame
    #[error("transport error: {0}")]
    Transport(String),

    /// Peer closed the connection before sending a single header byte
    #[error("connection closed before any frame was sent")]
    Closed,

    /// Header or payload could not be fully read
    #[error("framing error: {0}")]
    Framing(String),

    /// Declared frame length exceeds the configured maximum
    #[error("frame too large: {declared} bytes (max {max})")]
    FrameTooLarge { declared: u64, max: u64 },

    /// Payload bytes do not match the expected structure
    #[error("decode error: {0}")]
    Decode(String),

    /// Payload could not be serialized
    #[error("encode error: {0}")]
    Encode(String),

    /// Unexpected message kind or protocol version
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Incompatible shapes for multiplication or stacking
    #[error("dimension error: {0}")]
    Dimension(String),

    /// Rows of unequal length or data length not matching the shape
    #[error("shape error: {0}")]
    Shape(String),

    /// Partition count is zero or exceeds the row count
    #[error("invalid partition count {requested} for a matrix with {rows} rows")]
    InvalidPartitionCount { requested: usize, rows: usize },

    /// Worker answered with a failure that is not a dimension error
    #[error("worker {worker} reported: {message}")]
    Remote { worker: String, message: String },

    /// Strict policy: not every partition produced a result
    #[error("incomplete result: received {received} of {expected} partial results ({})", format_failures(.failures))]
    IncompleteResult {
        expected: usize,
        received: usize,
        failures: Vec<EndpointFailure>,
    },

    /// Endpoint string could not be parsed
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Aggregation policy name not recognised
    #[error("invalid aggregation policy '{0}' (expected strict or best_effort)")]
    InvalidPolicy(String),

    /// No endpoints to dispatch to
    #[error("no worker endpoints available")]
    NoEndpoints,

    /// Worker could not bind its listener or build its compute pool
    #[error("worker setup failed: {0}")]
    Setup(String),
}

impl Error {
    /// Whether this error belongs to a single endpoint's exchange
    pub fn is_endpoint_failure(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Closed
                | Error::Framing(_)
                | Error::FrameTooLarge { .. }
                | Error::Decode(_)
                | Error::Protocol(_)
                | Error::Dimension(_)
                | Error::Remote { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// One endpoint that produced no partial result
#[derive(Debug)]
pub struct EndpointFailure {
    /// Partition index assigned to the endpoint
    pub index: usize,
    pub endpoint: Endpoint,
    pub error: Error,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition {} on {}: {}", self.index, self.endpoint, self.error)
    }
}

fn format_failures(failures: &[EndpointFailure]) -> String {
    if failures.is_empty() {
        return "no endpoint failures recorded".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
