//! matmesh - distributed dense matrix multiplication
//!
//! A coordinator splits A into row partitions, sends each partition together
//! with the full B to one worker over TCP, and stacks the partial products
//! back in partition order.
//!
//! # Architecture
//!
//! - **Wire protocol**: length-prefixed MessagePack frames, one exchange per connection
//! - **Workers**: long-lived listeners, row-parallel compute on a rayon pool
//! - **Coordinator**: concurrent fan-out with strict or best-effort aggregation
//! - **Verification**: tolerance-based comparison against a local product
//! - **Benchmarking**: serial vs distributed timings across matrix sizes

pub mod config;
pub mod distributed;
pub mod error;
pub mod matrix;
pub mod output;
pub mod stats;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use distributed::{AggregationPolicy, Coordinator, Endpoint};
pub use error::{Error, Result};
pub use matrix::Matrix;
