//! Distributed multiplication
//!
//! # Architecture
//!
//! matmesh uses a coordinator-worker architecture:
//!
//! - **Coordinator**: partitions A, fans tasks out to every endpoint, collects
//!   and stacks the partial results
//! - **Worker**: long-lived listener that multiplies one partition by B per
//!   connection
//!
//! # Modules
//!
//! - `protocol`: message definitions, serialization and framing
//! - `endpoint`: worker addresses, host lists and clients files
//! - `events`: event sinks for status records
//! - `worker`: worker service and in-process local workers
//! - `coordinator`: dispatch, collection and aggregation policy

pub mod coordinator;
pub mod endpoint;
pub mod events;
pub mod protocol;
pub mod worker;

// Re-export key types
pub use coordinator::{AggregationPolicy, Coordinator, CoordinatorOptions, DistributedOutcome, LivenessReport};
pub use endpoint::Endpoint;
pub use events::{ChannelSink, Event, EventSink, NullSink, SharedSink, TracingSink};
pub use protocol::{Message, PROTOCOL_VERSION};
pub use worker::{LocalWorkers, WorkerOptions, WorkerService};
