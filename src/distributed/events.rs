//! Event sinks
//!
//! Workers and the coordinator report status through an `EventSink` handed
//! to them at construction, so the protocol core never writes to a console
//! or a shared queue directly.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receiver of status records from workers and the coordinator
pub trait EventSink: Send + Sync {
    fn record(&self, source_id: &str, message: &str);
}

/// Shared handle to a sink
pub type SharedSink = Arc<dyn EventSink>;

/// One status record
#[derive(Debug, Clone)]
pub struct Event {
    pub source_id: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Forwards records to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, source_id: &str, message: &str) {
        tracing::info!(source = %source_id, "{}", message);
    }
}

/// Discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _source_id: &str, _message: &str) {}
}

/// Pushes records onto an unbounded channel for a supervising collaborator
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn record(&self, source_id: &str, message: &str) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(Event {
            source_id: source_id.to_string(),
            message: message.to_string(),
            at: Utc::now(),
        });
    }
}
