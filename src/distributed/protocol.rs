//! Worker protocol
//!
//! This module defines the messages exchanged between the coordinator and a
//! worker, and the framing used to carry them over a TCP stream. Payloads are
//! serialized with MessagePack (rmp-serde), which round-trips i64 and f64
//! elements exactly and keeps matrix shapes.
//!
//! # Protocol Version
//!
//! Current version: 1
//!
//! # Message Flow
//!
//! One connection carries exactly one exchange:
//!
//! ```text
//! Coordinator                     Worker
//!     |                              |
//!     |-------- TASK --------------->|
//!     |                              |  compute submatrix × B
//!     |<------- RESULT / ERROR ------|
//!     |                              |
//!   (close)                       (close)
//! ```
//!
//! # Message Framing
//!
//! Each message is prefixed with an 8-byte length field (big-endian u64):
//!
//! ```text
//! [8 bytes: payload length][N bytes: MessagePack message]
//! ```
//!
//! There is no unframed fallback: a stream that closes before the declared
//! length is delivered is a framing error, never a short payload.

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Coordinator and workers must agree on it.
pub const PROTOCOL_VERSION: u32 = 1;

/// Length of the frame header in bytes
pub const HEADER_LEN: usize = 8;

/// Default upper bound on a single frame payload (512 MiB)
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 512 * 1024 * 1024;

/// Protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Task message (Coordinator → Worker)
    ///
    /// One row partition of A plus the full B.
    Task(TaskMessage),

    /// Result message (Worker → Coordinator)
    ///
    /// The partial product for the partition that was sent.
    Result(ResultMessage),

    /// Error message (Worker → Coordinator)
    ///
    /// Sent instead of a result when the task cannot be served.
    Error(ErrorMessage),
}

impl Message {
    /// Short name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Task(_) => "TASK",
            Message::Result(_) => "RESULT",
            Message::Error(_) => "ERROR",
        }
    }
}

/// Task message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Protocol version (must match)
    pub protocol_version: u32,

    /// Partition index, echoed back in the result
    pub partition_index: usize,

    /// Row slice of A
    pub submatrix: Matrix,

    /// Full right-hand matrix
    pub matrix_b: Matrix,
}

/// Result message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub partition_index: usize,

    /// submatrix × B
    pub matrix: Matrix,
}

/// Failure category reported by a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Task payload did not decode
    Decode,
    /// Submatrix columns != B rows
    Dimension,
    /// Wrong message kind or protocol version
    Protocol,
}

/// Error message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Worker identifier
    pub worker_id: String,

    pub kind: ErrorKind,

    /// Error description
    pub message: String,
}

impl ErrorMessage {
    /// Convert a worker-reported failure into a local error
    pub fn into_error(self) -> Error {
        match self.kind {
            ErrorKind::Dimension => Error::Dimension(format!("{} (reported by {})", self.message, self.worker_id)),
            ErrorKind::Decode | ErrorKind::Protocol => Error::Remote {
                worker: self.worker_id,
                message: self.message,
            },
        }
    }
}

/// Serialize a message payload (no header)
pub fn encode(msg: &Message) -> Result<Vec<u8>> {
    rmp_serde::to_vec(msg).map_err(|e| Error::Encode(e.to_string()))
}

/// Deserialize a message payload (no header)
pub fn decode(payload: &[u8]) -> Result<Message> {
    rmp_serde::from_slice(payload).map_err(|e| Error::Decode(e.to_string()))
}

/// Prepend the 8-byte big-endian length header
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(HEADER_LEN + payload.len());
    framed.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    framed.extend_from_slice(payload);
    framed
}

/// Encode and frame a message
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    Ok(frame(&encode(msg)?))
}

/// Read exactly one frame payload from a stream
///
/// Loops on partial reads until the header and then the declared payload are
/// complete. Closing before the first header byte is `Error::Closed`; closing
/// anywhere later is `Error::Framing`.
pub async fn read_frame<R>(reader: &mut R, max_frame_bytes: u64) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let got = read_full(reader, &mut header).await?;
    if got == 0 {
        return Err(Error::Closed);
    }
    if got < HEADER_LEN {
        return Err(Error::Framing(format!(
            "connection closed after {} of {} header bytes",
            got, HEADER_LEN
        )));
    }

    let declared = u64::from_be_bytes(header);
    if declared > max_frame_bytes {
        return Err(Error::FrameTooLarge {
            declared,
            max: max_frame_bytes,
        });
    }
    let len = usize::try_from(declared).map_err(|_| Error::FrameTooLarge {
        declared,
        max: max_frame_bytes,
    })?;

    let mut payload = vec![0u8; len];
    let got = read_full(reader, &mut payload).await?;
    if got < len {
        return Err(Error::Framing(format!(
            "connection closed after {} of {} payload bytes",
            got, len
        )));
    }

    tracing::trace!(bytes = len, "read frame");
    Ok(payload)
}

/// Write one framed payload and flush
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_framed(writer, &frame(payload)).await
}

/// Read and decode one message
pub async fn read_message<R>(reader: &mut R, max_frame_bytes: u64) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let payload = read_frame(reader, max_frame_bytes).await?;
    decode(&payload)
}

/// Encode and write one message
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;
    write_framed(writer, &framed).await
}

async fn write_framed<W>(writer: &mut W, framed: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(framed)
        .await
        .map_err(|e| Error::Transport(format!("failed to write frame: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| Error::Transport(format!("failed to flush stream: {}", e)))?;

    tracing::trace!(bytes = framed.len(), "wrote frame");
    Ok(())
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(|e| Error::Transport(format!("read failed after {} bytes: {}", filled, e)))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
