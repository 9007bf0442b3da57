//! Worker service
//!
//! A worker is a long-lived listener that serves exactly one task per
//! accepted connection:
//!
//! ```text
//! LISTENING → accept → READING_TASK → COMPUTING → WRITING_RESULT → close → LISTENING
//! ```
//!
//! Each accepted connection runs in its own task, so a slow client never
//! blocks the accept loop. The product is computed row-parallel on a rayon
//! pool owned by the worker. Failures on one connection are answered with an
//! error frame where the stream still allows it, reported to the event sink,
//! and never stop the listener.
//!
//! Binding to port 0 is supported: the assigned port is announced exactly
//! once through a oneshot channel handed over by the supervisor.

use crate::distributed::endpoint::Endpoint;
use crate::distributed::events::SharedSink;
use crate::distributed::protocol::{
    self, ErrorKind, ErrorMessage, Message, ResultMessage, TaskMessage, DEFAULT_MAX_FRAME_BYTES,
    PROTOCOL_VERSION,
};
use crate::error::{Error, Result};
use crate::matrix::kernel;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Listener and compute settings for one worker
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Interface to bind
    pub host: String,

    /// Port to bind (0 = ephemeral)
    pub port: u16,

    /// Size of the rayon compute pool
    pub compute_threads: usize,

    /// Bound on reading the task and writing the result
    pub io_timeout: Duration,

    pub max_frame_bytes: u64,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            compute_threads: num_cpus::get(),
            io_timeout: Duration::from_secs(30),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Worker service
///
/// Created bound; `run` or `run_until` start accepting.
pub struct WorkerService {
    listener: TcpListener,
    port: u16,
    ctx: Arc<ConnectionContext>,
}

/// State shared by every connection handler
struct ConnectionContext {
    worker_id: String,
    io_timeout: Duration,
    max_frame_bytes: u64,
    pool: Arc<rayon::ThreadPool>,
    sink: SharedSink,
}

impl WorkerService {
    /// Bind the listener and build the compute pool
    pub async fn bind(options: WorkerOptions, sink: SharedSink) -> Result<Self> {
        let listener = TcpListener::bind((options.host.as_str(), options.port))
            .await
            .map_err(|e| {
                Error::Setup(format!(
                    "failed to bind {}:{}: {}",
                    options.host, options.port, e
                ))
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| Error::Setup(format!("failed to read bound address: {}", e)))?
            .port();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.compute_threads)
            .thread_name(move |i| format!("worker-{}-compute-{}", port, i))
            .build()
            .map_err(|e| Error::Setup(format!("failed to build compute pool: {}", e)))?;

        let worker_id = format!("{}:{}", get_worker_host(), port);

        Ok(Self {
            listener,
            port,
            ctx: Arc::new(ConnectionContext {
                worker_id,
                io_timeout: options.io_timeout,
                max_frame_bytes: options.max_frame_bytes,
                pool: Arc::new(pool),
                sink,
            }),
        })
    }

    /// Port actually bound (the assigned one when bound to port 0)
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Identifier used in error frames and event records
    pub fn worker_id(&self) -> &str {
        &self.ctx.worker_id
    }

    /// Report the bound port to the supervisor
    ///
    /// Consumes the sender, so a worker can announce only once.
    pub fn announce(&self, tx: oneshot::Sender<u16>) {
        if tx.send(self.port).is_err() {
            tracing::warn!(port = self.port, "supervisor dropped port announcement channel");
        }
    }

    /// Accept connections until the process exits
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` completes
    ///
    /// In-flight connections keep running after shutdown; only accepting stops.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let ctx = self.ctx;
        ctx.sink
            .record(&ctx.worker_id, &format!("listening on port {}", self.port));

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    ctx.sink.record(&ctx.worker_id, "shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            serve_connection(stream, peer, ctx).await;
                        });
                    }
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning
                        tracing::warn!(error = %e, "accept failed");
                        ctx.sink.record(&ctx.worker_id, &format!("accept failed: {}", e));
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Serve one connection and log its outcome
async fn serve_connection(mut stream: TcpStream, peer: SocketAddr, ctx: Arc<ConnectionContext>) {
    match handle_task(&mut stream, &ctx).await {
        Ok(index) => {
            ctx.sink.record(
                &ctx.worker_id,
                &format!("sent result for partition {} to {}", index, peer),
            );
        }
        Err(Error::Closed) => {
            // Liveness probes connect and close without sending anything
            tracing::debug!(%peer, "connection closed without a task");
        }
        Err(e) => {
            tracing::warn!(%peer, error = %e, "task failed");
            ctx.sink
                .record(&ctx.worker_id, &format!("task from {} failed: {}", peer, e));
        }
    }
    let _ = stream.shutdown().await;
}

/// Read one task, compute it, write the result
///
/// Returns the partition index served.
async fn handle_task(stream: &mut TcpStream, ctx: &ConnectionContext) -> Result<usize> {
    let payload = match with_timeout(
        ctx.io_timeout,
        "reading task",
        protocol::read_frame(stream, ctx.max_frame_bytes),
    )
    .await
    {
        Ok(payload) => payload,
        Err(e @ Error::FrameTooLarge { .. }) => {
            reply_error(stream, ctx, ErrorKind::Protocol, &e).await;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let task = match protocol::decode(&payload) {
        Ok(Message::Task(task)) => task,
        Ok(other) => {
            let e = Error::Protocol(format!("expected TASK, got {}", other.kind()));
            reply_error(stream, ctx, ErrorKind::Protocol, &e).await;
            return Err(e);
        }
        Err(e) => {
            reply_error(stream, ctx, ErrorKind::Decode, &e).await;
            return Err(e);
        }
    };

    if task.protocol_version != PROTOCOL_VERSION {
        let e = Error::Protocol(format!(
            "protocol version mismatch: coordinator={}, worker={}",
            task.protocol_version, PROTOCOL_VERSION
        ));
        reply_error(stream, ctx, ErrorKind::Protocol, &e).await;
        return Err(e);
    }

    let index = task.partition_index;
    ctx.sink.record(
        &ctx.worker_id,
        &format!(
            "received partition {} ({}x{} by {}x{})",
            index,
            task.submatrix.rows(),
            task.submatrix.cols(),
            task.matrix_b.rows(),
            task.matrix_b.cols()
        ),
    );

    let product = match compute(task, &ctx.pool).await {
        Ok(product) => product,
        Err(e) => {
            let kind = match e {
                Error::Dimension(_) => ErrorKind::Dimension,
                _ => ErrorKind::Protocol,
            };
            reply_error(stream, ctx, kind, &e).await;
            return Err(e);
        }
    };

    let reply = Message::Result(ResultMessage {
        partition_index: index,
        matrix: product,
    });
    with_timeout(
        ctx.io_timeout,
        "writing result",
        protocol::write_message(stream, &reply),
    )
    .await?;

    Ok(index)
}

/// Multiply on the compute pool without blocking the runtime
async fn compute(task: TaskMessage, pool: &Arc<rayon::ThreadPool>) -> Result<crate::matrix::Matrix> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        pool.install(|| kernel::multiply(&task.submatrix, &task.matrix_b))
    })
    .await
    .map_err(|e| Error::Protocol(format!("compute task aborted: {}", e)))?
}

/// Best-effort error frame; the connection is closed right after either way
async fn reply_error(stream: &mut TcpStream, ctx: &ConnectionContext, kind: ErrorKind, err: &Error) {
    let msg = Message::Error(ErrorMessage {
        worker_id: ctx.worker_id.clone(),
        kind,
        message: err.to_string(),
    });
    if let Err(e) = with_timeout(ctx.io_timeout, "writing error", protocol::write_message(stream, &msg)).await {
        tracing::debug!(error = %e, "could not deliver error frame");
    }
}

async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Transport(format!("timed out {} after {:?}", what, limit)))?
}

/// Get worker host identifier
fn get_worker_host() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Workers running in-process on ephemeral ports
///
/// Used by standalone and benchmark modes in place of separate worker processes.
pub struct LocalWorkers {
    endpoints: Vec<Endpoint>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<Result<()>>>,
}

impl LocalWorkers {
    /// Start `count` workers on 127.0.0.1 and wait for every port announcement
    pub async fn spawn(count: usize, options: WorkerOptions, sink: SharedSink) -> Result<Self> {
        if count == 0 {
            return Err(Error::NoEndpoints);
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::with_capacity(count);
        let mut announcements = Vec::with_capacity(count);

        for _ in 0..count {
            let (tx, rx) = oneshot::channel();
            let options = WorkerOptions {
                host: "127.0.0.1".to_string(),
                port: 0,
                ..options.clone()
            };
            let sink = sink.clone();
            let mut stop = shutdown_rx.clone();
            handles.push(tokio::spawn(async move {
                let service = WorkerService::bind(options, sink).await?;
                service.announce(tx);
                service
                    .run_until(async move {
                        while !*stop.borrow() {
                            if stop.changed().await.is_err() {
                                break;
                            }
                        }
                    })
                    .await
            }));
            announcements.push(rx);
        }

        let mut endpoints = Vec::with_capacity(count);
        for (i, rx) in announcements.into_iter().enumerate() {
            match rx.await {
                Ok(port) => endpoints.push(Endpoint::new("127.0.0.1", port)),
                Err(_) => {
                    // Worker exited before announcing; surface its bind error
                    let _ = shutdown.send(true);
                    let handle = handles.swap_remove(i);
                    return Err(match handle.await {
                        Ok(Err(e)) => e,
                        _ => Error::Setup(format!("local worker {} exited before announcing its port", i)),
                    });
                }
            }
        }

        Ok(Self {
            endpoints,
            shutdown,
            handles,
        })
    }

    /// Endpoints in spawn order
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Stop accepting and wait for every listener to exit
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            handle
                .await
                .map_err(|e| Error::Setup(format!("local worker panicked: {}", e)))??;
        }
        Ok(())
    }
}
