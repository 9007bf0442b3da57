//! Coordinator ↔ worker over loopback TCP

use matmesh::distributed::protocol::{self, DEFAULT_MAX_FRAME_BYTES};
use matmesh::distributed::{
    AggregationPolicy, ChannelSink, Coordinator, CoordinatorOptions, Endpoint, LocalWorkers, NullSink,
    SharedSink, WorkerOptions,
};
use matmesh::matrix::generate::MatrixGenerator;
use matmesh::matrix::{kernel, verify, ElementKind, Matrix};
use matmesh::stats::{self, BenchmarkSettings};
use matmesh::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

fn worker_options() -> WorkerOptions {
    WorkerOptions {
        compute_threads: 2,
        io_timeout: Duration::from_secs(10),
        ..WorkerOptions::default()
    }
}

fn coordinator_options(policy: AggregationPolicy) -> CoordinatorOptions {
    CoordinatorOptions {
        connect_timeout: Duration::from_secs(1),
        io_timeout: Duration::from_secs(10),
        policy,
        ..CoordinatorOptions::default()
    }
}

fn null_sink() -> SharedSink {
    Arc::new(NullSink)
}

async fn local(count: usize) -> LocalWorkers {
    LocalWorkers::spawn(count, worker_options(), null_sink()).await.unwrap()
}

fn coordinator(endpoints: Vec<Endpoint>, policy: AggregationPolicy) -> Coordinator {
    Coordinator::new(endpoints, coordinator_options(policy), null_sink())
}

async fn refused_endpoint() -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Endpoint::new("127.0.0.1", port)
}

#[tokio::test]
async fn two_workers_two_by_two() {
    let workers = local(2).await;
    let coordinator = coordinator(workers.endpoints().to_vec(), AggregationPolicy::Strict);

    let a = Matrix::from_int_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
    let b = Matrix::from_int_rows(vec![vec![5, 6], vec![7, 8]]).unwrap();
    let outcome = coordinator.multiply_distributed(&a, &b).await.unwrap();

    assert_eq!(
        outcome.result,
        Matrix::from_int_rows(vec![vec![19, 22], vec![43, 50]]).unwrap()
    );
    assert_eq!(outcome.partitions, 2);
    assert!(!outcome.partial);
    assert!(outcome.failures.is_empty());
    assert!(verify::verify(&a, &b, &outcome.result));

    workers.shutdown().await.unwrap();
}

#[tokio::test]
async fn uneven_rows_match_reference_for_any_worker_count() {
    let mut gen = MatrixGenerator::new(Some(11));
    let (a, b) = gen.pair(5, 3, 4, ElementKind::Int).unwrap();
    let reference = kernel::multiply_sequential(&a, &b).unwrap();

    // N = 1 (serial equivalent), N = 2 (remainder on last), N = R (one row each)
    for n in [1, 2, 5] {
        let workers = local(n).await;
        let coordinator = coordinator(workers.endpoints().to_vec(), AggregationPolicy::Strict);
        let outcome = coordinator.multiply_distributed(&a, &b).await.unwrap();
        assert_eq!(outcome.result, reference, "worker count {}", n);
        workers.shutdown().await.unwrap();
    }
}

#[tokio::test]
async fn float_product_within_tolerance() {
    let mut gen = MatrixGenerator::new(Some(3));
    let (a, b) = gen.pair(17, 9, 6, ElementKind::Float).unwrap();

    let workers = local(3).await;
    let coordinator = coordinator(workers.endpoints().to_vec(), AggregationPolicy::Strict);
    let outcome = coordinator.multiply_distributed(&a, &b).await.unwrap();

    assert_eq!(outcome.result.shape(), (17, 6));
    assert!(verify::verify(&a, &b, &outcome.result));
    workers.shutdown().await.unwrap();
}

#[tokio::test]
async fn repeated_runs_agree() {
    let mut gen = MatrixGenerator::new(Some(5));
    let (a, b) = gen.pair(8, 8, 8, ElementKind::Float).unwrap();

    let workers = local(4).await;
    let coordinator = coordinator(workers.endpoints().to_vec(), AggregationPolicy::Strict);
    let first = coordinator.multiply_distributed(&a, &b).await.unwrap();
    let second = coordinator.multiply_distributed(&a, &b).await.unwrap();

    let check = verify::compare(&first.result, &second.result, verify::Tolerance::default());
    assert!(check.is_success(), "{}", check);
    workers.shutdown().await.unwrap();
}

#[tokio::test]
async fn strict_policy_with_unreachable_endpoint() {
    let workers = local(1).await;
    let dead = refused_endpoint().await;
    let mut endpoints = workers.endpoints().to_vec();
    endpoints.push(dead.clone());
    let coordinator = coordinator(endpoints, AggregationPolicy::Strict);

    let a = Matrix::from_int_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
    let b = Matrix::from_int_rows(vec![vec![5, 6], vec![7, 8]]).unwrap();

    match coordinator.multiply_distributed(&a, &b).await {
        Err(Error::IncompleteResult {
            expected,
            received,
            failures,
        }) => {
            assert_eq!(expected, 2);
            assert_eq!(received, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 1);
            assert_eq!(failures[0].endpoint, dead);
            assert!(matches!(failures[0].error, Error::Transport(_)));
        }
        other => panic!("expected IncompleteResult, got {:?}", other),
    }

    workers.shutdown().await.unwrap();
}

#[tokio::test]
async fn best_effort_returns_flagged_partial_result() {
    let workers = local(2).await;
    let dead = refused_endpoint().await;
    let mut endpoints = workers.endpoints().to_vec();
    endpoints.insert(1, dead);
    let coordinator = coordinator(endpoints, AggregationPolicy::BestEffort);

    let a = Matrix::from_int_rows(vec![vec![1], vec![2], vec![3]]).unwrap();
    let b = Matrix::from_int_rows(vec![vec![10]]).unwrap();
    let outcome = coordinator.multiply_distributed(&a, &b).await.unwrap();

    assert!(outcome.partial);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    // Partition 1 (row 2) is missing; order of the rest is kept
    assert_eq!(outcome.result, Matrix::from_int_rows(vec![vec![10], vec![30]]).unwrap());
    assert!(!verify::verify(&a, &b, &outcome.result));

    workers.shutdown().await.unwrap();
}

#[tokio::test]
async fn truncated_result_frame_is_a_framing_failure() {
    // Reads the task, promises 100 payload bytes, delivers 10, then closes
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let truncating = Endpoint::new("127.0.0.1", listener.local_addr().unwrap().port());
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = protocol::read_frame(&mut stream, DEFAULT_MAX_FRAME_BYTES).await;
        stream.write_all(&100u64.to_be_bytes()).await.unwrap();
        stream.write_all(&[0u8; 10]).await.unwrap();
        stream.shutdown().await.unwrap();
    });

    let workers = local(1).await;
    let endpoints = vec![workers.endpoints()[0].clone(), truncating];
    let coordinator = coordinator(endpoints, AggregationPolicy::Strict);

    let a = Matrix::from_int_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
    let b = Matrix::from_int_rows(vec![vec![5, 6], vec![7, 8]]).unwrap();

    match coordinator.multiply_distributed(&a, &b).await {
        Err(Error::IncompleteResult { failures, .. }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 1);
            assert!(matches!(failures[0].error, Error::Framing(_)), "{}", failures[0].error);
        }
        other => panic!("expected IncompleteResult, got {:?}", other),
    }

    workers.shutdown().await.unwrap();
}

#[tokio::test]
async fn dimension_error_comes_back_from_worker() {
    let workers = local(1).await;
    let coordinator = coordinator(workers.endpoints().to_vec(), AggregationPolicy::Strict);

    let a = Matrix::from_int_rows(vec![vec![1, 2, 3]]).unwrap();
    let b = Matrix::from_int_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();

    match coordinator.multiply_distributed(&a, &b).await {
        Err(Error::IncompleteResult { failures, .. }) => {
            assert!(matches!(failures[0].error, Error::Dimension(_)), "{}", failures[0].error);
        }
        other => panic!("expected IncompleteResult, got {:?}", other),
    }

    // The worker keeps serving after a failed task
    let a = Matrix::from_int_rows(vec![vec![1, 2]]).unwrap();
    assert!(coordinator.multiply_distributed(&a, &b).await.is_ok());

    workers.shutdown().await.unwrap();
}

#[tokio::test]
async fn sinks_receive_coordinator_and_worker_records() {
    let (sink, mut events) = ChannelSink::new();
    let sink: SharedSink = Arc::new(sink);
    let workers = LocalWorkers::spawn(2, worker_options(), sink.clone()).await.unwrap();
    let coordinator = Coordinator::new(
        workers.endpoints().to_vec(),
        coordinator_options(AggregationPolicy::Strict),
        sink,
    );

    let a = Matrix::from_int_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
    coordinator.multiply_distributed(&a, &a).await.unwrap();
    workers.shutdown().await.unwrap();

    let mut sources = Vec::new();
    while let Ok(event) = events.try_recv() {
        sources.push(event.source_id);
    }
    assert!(sources.iter().any(|s| s == "COORDINATOR"));
    assert!(sources.iter().any(|s| s.ends_with(&format!(":{}", coordinator.endpoints()[0].port))));
}

#[tokio::test]
async fn comparison_report_verifies() {
    let workers = local(2).await;
    let coordinator = coordinator(workers.endpoints().to_vec(), AggregationPolicy::Strict);
    let (a, b) = MatrixGenerator::new(Some(9)).pair(6, 4, 5, ElementKind::Int).unwrap();

    let run = stats::run_comparison(&coordinator, &a, &b).await.unwrap();
    assert!(run.report.verified);
    assert!(!run.report.partial);
    assert_eq!(run.report.workers, 2);
    assert_eq!(run.serial, run.distributed);

    workers.shutdown().await.unwrap();
}

#[tokio::test]
async fn benchmark_over_local_workers() {
    let workers = local(2).await;
    let coordinator = coordinator(workers.endpoints().to_vec(), AggregationPolicy::Strict);
    let settings = BenchmarkSettings {
        sizes: vec![2, 8],
        repetitions: 2,
        element: ElementKind::Float,
        seed: Some(1),
    };

    let report = stats::run_benchmark(&coordinator, &settings, &null_sink()).await.unwrap();
    assert_eq!(report.workers, 2);
    assert_eq!(report.results.len(), 2);
    for r in &report.results {
        assert_eq!(r.rejected, 0);
        assert_eq!(r.serial.samples, 2);
        assert_eq!(r.distributed.samples, 2);
    }
    assert!(report.best.is_some());

    workers.shutdown().await.unwrap();
}
