//! Human-readable text output

use crate::error::Error;
use crate::matrix::Matrix;
use crate::stats::{BenchmarkReport, RunReport};

/// Largest matrix printed in full
pub const MAX_DISPLAY_DIM: usize = 10;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Operands and result shown with `show_matrices`
pub struct RunMatrices<'a> {
    pub a: &'a Matrix,
    pub b: &'a Matrix,
    pub c: &'a Matrix,
}

/// Whether a matrix is small enough to print
pub fn displayable(m: &Matrix) -> bool {
    m.rows() <= MAX_DISPLAY_DIM && m.cols() <= MAX_DISPLAY_DIM
}

/// Print a labelled matrix, or just its shape when too large
pub fn print_matrix(label: &str, m: &Matrix) {
    if displayable(m) {
        println!("{} ({}x{}):", label, m.rows(), m.cols());
        println!("{}", m);
    } else {
        println!("{}: {}x{} (too large to display)", label, m.rows(), m.cols());
    }
}

/// Print one serial vs distributed comparison
pub fn print_run(report: &RunReport, matrices: Option<RunMatrices<'_>>) {
    println!("{}", RULE);
    println!("              DISTRIBUTED MULTIPLICATION");
    println!("{}", RULE);
    println!();
    println!(
        "Matrices: A {}x{} × B {}x{} ({})",
        report.rows_a, report.cols_a, report.cols_a, report.cols_b, report.element
    );
    println!("Workers:  {} ({} policy)", report.workers, report.policy);
    if !report.skipped.is_empty() {
        println!("Skipped:  {} (unreachable at probe time)", report.skipped.join(", "));
    }
    println!();

    if let Some(m) = matrices {
        print_matrix("Matrix A", m.a);
        print_matrix("Matrix B", m.b);
        print_matrix("Matrix C", m.c);
        println!();
    }

    println!("Timing:");
    println!("  Serial:      {:.3}ms", report.serial_ms);
    println!("  Distributed: {:.3}ms", report.distributed_ms);
    if report.distributed_faster() {
        println!("  Speedup:     {:.2}x", report.speedup);
    } else if report.speedup > 0.0 {
        println!("  Slowdown:    {:.2}x", report.slowdown());
    }
    println!();

    println!("Verification: {}", if report.verified { "PASSED" } else { "FAILED" });
    println!("  {}", report.verification);

    if report.partial {
        println!();
        println!("WARNING: partial result, rows of A are missing from C");
        for f in &report.failures {
            println!("  partition {} on {}: {}", f.partition, f.endpoint, f.error);
        }
    }
    println!("{}", RULE);
}

/// Print the reason a multiplication produced no result
pub fn print_failure(err: &Error) {
    println!("{}", RULE);
    println!("              MULTIPLICATION FAILED");
    println!("{}", RULE);
    match err {
        Error::IncompleteResult {
            expected,
            received,
            failures,
        } => {
            println!("Received {} of {} partial results; no result returned.", received, expected);
            println!();
            println!("Failed endpoints:");
            for f in failures {
                println!("  partition {} on {}: {}", f.index, f.endpoint, f.error);
            }
        }
        other => println!("{}", other),
    }
    println!("{}", RULE);
}

/// Print the benchmark table and summary
pub fn print_benchmark(report: &BenchmarkReport) {
    println!("{}", RULE);
    println!("            BENCHMARK: SERIAL VS DISTRIBUTED");
    println!("{}", RULE);
    println!(
        "Workers: {}   Repetitions: {}   Elements: {}",
        report.workers, report.repetitions, report.element
    );
    println!();
    println!(
        "{:>6}  {:>20}  {:>20}  {:>8}  {:>8}  {:>7}",
        "Size", "Serial (ms)", "Distributed (ms)", "Speedup", "Effic.", "Winner"
    );
    for r in &report.results {
        let winner = if r.speedup > 1.0 { "Dist." } else { "Serial" };
        println!(
            "{:>6}  {:>20}  {:>20}  {:>7.2}x  {:>7.1}%  {:>7}",
            r.size,
            format!("{:.3} ±{:.3}", r.serial.mean_ms, r.serial.std_ms),
            format!("{:.3} ±{:.3}", r.distributed.mean_ms, r.distributed.std_ms),
            r.speedup,
            r.efficiency_pct,
            winner
        );
        if r.rejected > 0 {
            println!("        ({} distributed sample(s) discarded)", r.rejected);
        }
    }
    println!();

    match report.break_even {
        Some(size) => println!("Break-even: distributed is faster from {}x{} matrices", size, size),
        None => println!("Break-even: distributed was not faster at any tested size"),
    }
    if let Some(best) = report.best {
        println!("Best speedup: {:.2}x ({}x{} matrices)", best.speedup, best.size, best.size);
    }
    println!("Mean efficiency: {:.1}%", report.mean_efficiency_pct);
    println!("{}", RULE);
}
