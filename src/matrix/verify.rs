//! Result verification
//!
//! Recomputes A × B locally and compares it with a distributed result using
//! an absolute/relative tolerance, since summation order can differ between
//! the two paths.

use super::{kernel, Matrix};
use std::fmt;

/// Tolerance for element comparison: `|actual - expected| <= atol + rtol * |expected|`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

impl Tolerance {
    #[inline]
    pub fn accepts(&self, expected: f64, actual: f64) -> bool {
        (actual - expected).abs() <= self.atol + self.rtol * expected.abs()
    }
}

/// Comparison outcome
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    /// Every element within tolerance
    Success,
    /// Shapes differ
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// First element outside tolerance, in row-major order
    Mismatch {
        row: usize,
        col: usize,
        expected: f64,
        actual: f64,
    },
    /// Reference product could not be computed (A and B incompatible)
    ReferenceUnavailable(String),
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationResult::Success)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Success => write!(f, "matches local product"),
            VerificationResult::ShapeMismatch { expected, actual } => write!(
                f,
                "shape {}x{} does not match expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            VerificationResult::Mismatch {
                row,
                col,
                expected,
                actual,
            } => write!(
                f,
                "element ({}, {}) is {} but expected {}",
                row, col, actual, expected
            ),
            VerificationResult::ReferenceUnavailable(e) => write!(f, "no reference product: {}", e),
        }
    }
}

/// Compare two matrices element-wise within `tolerance`
pub fn compare(expected: &Matrix, actual: &Matrix, tolerance: Tolerance) -> VerificationResult {
    if expected.shape() != actual.shape() {
        return VerificationResult::ShapeMismatch {
            expected: expected.shape(),
            actual: actual.shape(),
        };
    }

    let cols = expected.cols();
    let (ev, av) = (expected.to_f64_vec(), actual.to_f64_vec());
    for (idx, (&e, &a)) in ev.iter().zip(av.iter()).enumerate() {
        if !tolerance.accepts(e, a) {
            return VerificationResult::Mismatch {
                row: idx / cols,
                col: idx % cols,
                expected: e,
                actual: a,
            };
        }
    }
    VerificationResult::Success
}

/// Check `c` against a locally computed A × B with a custom tolerance
pub fn verify_with(a: &Matrix, b: &Matrix, c: &Matrix, tolerance: Tolerance) -> VerificationResult {
    match kernel::multiply(a, b) {
        Ok(reference) => compare(&reference, c, tolerance),
        Err(e) => VerificationResult::ReferenceUnavailable(e.to_string()),
    }
}

/// Whether `c` equals A × B within the default tolerance
///
/// Returns false on any shape problem instead of raising.
pub fn verify(a: &Matrix, b: &Matrix, c: &Matrix) -> bool {
    verify_with(a, b, c, Tolerance::default()).is_success()
}
