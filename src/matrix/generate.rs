//! Random matrix generation
//!
//! Integers are drawn uniformly from [-10, 10), floats from [-10.0, 10.0).
//! A seed makes runs reproducible; without one the RNG is seeded from entropy.

use super::{ElementKind, Matrix, MatrixData};
use crate::error::Result;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

const LOW: i64 = -10;
const HIGH: i64 = 10;

/// Seedable generator for test matrices
pub struct MatrixGenerator {
    rng: Xoshiro256PlusPlus,
}

impl MatrixGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        Self { rng }
    }

    pub fn random(&mut self, rows: usize, cols: usize, kind: ElementKind) -> Result<Matrix> {
        let len = rows * cols;
        let data = match kind {
            ElementKind::Int => {
                MatrixData::Int((0..len).map(|_| self.rng.gen_range(LOW..HIGH)).collect())
            }
            ElementKind::Float => MatrixData::Float(
                (0..len)
                    .map(|_| self.rng.gen_range(LOW as f64..HIGH as f64))
                    .collect(),
            ),
        };
        Matrix::new(rows, cols, data)
    }

    /// A (rows_a × cols_a) and B (cols_a × cols_b)
    pub fn pair(
        &mut self,
        rows_a: usize,
        cols_a: usize,
        cols_b: usize,
        kind: ElementKind,
    ) -> Result<(Matrix, Matrix)> {
        let a = self.random(rows_a, cols_a, kind)?;
        let b = self.random(cols_a, cols_b, kind)?;
        Ok((a, b))
    }
}
