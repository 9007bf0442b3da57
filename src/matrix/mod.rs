//! Dense matrix type
//!
//! A `Matrix` is an immutable row-major R×K array holding either integer or
//! floating-point elements. Integer products stay integer; any mix with a
//! float operand is promoted to float.
//!
//! # Modules
//!
//! - `kernel`: the multiply primitive (row-parallel and sequential)
//! - `partition`: row-contiguous split of A across workers
//! - `verify`: tolerance-based comparison against a reference product
//! - `generate`: seeded random matrices

pub mod generate;
pub mod kernel;
pub mod partition;
pub mod verify;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatrixData {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl MatrixData {
    fn len(&self) -> usize {
        match self {
            MatrixData::Int(v) => v.len(),
            MatrixData::Float(v) => v.len(),
        }
    }
}

/// Element kind of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    #[default]
    Int,
    Float,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Int => write!(f, "int"),
            ElementKind::Float => write!(f, "float"),
        }
    }
}

/// Dense row-major matrix
///
/// Invariant: `data.len() == rows * cols`. Decoding from the wire re-checks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRepr")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: MatrixData,
}

/// Unchecked wire representation, field order identical to `Matrix`
#[derive(Deserialize)]
struct MatrixRepr {
    rows: usize,
    cols: usize,
    data: MatrixData,
}

impl TryFrom<MatrixRepr> for Matrix {
    type Error = Error;

    fn try_from(repr: MatrixRepr) -> Result<Self> {
        Matrix::new(repr.rows, repr.cols, repr.data)
    }
}

impl Matrix {
    /// Create a matrix from flat row-major storage
    pub fn new(rows: usize, cols: usize, data: MatrixData) -> Result<Self> {
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| Error::Shape(format!("{}x{} overflows usize", rows, cols)))?;
        if data.len() != expected {
            return Err(Error::Shape(format!(
                "{}x{} matrix needs {} elements, got {}",
                rows,
                cols,
                expected,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create an integer matrix from rows, rejecting ragged input
    pub fn from_int_rows(rows: Vec<Vec<i64>>) -> Result<Self> {
        let (r, c) = check_rows(&rows)?;
        Self::new(r, c, MatrixData::Int(rows.into_iter().flatten().collect()))
    }

    /// Create a float matrix from rows, rejecting ragged input
    pub fn from_float_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let (r, c) = check_rows(&rows)?;
        Self::new(r, c, MatrixData::Float(rows.into_iter().flatten().collect()))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn kind(&self) -> ElementKind {
        match self.data {
            MatrixData::Int(_) => ElementKind::Int,
            MatrixData::Float(_) => ElementKind::Float,
        }
    }

    pub fn data(&self) -> &MatrixData {
        &self.data
    }

    /// Element at (row, col) widened to f64
    pub fn get_f64(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let idx = row * self.cols + col;
        Some(match &self.data {
            MatrixData::Int(v) => v[idx] as f64,
            MatrixData::Float(v) => v[idx],
        })
    }

    /// All elements widened to f64, row-major
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            MatrixData::Int(v) => v.iter().map(|&x| x as f64).collect(),
            MatrixData::Float(v) => v.clone(),
        }
    }

    /// Copy of rows `[start, end)`
    pub fn slice_rows(&self, start: usize, end: usize) -> Result<Matrix> {
        if start > end || end > self.rows {
            return Err(Error::Dimension(format!(
                "row range {}..{} out of bounds for {} rows",
                start, end, self.rows
            )));
        }
        let (lo, hi) = (start * self.cols, end * self.cols);
        let data = match &self.data {
            MatrixData::Int(v) => MatrixData::Int(v[lo..hi].to_vec()),
            MatrixData::Float(v) => MatrixData::Float(v[lo..hi].to_vec()),
        };
        Matrix::new(end - start, self.cols, data)
    }

    /// Vertically concatenate matrices in the given order
    ///
    /// All parts must share a column count. Integer parts stay integer unless
    /// a float part is present.
    pub fn vstack(parts: &[Matrix]) -> Result<Matrix> {
        let first = parts
            .first()
            .ok_or_else(|| Error::Dimension("cannot stack zero matrices".to_string()))?;
        let cols = first.cols;
        if let Some(bad) = parts.iter().find(|p| p.cols != cols) {
            return Err(Error::Dimension(format!(
                "cannot stack a {}-column matrix under {} columns",
                bad.cols, cols
            )));
        }

        let rows = parts.iter().map(|p| p.rows).sum();
        let all_int = parts.iter().all(|p| p.kind() == ElementKind::Int);
        let data = if all_int {
            let mut out = Vec::with_capacity(rows * cols);
            for part in parts {
                if let MatrixData::Int(v) = &part.data {
                    out.extend_from_slice(v);
                }
            }
            MatrixData::Int(out)
        } else {
            let mut out = Vec::with_capacity(rows * cols);
            for part in parts {
                out.extend(part.to_f64_vec());
            }
            MatrixData::Float(out)
        };
        Matrix::new(rows, cols, data)
    }
}

fn check_rows<T>(rows: &[Vec<T>]) -> Result<(usize, usize)> {
    let cols = rows.first().map(|r| r.len()).unwrap_or(0);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != cols {
            return Err(Error::Shape(format!(
                "row {} has {} elements, expected {}",
                i,
                row.len(),
                cols
            )));
        }
    }
    Ok((rows.len(), cols))
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            write!(f, "[")?;
            for col in 0..self.cols {
                if col > 0 {
                    write!(f, " ")?;
                }
                let idx = row * self.cols + col;
                match &self.data {
                    MatrixData::Int(v) => write!(f, "{:>5}", v[idx])?,
                    MatrixData::Float(v) => write!(f, "{:>9.3}", v[idx])?,
                }
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
