//! Matrix multiply kernel
//!
//! `result[i][j] = sum_k a[i][k] * b[k][j]`. Integer × integer uses wrapping
//! i64 arithmetic; any float operand promotes the product to f64.
//!
//! `multiply` parallelises over output rows with rayon and runs on whatever
//! pool it is called from (workers install their own sized pool).
//! `multiply_sequential` is the single-threaded baseline used for serial
//! timing comparisons.

use super::{Matrix, MatrixData};
use crate::error::{Error, Result};
use rayon::prelude::*;

/// Row-parallel product A × B
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    check_dims(a, b)?;
    let (n, m) = (a.cols(), b.cols());
    let rows = a.rows();

    let data = match (a.data(), b.data()) {
        (MatrixData::Int(av), MatrixData::Int(bv)) => {
            let mut out = vec![0i64; rows * m];
            if m > 0 {
                out.par_chunks_mut(m).enumerate().for_each(|(i, row)| {
                    int_row(&av[i * n..(i + 1) * n], bv, m, row);
                });
            }
            MatrixData::Int(out)
        }
        _ => {
            let (av, bv) = (a.to_f64_vec(), b.to_f64_vec());
            let mut out = vec![0f64; rows * m];
            if m > 0 {
                out.par_chunks_mut(m).enumerate().for_each(|(i, row)| {
                    float_row(&av[i * n..(i + 1) * n], &bv, m, row);
                });
            }
            MatrixData::Float(out)
        }
    };

    Matrix::new(rows, m, data)
}

/// Single-threaded product A × B
pub fn multiply_sequential(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    check_dims(a, b)?;
    let (n, m) = (a.cols(), b.cols());
    let rows = a.rows();

    let data = match (a.data(), b.data()) {
        (MatrixData::Int(av), MatrixData::Int(bv)) => {
            let mut out = vec![0i64; rows * m];
            for i in 0..rows {
                int_row(&av[i * n..(i + 1) * n], bv, m, &mut out[i * m..(i + 1) * m]);
            }
            MatrixData::Int(out)
        }
        _ => {
            let (av, bv) = (a.to_f64_vec(), b.to_f64_vec());
            let mut out = vec![0f64; rows * m];
            for i in 0..rows {
                float_row(&av[i * n..(i + 1) * n], &bv, m, &mut out[i * m..(i + 1) * m]);
            }
            MatrixData::Float(out)
        }
    };

    Matrix::new(rows, m, data)
}

fn check_dims(a: &Matrix, b: &Matrix) -> Result<()> {
    if a.cols() != b.rows() {
        return Err(Error::Dimension(format!(
            "cannot multiply {}x{} by {}x{}: inner dimensions {} != {}",
            a.rows(),
            a.cols(),
            b.rows(),
            b.cols(),
            a.cols(),
            b.rows()
        )));
    }
    Ok(())
}

// i-k-j order keeps the inner loop walking contiguous rows of B.
#[inline]
fn int_row(a_row: &[i64], b: &[i64], m: usize, out: &mut [i64]) {
    for (k, &aik) in a_row.iter().enumerate() {
        let b_row = &b[k * m..(k + 1) * m];
        for (o, &bkj) in out.iter_mut().zip(b_row) {
            *o = o.wrapping_add(aik.wrapping_mul(bkj));
        }
    }
}

#[inline]
fn float_row(a_row: &[f64], b: &[f64], m: usize, out: &mut [f64]) {
    for (k, &aik) in a_row.iter().enumerate() {
        let b_row = &b[k * m..(k + 1) * m];
        for (o, &bkj) in out.iter_mut().zip(b_row) {
            *o += aik * bkj;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::ElementKind;

    #[test]
    fn test_multiply_2x2() {
        let a = Matrix::from_int_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        let b = Matrix::from_int_rows(vec![vec![5, 6], vec![7, 8]]).unwrap();
        let expected = Matrix::from_int_rows(vec![vec![19, 22], vec![43, 50]]).unwrap();
        assert_eq!(multiply(&a, &b).unwrap(), expected);
        assert_eq!(multiply_sequential(&a, &b).unwrap(), expected);
    }

    #[test]
    fn test_multiply_non_square() {
        // 2x3 * 3x1
        let a = Matrix::from_int_rows(vec![vec![1, 0, 2], vec![-1, 3, 1]]).unwrap();
        let b = Matrix::from_int_rows(vec![vec![3], vec![2], vec![1]]).unwrap();
        let c = multiply(&a, &b).unwrap();
        assert_eq!(c, Matrix::from_int_rows(vec![vec![5], vec![4]]).unwrap());
    }

    #[test]
    fn test_multiply_dimension_mismatch() {
        let a = Matrix::from_int_rows(vec![vec![1, 2, 3]]).unwrap();
        let b = Matrix::from_int_rows(vec![vec![1, 2]]).unwrap();
        assert!(matches!(multiply(&a, &b), Err(Error::Dimension(_))));
        assert!(matches!(multiply_sequential(&a, &b), Err(Error::Dimension(_))));
    }

    #[test]
    fn test_mixed_kinds_promote_to_float() {
        let a = Matrix::from_int_rows(vec![vec![1, 2]]).unwrap();
        let b = Matrix::from_float_rows(vec![vec![0.5], vec![0.25]]).unwrap();
        let c = multiply(&a, &b).unwrap();
        assert_eq!(c.kind(), ElementKind::Float);
        assert_eq!(c.get_f64(0, 0), Some(1.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rows: Vec<Vec<f64>> = (0..17)
            .map(|i| (0..9).map(|j| (i * 9 + j) as f64 * 0.1 - 3.0).collect())
            .collect();
        let a = Matrix::from_float_rows(rows).unwrap();
        let b_rows: Vec<Vec<f64>> = (0..9)
            .map(|i| (0..5).map(|j| (i as f64 - j as f64) * 0.7).collect())
            .collect();
        let b = Matrix::from_float_rows(b_rows).unwrap();
        assert_eq!(multiply(&a, &b).unwrap(), multiply_sequential(&a, &b).unwrap());
    }
}
