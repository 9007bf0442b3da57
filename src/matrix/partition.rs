//! Row partitioning of A across workers
//!
//! `split(A, N)` yields exactly N contiguous, non-overlapping partitions in
//! row order. Every partition but the last gets `floor(R / N)` rows; the last
//! absorbs the remainder. Same scheme as the per-node file ranges handed out
//! by the coordinator: last node gets remainder.

use super::Matrix;
use crate::error::{Error, Result};
use std::ops::Range;

/// A contiguous row slice of A assigned to one worker
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Position in partition order (also the stacking order)
    pub index: usize,
    /// First row of A covered by this partition
    pub row_start: usize,
    pub matrix: Matrix,
}

impl Partition {
    /// Rows of A covered by this partition
    pub fn row_range(&self) -> Range<usize> {
        self.row_start..self.row_start + self.matrix.rows()
    }
}

/// Row ranges for `rows` split into `parts`, without copying any data
pub fn row_ranges(rows: usize, parts: usize) -> Result<Vec<Range<usize>>> {
    if parts == 0 || parts > rows {
        return Err(Error::InvalidPartitionCount {
            requested: parts,
            rows,
        });
    }

    let per_part = rows / parts;
    Ok((0..parts)
        .map(|i| {
            let start = i * per_part;
            let end = if i == parts - 1 { rows } else { start + per_part };
            start..end
        })
        .collect())
}

/// Split `a` into `parts` row-contiguous partitions
pub fn split(a: &Matrix, parts: usize) -> Result<Vec<Partition>> {
    row_ranges(a.rows(), parts)?
        .into_iter()
        .enumerate()
        .map(|(index, range)| {
            Ok(Partition {
                index,
                row_start: range.start,
                matrix: a.slice_rows(range.start, range.end)?,
            })
        })
        .collect()
}
