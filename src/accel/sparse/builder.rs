// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use arrow::{
    array::{Float32Builder, Int32Builder},
    buffer::OffsetBuffer,
};

use super::CsrMatrix;

/// A sparse row as `(column, value)` pairs.
pub type CsrRow = Vec<(i32, f32)>;

/// Builder that collects whole sparse rows, in order, into a CSR matrix.
///
/// Rows are appended one at a time; nothing is visible until [CsrBuilder::finish]
/// produces the immutable matrix.
pub struct CsrBuilder {
    dimension: usize,
    lengths: Vec<usize>,
    col_bld: Int32Builder,
    val_bld: Float32Builder,
}

impl CsrBuilder {
    /// Create a builder for a matrix with `dim` columns.
    pub fn new(dim: usize) -> Self {
        CsrBuilder {
            dimension: dim,
            lengths: Vec::new(),
            col_bld: Int32Builder::new(),
            val_bld: Float32Builder::new(),
        }
    }

    /// Create a builder with preallocated row and entry capacity.
    pub fn with_capacity(dim: usize, rows: usize, entries: usize) -> Self {
        CsrBuilder {
            dimension: dim,
            lengths: Vec::with_capacity(rows),
            col_bld: Int32Builder::with_capacity(entries),
            val_bld: Float32Builder::with_capacity(entries),
        }
    }

    /// Number of rows added so far.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Append a row.  Entries must have columns below the builder dimension.
    ///
    /// Entries are stored sorted by column, and repeated columns are summed.
    pub fn push_row<R: IntoIterator<Item = (i32, f32)>>(&mut self, row: R) {
        let mut row: CsrRow = row.into_iter().collect();
        if row.windows(2).any(|w| w[0].0 >= w[1].0) {
            row = merge_columns(row);
        }
        for (i, s) in row.iter() {
            debug_assert!(*i >= 0 && (*i as usize) < self.dimension);
            self.col_bld.append_value(*i);
            self.val_bld.append_value(*s);
        }
        self.lengths.push(row.len());
    }

    /// Append a row with no entries.
    pub fn push_empty(&mut self) {
        self.lengths.push(0);
    }

    /// Finish building, producing the matrix.
    pub fn finish(mut self) -> CsrMatrix {
        CsrMatrix::from_parts(
            self.dimension,
            OffsetBuffer::from_lengths(self.lengths),
            self.col_bld.finish(),
            self.val_bld.finish(),
        )
    }
}

/// Sort a row by column and sum the values of repeated columns.
fn merge_columns(mut row: CsrRow) -> CsrRow {
    row.sort_by_key(|(c, _v)| *c);
    let mut merged: CsrRow = Vec::with_capacity(row.len());
    for (c, v) in row {
        match merged.last_mut() {
            Some((lc, lv)) if *lc == c => *lv += v,
            _ => merged.push((c, v)),
        }
    }
    merged
}

impl Extend<CsrRow> for CsrBuilder {
    fn extend<T: IntoIterator<Item = CsrRow>>(&mut self, iter: T) {
        for row in iter {
            self.push_row(row);
        }
    }
}

#[test]
fn test_build_rows() {
    let mut bld = CsrBuilder::new(4);
    bld.push_row(vec![(1, 0.5), (3, 1.5)]);
    bld.push_empty();
    bld.push_row(vec![(0, 2.0)]);
    assert_eq!(bld.len(), 3);
    let m = bld.finish();
    assert_eq!(m.shape(), (3, 4));
    assert_eq!(m.nnz(), 3);
    assert_eq!(m.row_cols(0), &[1, 3]);
    assert!(m.row(1).is_empty());
    assert_eq!(m.get(2, 0), 2.0);
}

#[test]
fn test_build_nothing() {
    let m = CsrBuilder::new(7).finish();
    assert_eq!(m.shape(), (0, 7));
    assert_eq!(m.nnz(), 0);
}

#[test]
fn test_repeated_columns_summed() {
    let mut bld = CsrBuilder::new(3);
    bld.push_row(vec![(2, 1.0), (0, 1.0), (0, 0.5), (1, 2.0)]);
    let m = bld.finish();
    assert_eq!(m.nnz(), 3);
    assert_eq!(m.row_cols(0), &[0, 1, 2]);
    assert_eq!(m.row_vals(0), &[1.5, 2.0, 1.0]);
}
