// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Sparse coordinate arrays.

use arrow::array::{Array, Float32Array, Float32Builder, Int32Array, Int32Builder};

use crate::errors::{RecError, Result};

use super::{CsrBuilder, CsrMatrix};

/// A sparse matrix in coordinate (triple) form.
pub struct CooMatrix {
    pub row: Int32Array,
    pub col: Int32Array,
    pub val: Float32Array,
}

/// Accumulates `(row, col, value)` triples in any order.
pub struct CooMatrixBuilder {
    pub row: Int32Builder,
    pub col: Int32Builder,
    pub val: Float32Builder,
}

impl CooMatrixBuilder {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Initialize a builder with a specified capacity.
    pub fn with_capacity(cap: usize) -> Self {
        CooMatrixBuilder {
            row: Int32Builder::with_capacity(cap),
            col: Int32Builder::with_capacity(cap),
            val: Float32Builder::with_capacity(cap),
        }
    }

    pub fn add_entry(&mut self, row: i32, col: i32, val: f32) {
        self.row.append_value(row);
        self.col.append_value(col);
        self.val.append_value(val);
    }

    /// Build the final COO matrix from this builder.
    pub fn finish(mut self) -> CooMatrix {
        CooMatrix {
            row: self.row.finish(),
            col: self.col.finish(),
            val: self.val.finish(),
        }
    }
}

impl Default for CooMatrixBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CooMatrix {
    /// Number of stored triples.
    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    /// Compress into a CSR matrix of the given shape.
    ///
    /// Entries within each row are sorted by column, and repeated coordinates
    /// are summed.  Coordinates outside the shape are rejected.
    pub fn to_csr(&self, n_rows: usize, n_cols: usize) -> Result<CsrMatrix> {
        let rows = self.row.values();
        let cols = self.col.values();
        let vals = self.val.values();

        // pass 1: count row sizes, checking bounds
        let mut row_ptrs = vec![0usize; n_rows + 1];
        for (r, c) in rows.iter().zip(cols.iter()) {
            if *r < 0 || *r as usize >= n_rows || *c < 0 || *c as usize >= n_cols {
                return Err(RecError::ShapeMismatch(format!(
                    "coordinate ({}, {}) outside {} x {} matrix",
                    r, c, n_rows, n_cols
                )));
            }
            row_ptrs[*r as usize + 1] += 1;
        }
        for i in 1..=n_rows {
            row_ptrs[i] += row_ptrs[i - 1];
        }

        // pass 2: scatter entries into their rows
        let mut pos = row_ptrs.clone();
        let mut scattered = vec![(0i32, 0.0f32); self.len()];
        for ((r, c), v) in rows.iter().zip(cols.iter()).zip(vals.iter()) {
            let p = &mut pos[*r as usize];
            scattered[*p] = (*c, *v);
            *p += 1;
        }

        // pass 3: the builder sorts each row and sums repeated columns
        let mut bld = CsrBuilder::with_capacity(n_cols, n_rows, self.len());
        for r in 0..n_rows {
            bld.push_row(scattered[row_ptrs[r]..row_ptrs[r + 1]].iter().copied());
        }

        Ok(bld.finish())
    }
}

#[test]
fn test_coo_to_csr() {
    let mut bld = CooMatrixBuilder::new();
    bld.add_entry(1, 2, 1.0);
    bld.add_entry(0, 1, 2.0);
    bld.add_entry(1, 0, 3.0);
    let coo = bld.finish();
    assert_eq!(coo.len(), 3);
    let csr = coo.to_csr(3, 3).unwrap();
    assert_eq!(csr.shape(), (3, 3));
    assert_eq!(csr.row_cols(0), &[1]);
    assert_eq!(csr.row_cols(1), &[0, 2]);
    assert_eq!(csr.row_vals(1), &[3.0, 1.0]);
    assert!(csr.row(2).is_empty());
}

#[test]
fn test_coo_sums_duplicates() {
    let mut bld = CooMatrixBuilder::new();
    bld.add_entry(0, 1, 1.0);
    bld.add_entry(0, 1, 0.5);
    let csr = bld.finish().to_csr(1, 2).unwrap();
    assert_eq!(csr.nnz(), 1);
    assert_eq!(csr.get(0, 1), 1.5);
}

#[test]
fn test_coo_out_of_bounds() {
    let mut bld = CooMatrixBuilder::new();
    bld.add_entry(0, 5, 1.0);
    let res = bld.finish().to_csr(1, 5);
    assert!(matches!(res, Err(RecError::ShapeMismatch(_))));
}
