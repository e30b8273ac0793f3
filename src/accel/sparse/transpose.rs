// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use arrow::{
    array::{Float32Array, Int32Array},
    buffer::{OffsetBuffer, ScalarBuffer},
};

use super::CsrMatrix;

impl CsrMatrix {
    /// Transpose the matrix.
    ///
    /// This is a counting transpose: rows of the result list their columns
    /// (the source rows) in ascending order.
    pub fn transpose(&self) -> CsrMatrix {
        let nnz = self.nnz();
        let mut row_ptrs = vec![0i64; self.n_cols() + 1];
        let mut col_inds = vec![0i32; nnz];
        let mut values = vec![0.0f32; nnz];

        // step 1: count column values, placing counts in rps[c+1].
        for row in self.rows() {
            for c in row.cols() {
                row_ptrs[*c as usize + 1] += 1;
            }
        }

        // step 2: convert column counts into row offsets
        for i in 1..=self.n_cols() {
            row_ptrs[i] += row_ptrs[i - 1];
        }

        // step 3: insert source rows and values into outputs
        let mut row_ips = row_ptrs.clone();
        for (r, row) in self.rows().enumerate() {
            for (c, v) in row.iter() {
                let pos = row_ips[c] as usize;
                col_inds[pos] = r as i32;
                values[pos] = v;
                row_ips[c] += 1;
            }
        }

        CsrMatrix::from_parts(
            self.n_rows(),
            OffsetBuffer::new(ScalarBuffer::from(row_ptrs)),
            Int32Array::from(col_inds),
            Float32Array::from(values),
        )
    }
}

#[test]
fn test_transpose() {
    use super::CsrBuilder;

    let mut bld = CsrBuilder::new(3);
    bld.push_row(vec![(0, 1.0), (2, 2.0)]);
    bld.push_row(vec![(2, 3.0)]);
    let m = bld.finish();
    let t = m.transpose();
    assert_eq!(t.shape(), (3, 2));
    assert_eq!(t.row_cols(0), &[0]);
    assert!(t.row(1).is_empty());
    assert_eq!(t.row_cols(2), &[0, 1]);
    assert_eq!(t.row_vals(2), &[2.0, 3.0]);
    assert_eq!(t.transpose(), m);
}

#[test]
fn test_transpose_empty() {
    let m = CsrMatrix::empty(0, 4);
    let t = m.transpose();
    assert_eq!(t.shape(), (4, 0));
    assert_eq!(t.nnz(), 0);
}
